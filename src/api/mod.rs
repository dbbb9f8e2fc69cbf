//! API handlers for the lending REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod users;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{
    error::AppError,
    models::{enums::UserRole, user::UserClaims},
    AppState,
};

/// JSON body extractor whose rejections are reported as `AppError`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                AppError::Validation(rejection.body_text())
            }
            _ => AppError::BadRequest(rejection.body_text()),
        }
    }
}

/// Plain message body
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Per-request caller context, passed explicitly to every handler.
///
/// `caller` holds the decoded bearer token when one was sent. Role checks only
/// bite when `auth.enforce_roles` is enabled; a malformed or expired token is
/// rejected either way.
pub struct RequestContext {
    pub caller: Option<UserClaims>,
    enforce_roles: bool,
}

impl RequestContext {
    pub fn new(caller: Option<UserClaims>, enforce_roles: bool) -> Self {
        Self {
            caller,
            enforce_roles,
        }
    }

    fn require(&self, allowed: impl Fn(&UserClaims) -> bool, what: &str) -> Result<(), AppError> {
        if !self.enforce_roles {
            return Ok(());
        }
        match &self.caller {
            None => Err(AppError::Authentication("Missing authorization header".to_string())),
            Some(claims) if allowed(claims) => Ok(()),
            Some(_) => Err(AppError::Authorization(format!("{} privileges required", what))),
        }
    }

    pub fn require_authenticated(&self) -> Result<(), AppError> {
        self.require(|_| true, "User")
    }

    /// Approved librarians and administrators
    pub fn require_staff(&self) -> Result<(), AppError> {
        self.require(|c| c.staff, "Librarian")
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require(UserClaims::is_admin, "Administrator")
    }

    /// Only administrators may hand out the admin role
    pub fn require_grantable(&self, role: Option<UserRole>) -> Result<(), AppError> {
        match role {
            Some(UserRole::Admin) => self.require_admin(),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let enforce_roles = state.config.auth.enforce_roles;

        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(RequestContext::new(None, enforce_roles));
        };

        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let mut claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        // Role and approval may have changed since the token was issued
        if enforce_roles {
            let profile = match state.services.users.get_by_id(claims.profile_id).await {
                Ok(profile) => profile,
                Err(AppError::NotFound(_)) => {
                    return Err(AppError::Authentication("Account no longer exists".to_string()))
                }
                Err(e) => return Err(e),
            };
            profile.ensure_can_log_in()?;
            claims.refresh(&profile);
        }

        Ok(RequestContext::new(Some(claims), enforce_roles))
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/login", post(auth::login))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .patch(books::update_book)
                .delete(books::delete_book),
        )
        // Users and librarian applications
        .route("/users", get(users::list_users).post(users::register))
        .route("/users/applications", get(users::pending_librarians))
        .route("/users/applications/:id/approve", post(users::approve))
        .route("/users/applications/:id/decline", post(users::decline))
        .route("/users/pending_librarians", get(users::pending_librarians))
        .route("/users/:id/approve", post(users::approve))
        .route("/users/:id/decline", post(users::decline))
        .route("/users/:id/promote", patch(users::promote))
        .route("/users/:id/demote", patch(users::demote))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        // Loans
        .route("/loans", get(loans::list_loans).post(loans::borrow_book))
        .route("/loans/borrow_book", post(loans::borrow_book))
        .route("/loans/borrowed_books", get(loans::borrowed_books))
        .route("/loans/return_book", post(loans::return_book))
        .route(
            "/loans/:id",
            get(loans::get_loan)
                .put(loans::update_loan)
                .patch(loans::update_loan)
                .delete(loans::delete_loan),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: UserRole, staff: bool) -> UserClaims {
        UserClaims {
            sub: "someone".to_string(),
            profile_id: 1,
            role,
            staff,
            exp: i64::MAX,
            iat: 0,
        }
    }

    #[test]
    fn test_open_mode_allows_anonymous() {
        let ctx = RequestContext::new(None, false);
        assert!(ctx.require_admin().is_ok());
        assert!(ctx.require_staff().is_ok());
        assert!(ctx.require_authenticated().is_ok());
        assert!(ctx.require_grantable(Some(UserRole::Admin)).is_ok());
    }

    #[test]
    fn test_admin_role_is_granted_by_admins_only() {
        let anonymous = RequestContext::new(None, true);
        assert!(anonymous.require_grantable(None).is_ok());
        assert!(anonymous.require_grantable(Some(UserRole::Librarian)).is_ok());
        assert!(matches!(
            anonymous.require_grantable(Some(UserRole::Admin)),
            Err(AppError::Authentication(_))
        ));

        let librarian = RequestContext::new(Some(claims(UserRole::Librarian, true)), true);
        assert!(matches!(
            librarian.require_grantable(Some(UserRole::Admin)),
            Err(AppError::Authorization(_))
        ));

        let admin = RequestContext::new(Some(claims(UserRole::Admin, true)), true);
        assert!(admin.require_grantable(Some(UserRole::Admin)).is_ok());
    }

    #[test]
    fn test_json_rejections_become_app_errors() {
        use axum::extract::rejection::MissingJsonContentType;

        let error: AppError = JsonRejection::from(MissingJsonContentType::default()).into();
        assert_eq!(error.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_enforced_mode_rejects_anonymous() {
        let ctx = RequestContext::new(None, true);
        assert!(matches!(ctx.require_authenticated(), Err(AppError::Authentication(_))));
    }

    #[test]
    fn test_enforced_mode_checks_roles() {
        let user = RequestContext::new(Some(claims(UserRole::User, false)), true);
        assert!(user.require_authenticated().is_ok());
        assert!(matches!(user.require_staff(), Err(AppError::Authorization(_))));
        assert!(matches!(user.require_admin(), Err(AppError::Authorization(_))));

        let librarian = RequestContext::new(Some(claims(UserRole::Librarian, true)), true);
        assert!(librarian.require_staff().is_ok());
        assert!(librarian.require_admin().is_err());

        let admin = RequestContext::new(Some(claims(UserRole::Admin, true)), true);
        assert!(admin.require_admin().is_ok());
    }
}

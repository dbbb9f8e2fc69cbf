//! User profile and librarian application endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        enums::{ProfileStatus, UserRole},
        user::{CreateProfile, UpdateProfile, UserProfile},
    },
    services::users::RoleChange,
    AppState,
};

use super::{Json, MessageResponse, RequestContext};

/// Registration answer for librarians, who must wait for approval
#[derive(Serialize, ToSchema)]
pub struct PendingRegistration {
    pub message: String,
    pub profile: UserProfile,
}

/// Registration answer: the profile itself, or the pending wrapper for librarians
#[derive(Serialize)]
#[serde(untagged)]
pub enum RegistrationResponse {
    Pending(PendingRegistration),
    Active(UserProfile),
}

impl From<UserProfile> for RegistrationResponse {
    fn from(profile: UserProfile) -> Self {
        if profile.status == ProfileStatus::Pending {
            RegistrationResponse::Pending(PendingRegistration {
                message: "Librarian registration submitted for approval".to_string(),
                profile,
            })
        } else {
            RegistrationResponse::Active(profile)
        }
    }
}

/// Promote/demote answer; a refused transition is reported with `success = false`
#[derive(Serialize, ToSchema)]
pub struct RoleChangeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<RoleChange> for (StatusCode, Json<RoleChangeResponse>) {
    fn from(change: RoleChange) -> Self {
        match change {
            RoleChange::Changed(profile) => (
                StatusCode::OK,
                Json(RoleChangeResponse {
                    success: true,
                    role: Some(profile.role),
                    message: None,
                }),
            ),
            RoleChange::Unchanged(reason) => (
                StatusCode::BAD_REQUEST,
                Json(RoleChangeResponse {
                    success: false,
                    role: None,
                    message: Some(reason.to_string()),
                }),
            ),
        }
    }
}

/// List all profiles
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "List of profiles", body = Vec<UserProfile>)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> AppResult<Json<Vec<UserProfile>>> {
    ctx.require_admin()?;

    let users = state.services.users.list().await?;
    Ok(Json(users))
}

/// Get a profile by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Profile ID")
    ),
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 404, description = "Profile not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<Json<UserProfile>> {
    ctx.require_authenticated()?;

    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(user))
}

/// Register a new user or librarian
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateProfile,
    responses(
        (status = 201, description = "Profile created; librarians are wrapped in a pending message", body = UserProfile),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Admin role requested without an admin token"),
        (status = 403, description = "Admin role requested by a non-admin"),
        (status = 409, description = "Username or email already exists")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<CreateProfile>,
) -> AppResult<(StatusCode, Json<RegistrationResponse>)> {
    ctx.require_grantable(request.role)?;

    let created = state.services.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Update name or email
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Profile ID")
    ),
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Profile updated", body = UserProfile),
        (status = 404, description = "Profile not found"),
        (status = 409, description = "Email already exists")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
    Json(profile): Json<UpdateProfile>,
) -> AppResult<Json<UserProfile>> {
    ctx.require_admin()?;

    let updated = state.services.users.update(id, profile).await?;
    Ok(Json(updated))
}

/// Delete a profile after returning its borrowed books
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Profile ID")
    ),
    responses(
        (status = 200, description = "Profile deleted", body = MessageResponse),
        (status = 404, description = "Profile not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<Json<MessageResponse>> {
    ctx.require_admin()?;

    let deleted = state.services.users.destroy(id).await?;
    Ok(Json(MessageResponse::new(format!(
        "User '{}' deleted and their borrowed books returned.",
        deleted.full_name
    ))))
}

/// Librarian applications awaiting a decision
#[utoipa::path(
    get,
    path = "/users/applications",
    tag = "applications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending librarians", body = Vec<UserProfile>)
    )
)]
pub async fn pending_librarians(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> AppResult<Json<Vec<UserProfile>>> {
    ctx.require_admin()?;

    let pending = state.services.users.pending_librarians().await?;
    Ok(Json(pending))
}

/// Approve a pending librarian
#[utoipa::path(
    post,
    path = "/users/applications/{id}/approve",
    tag = "applications",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Profile ID")
    ),
    responses(
        (status = 200, description = "Application approved", body = MessageResponse),
        (status = 404, description = "Librarian not found or already processed")
    )
)]
pub async fn approve(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<Json<MessageResponse>> {
    ctx.require_admin()?;

    let librarian = state.services.users.approve(id).await?;
    Ok(Json(MessageResponse::new(format!(
        "{} approved as Librarian",
        librarian.full_name
    ))))
}

/// Decline a pending librarian
#[utoipa::path(
    post,
    path = "/users/applications/{id}/decline",
    tag = "applications",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Profile ID")
    ),
    responses(
        (status = 200, description = "Application declined", body = MessageResponse),
        (status = 404, description = "Librarian not found or already processed")
    )
)]
pub async fn decline(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<Json<MessageResponse>> {
    ctx.require_admin()?;

    let librarian = state.services.users.decline(id).await?;
    Ok(Json(MessageResponse::new(format!(
        "{}'s application declined",
        librarian.full_name
    ))))
}

/// Promote a user to librarian
#[utoipa::path(
    patch,
    path = "/users/{id}/promote",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Profile ID")
    ),
    responses(
        (status = 200, description = "Promoted", body = RoleChangeResponse),
        (status = 400, description = "Not a plain user", body = RoleChangeResponse),
        (status = 404, description = "Profile not found")
    )
)]
pub async fn promote(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<RoleChangeResponse>)> {
    ctx.require_admin()?;

    let change = state.services.users.promote(id).await?;
    Ok(change.into())
}

/// Demote a librarian to user
#[utoipa::path(
    patch,
    path = "/users/{id}/demote",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Profile ID")
    ),
    responses(
        (status = 200, description = "Demoted", body = RoleChangeResponse),
        (status = 400, description = "Not a librarian", body = RoleChangeResponse),
        (status = 404, description = "Profile not found")
    )
)]
pub async fn demote(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<RoleChangeResponse>)> {
    ctx.require_admin()?;

    let change = state.services.users.demote(id).await?;
    Ok(change.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(role: UserRole, status: ProfileStatus) -> UserProfile {
        UserProfile {
            id: 4,
            credential_id: Some(9),
            username: Some("grace".to_string()),
            full_name: "Grace Hopper".to_string(),
            email: "grace@example.org".to_string(),
            role,
            status,
        }
    }

    #[test]
    fn test_pending_librarian_registration_is_wrapped() {
        let response: RegistrationResponse = profile(UserRole::Librarian, ProfileStatus::Pending).into();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["message"], "Librarian registration submitted for approval");
        assert_eq!(json["profile"]["status"], "pending");
        assert_eq!(json["profile"]["username"], "grace");
    }

    #[test]
    fn test_user_registration_is_the_profile() {
        let response: RegistrationResponse = profile(UserRole::User, ProfileStatus::Approved).into();
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("message").is_none());
        assert_eq!(json["id"], 4);
        assert_eq!(json["status"], "approved");
    }

    #[test]
    fn test_refused_role_change_is_a_400_body() {
        let (status, Json(body)) = RoleChange::Unchanged("User is already a librarian").into();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert_eq!(body.message.as_deref(), Some("User is already a librarian"));

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("role").is_none());
    }

    #[test]
    fn test_role_change_success_body() {
        let (status, Json(body)) =
            RoleChange::Changed(profile(UserRole::Librarian, ProfileStatus::Approved)).into();
        assert_eq!(status, StatusCode::OK);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "role": "librarian" }));
    }
}

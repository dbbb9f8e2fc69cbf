//! Login endpoint

use axum::extract::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        enums::{ProfileStatus, UserRole},
        user::UserProfile,
    },
    AppState,
};

use super::Json;

/// Login request; missing fields are reported as a validation error
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Profile summary returned at login
#[derive(Serialize, ToSchema)]
pub struct UserInfo {
    pub id: i32,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    pub status: ProfileStatus,
}

impl UserInfo {
    fn from_profile(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            username: profile.username.unwrap_or_default(),
            full_name: profile.full_name,
            email: profile.email,
            role: profile.role,
            status: profile.status,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserInfo,
    pub token: String,
    pub token_type: String,
}

/// Authenticate with username and password
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Librarian application pending or declined"),
        (status = 404, description = "No profile for this credential")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (token, profile) = state
        .services
        .users
        .authenticate(request.username, request.password)
        .await?;

    Ok(Json(LoginResponse {
        user: UserInfo::from_profile(profile),
        token,
        token_type: "Bearer".to_string(),
    }))
}

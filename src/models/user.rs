//! User profile, credential and token types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::{ProfileStatus, UserRole};
use crate::error::AppError;

/// Login identity backing a profile
#[derive(Debug, Clone, FromRow)]
pub struct Credential {
    pub id: i32,
    pub username: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// User profile joined with its credential's username
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserProfile {
    pub id: i32,
    #[serde(skip)]
    pub credential_id: Option<i32>,
    /// Null when the profile has no credential attached
    pub username: Option<String>,
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    pub status: ProfileStatus,
}

impl UserProfile {
    /// Pending and declined librarians are refused at login; every other combination passes.
    pub fn ensure_can_log_in(&self) -> Result<(), AppError> {
        match (self.role, self.status) {
            (UserRole::Librarian, ProfileStatus::Pending) => Err(AppError::Authorization(
                "Your librarian application is still pending approval.".to_string(),
            )),
            (UserRole::Librarian, ProfileStatus::Declined) => Err(AppError::Authorization(
                "Your librarian registration was declined. You cannot log in.".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Approved librarians and administrators may manage the catalog
    pub fn is_staff(&self) -> bool {
        match self.role {
            UserRole::Admin => true,
            UserRole::Librarian => self.status == ProfileStatus::Approved,
            UserRole::User => false,
        }
    }
}

/// Registration request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CreateProfile {
    pub username: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub role: Option<UserRole>,
    /// Accepted for compatibility, never honoured: the status is derived from the role
    pub status: Option<ProfileStatus>,
}

/// Validated registration data handed to the repository
#[derive(Debug)]
pub struct NewProfile {
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    pub status: ProfileStatus,
}

/// Partial profile update
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfile {
    #[validate(length(min = 1, message = "Full name cannot be empty"))]
    pub full_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

/// JWT claims issued at login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub profile_id: i32,
    pub role: UserRole,
    /// Only approved librarians and admins carry this
    pub staff: bool,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    pub fn for_profile(profile: &UserProfile, username: &str, ttl_hours: u64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: username.to_string(),
            profile_id: profile.id,
            role: profile.role,
            staff: profile.is_staff(),
            exp: now + (ttl_hours as i64 * 3600),
            iat: now,
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Replace the role and staff flag with the profile's current ones
    pub fn refresh(&mut self, profile: &UserProfile) {
        self.role = profile.role;
        self.staff = profile.is_staff();
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl CreateProfile {
    /// A blank email counts as no email
    pub fn normalize(&mut self) {
        self.email = self.email.take().filter(|e| !e.is_empty());
    }
}

impl UpdateProfile {
    /// A blank email leaves the stored one unchanged
    pub fn normalize(&mut self) {
        self.email = self.email.take().filter(|e| !e.is_empty());
    }
}

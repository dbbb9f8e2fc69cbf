//! Registration, login and profile administration service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        enums::{ProfileStatus, UserRole},
        user::{CreateProfile, NewProfile, UpdateProfile, UserClaims, UserProfile},
    },
    repository::Repository,
};

/// Outcome of a promote/demote request
#[derive(Debug)]
pub enum RoleChange {
    Changed(UserProfile),
    /// The profile did not hold the role the transition starts from
    Unchanged(&'static str),
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

/// Treats absent and empty strings alike
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a profile together with its credential.
    ///
    /// Librarians always start out pending, whatever status the caller sent.
    pub async fn register(&self, mut request: CreateProfile) -> AppResult<UserProfile> {
        let (username, password) = match (
            non_empty(request.username.take()),
            non_empty(request.password.take()),
        ) {
            (Some(username), Some(password)) => (username, password),
            _ => {
                return Err(AppError::Validation(
                    "Username and password are required".to_string(),
                ))
            }
        };
        request.normalize();
        request.validate()?;

        if self.repository.users.username_exists(&username).await? {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let email = request.email.unwrap_or_default();
        if !email.is_empty() && self.repository.users.email_exists(&email, None).await? {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let role = request.role.unwrap_or_default();
        let profile = NewProfile {
            username,
            password_hash: hash_password(&password)?,
            full_name: request.full_name.unwrap_or_default(),
            email,
            role,
            status: ProfileStatus::for_registration(role),
        };

        let created = self.repository.users.create(&profile).await?;
        tracing::info!(
            profile_id = created.id,
            role = %created.role,
            status = %created.status,
            "Profile registered"
        );
        Ok(created)
    }

    /// Check credentials and the librarian gate, then issue a token
    pub async fn authenticate(
        &self,
        username: Option<String>,
        password: Option<String>,
    ) -> AppResult<(String, UserProfile)> {
        let (username, password) = match (non_empty(username), non_empty(password)) {
            (Some(username), Some(password)) => (username, password),
            _ => {
                return Err(AppError::Validation(
                    "Username and password required".to_string(),
                ))
            }
        };

        let credential = self
            .repository
            .users
            .get_credential_by_username(&username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid credentials".to_string()))?;

        if !verify_password(&credential.password_hash, &password)? {
            return Err(AppError::Authentication("Invalid credentials".to_string()));
        }

        let profile = self
            .repository
            .users
            .get_by_credential(credential.id)
            .await?
            .ok_or_else(|| AppError::NotFound("User profile not found".to_string()))?;

        profile.ensure_can_log_in()?;

        let claims = UserClaims::for_profile(&profile, &credential.username, self.config.jwt_expiration_hours);
        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        tracing::debug!(profile_id = profile.id, "Login succeeded");
        Ok((token, profile))
    }

    pub async fn list(&self) -> AppResult<Vec<UserProfile>> {
        self.repository.users.list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<UserProfile> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn update(&self, id: i32, mut profile: UpdateProfile) -> AppResult<UserProfile> {
        profile.normalize();
        profile.validate()?;

        if let Some(ref email) = profile.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict("Email already exists".to_string()));
            }
        }

        self.repository.users.update(id, &profile).await
    }

    pub async fn pending_librarians(&self) -> AppResult<Vec<UserProfile>> {
        self.repository.users.list_pending_librarians().await
    }

    pub async fn approve(&self, id: i32) -> AppResult<UserProfile> {
        self.decide(id, ProfileStatus::Approved).await
    }

    pub async fn decline(&self, id: i32) -> AppResult<UserProfile> {
        self.decide(id, ProfileStatus::Declined).await
    }

    // Absence and an already decided application are reported identically
    async fn decide(&self, id: i32, status: ProfileStatus) -> AppResult<UserProfile> {
        let profile = self
            .repository
            .users
            .decide_application(id, status)
            .await?
            .ok_or_else(|| AppError::NotFound("Librarian not found or already processed".to_string()))?;

        tracing::info!(profile_id = id, status = %status, "Librarian application decided");
        Ok(profile)
    }

    pub async fn promote(&self, id: i32) -> AppResult<RoleChange> {
        self.change_role(id, UserRole::promoted, "User is already a librarian")
            .await
    }

    pub async fn demote(&self, id: i32) -> AppResult<RoleChange> {
        self.change_role(id, UserRole::demoted, "User is already a user")
            .await
    }

    async fn change_role(
        &self,
        id: i32,
        transition: fn(UserRole) -> Option<UserRole>,
        refusal: &'static str,
    ) -> AppResult<RoleChange> {
        let profile = self.repository.users.get_by_id(id).await?;

        let Some(target) = transition(profile.role) else {
            return Ok(RoleChange::Unchanged(refusal));
        };

        // The role may have moved since it was read
        match self.repository.users.change_role(id, profile.role, target).await? {
            Some(updated) => {
                tracing::info!(profile_id = id, from = %profile.role, to = %target, "Role changed");
                Ok(RoleChange::Changed(updated))
            }
            None => Ok(RoleChange::Unchanged(refusal)),
        }
    }

    /// Delete a profile, returning its active loans first
    pub async fn destroy(&self, id: i32) -> AppResult<UserProfile> {
        let (profile, released) = self.repository.users.delete_returning_loans(id).await?;
        tracing::info!(
            profile_id = id,
            returned_books = released.len(),
            "Profile deleted"
        );
        Ok(profile)
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

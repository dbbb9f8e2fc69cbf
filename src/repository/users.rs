//! Users repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{ProfileStatus, UserRole},
        user::{Credential, NewProfile, UpdateProfile, UserProfile},
    },
};

const PROFILE_COLUMNS: &str =
    "p.id, p.credential_id, c.username, p.full_name, p.email, p.role, p.status";

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all profiles
    pub async fn list(&self) -> AppResult<Vec<UserProfile>> {
        let query = format!(
            "SELECT {} FROM user_profiles p LEFT JOIN credentials c ON p.credential_id = c.id ORDER BY p.id",
            PROFILE_COLUMNS
        );
        let profiles = sqlx::query_as::<_, UserProfile>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(profiles)
    }

    /// Librarian applications waiting for a decision
    pub async fn list_pending_librarians(&self) -> AppResult<Vec<UserProfile>> {
        let query = format!(
            r#"
            SELECT {} FROM user_profiles p
            LEFT JOIN credentials c ON p.credential_id = c.id
            WHERE p.role = $1 AND p.status = $2
            ORDER BY p.id
            "#,
            PROFILE_COLUMNS
        );
        let profiles = sqlx::query_as::<_, UserProfile>(&query)
            .bind(UserRole::Librarian)
            .bind(ProfileStatus::Pending)
            .fetch_all(&self.pool)
            .await?;
        Ok(profiles)
    }

    /// Get profile by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<UserProfile> {
        let query = format!(
            "SELECT {} FROM user_profiles p LEFT JOIN credentials c ON p.credential_id = c.id WHERE p.id = $1",
            PROFILE_COLUMNS
        );
        sqlx::query_as::<_, UserProfile>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Profile attached to a credential
    pub async fn get_by_credential(&self, credential_id: i32) -> AppResult<Option<UserProfile>> {
        let query = format!(
            "SELECT {} FROM user_profiles p JOIN credentials c ON p.credential_id = c.id WHERE c.id = $1",
            PROFILE_COLUMNS
        );
        let profile = sqlx::query_as::<_, UserProfile>(&query)
            .bind(credential_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    /// Get credential by username (exact match)
    pub async fn get_credential_by_username(&self, username: &str) -> AppResult<Option<Credential>> {
        let credential = sqlx::query_as::<_, Credential>("SELECT * FROM credentials WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(credential)
    }

    /// Check if username already exists
    pub async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM credentials WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM user_profiles WHERE email = $1 AND id != $2)")
                .bind(email)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM user_profiles WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Create the credential and its profile in one transaction
    pub async fn create(&self, profile: &NewProfile) -> AppResult<UserProfile> {
        let mut tx = self.pool.begin().await?;

        let credential_id: i32 = sqlx::query_scalar(
            "INSERT INTO credentials (username, password_hash) VALUES ($1, $2) RETURNING id",
        )
        .bind(&profile.username)
        .bind(&profile.password_hash)
        .fetch_one(&mut *tx)
        .await?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO user_profiles (credential_id, full_name, email, role, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(credential_id)
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(profile.role)
        .bind(profile.status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(UserProfile {
            id,
            credential_id: Some(credential_id),
            username: Some(profile.username.clone()),
            full_name: profile.full_name.clone(),
            email: profile.email.clone(),
            role: profile.role,
            status: profile.status,
        })
    }

    /// Update name and email
    pub async fn update(&self, id: i32, profile: &UpdateProfile) -> AppResult<UserProfile> {
        let result = sqlx::query(
            r#"
            UPDATE user_profiles
            SET full_name = COALESCE($2, full_name),
                email = COALESCE($3, email)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&profile.full_name)
        .bind(&profile.email)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        self.get_by_id(id).await
    }

    /// Move a pending librarian application to `status`.
    ///
    /// Returns `None` when the profile is missing, is not a librarian, or was already decided.
    pub async fn decide_application(&self, id: i32, status: ProfileStatus) -> AppResult<Option<UserProfile>> {
        let query = format!(
            r#"
            WITH p AS (
                UPDATE user_profiles SET status = $2
                WHERE id = $1 AND role = $3 AND status = $4
                RETURNING *
            )
            SELECT {} FROM p LEFT JOIN credentials c ON p.credential_id = c.id
            "#,
            PROFILE_COLUMNS
        );
        let profile = sqlx::query_as::<_, UserProfile>(&query)
            .bind(id)
            .bind(status)
            .bind(UserRole::Librarian)
            .bind(ProfileStatus::Pending)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    /// Change role `from` -> `to`; `None` when the profile does not currently hold `from`
    pub async fn change_role(&self, id: i32, from: UserRole, to: UserRole) -> AppResult<Option<UserProfile>> {
        let query = format!(
            r#"
            WITH p AS (
                UPDATE user_profiles SET role = $3
                WHERE id = $1 AND role = $2
                RETURNING *
            )
            SELECT {} FROM p LEFT JOIN credentials c ON p.credential_id = c.id
            "#,
            PROFILE_COLUMNS
        );
        let profile = sqlx::query_as::<_, UserProfile>(&query)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    /// Return every active loan of the profile, then delete its credential and the profile.
    ///
    /// All of it commits together or not at all. Returns the deleted profile and
    /// the ids of the books that were released.
    pub async fn delete_returning_loans(&self, id: i32) -> AppResult<(UserProfile, Vec<i32>)> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            r#"
            SELECT {} FROM user_profiles p
            LEFT JOIN credentials c ON p.credential_id = c.id
            WHERE p.id = $1
            FOR UPDATE OF p
            "#,
            PROFILE_COLUMNS
        );
        let profile = sqlx::query_as::<_, UserProfile>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

        let released: Vec<i32> = sqlx::query_scalar(
            "UPDATE loans SET returned = TRUE WHERE user_id = $1 AND NOT returned RETURNING book_id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        if !released.is_empty() {
            sqlx::query("UPDATE books SET available = TRUE WHERE id = ANY($1)")
                .bind(&released)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(credential_id) = profile.credential_id {
            sqlx::query("DELETE FROM credentials WHERE id = $1")
                .bind(credential_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM user_profiles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((profile, released))
    }
}

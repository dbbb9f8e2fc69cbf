//! Shared domain enums stored as lowercase TEXT columns

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres};
use utoipa::ToSchema;

/// Implements the sqlx TEXT mapping for an enum exposing `as_str` and `FromStr<Err = String>`
macro_rules! text_column {
    ($ty:ty) => {
        impl sqlx::Type<Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $ty {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as Decode<Postgres>>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl Encode<'_, Postgres> for $ty {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// UserRole
// ---------------------------------------------------------------------------

/// Role carried by a user profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Librarian,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Librarian => "librarian",
            UserRole::Admin => "admin",
        }
    }

    /// Role after a promotion, if this role can be promoted
    pub fn promoted(self) -> Option<UserRole> {
        match self {
            UserRole::User => Some(UserRole::Librarian),
            _ => None,
        }
    }

    /// Role after a demotion, if this role can be demoted
    pub fn demoted(self) -> Option<UserRole> {
        match self {
            UserRole::Librarian => Some(UserRole::User),
            _ => None,
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "librarian" => Ok(UserRole::Librarian),
            "admin" => Ok(UserRole::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

text_column!(UserRole);

// ---------------------------------------------------------------------------
// ProfileStatus
// ---------------------------------------------------------------------------

/// Approval state of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Pending,
    #[default]
    Approved,
    Declined,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::Pending => "pending",
            ProfileStatus::Approved => "approved",
            ProfileStatus::Declined => "declined",
        }
    }

    /// Initial status of a newly registered profile.
    ///
    /// Librarians wait for an administrator; every other role is usable at once.
    /// Any status supplied by the caller is ignored.
    pub fn for_registration(role: UserRole) -> ProfileStatus {
        match role {
            UserRole::Librarian => ProfileStatus::Pending,
            _ => ProfileStatus::Approved,
        }
    }
}

impl std::str::FromStr for ProfileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProfileStatus::Pending),
            "approved" => Ok(ProfileStatus::Approved),
            "declined" => Ok(ProfileStatus::Declined),
            _ => Err(format!("Invalid profile status: {}", s)),
        }
    }
}

text_column!(ProfileStatus);

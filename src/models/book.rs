//! Book model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::loan::LoanDetails;

/// Book record from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    /// False while an active loan holds the book
    pub available: bool,
}

/// Active loan reference shown on a book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CurrentLoan {
    pub id: i32,
    pub user_id: i32,
}

/// Book with its loan history
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDetails {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub available: bool,
    pub loans: Vec<LoanDetails>,
    pub current_loan: Option<CurrentLoan>,
}

impl BookDetails {
    pub fn new(book: Book, loans: Vec<LoanDetails>) -> Self {
        let current_loan = loans.iter().find(|l| !l.returned).map(|l| CurrentLoan {
            id: l.id,
            user_id: l.user.id,
        });

        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            genre: book.genre,
            available: book.available,
            loans,
            current_loan,
        }
    }
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[serde(default)]
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    pub genre: Option<String>,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author cannot be empty"))]
    pub author: Option<String>,
    pub genre: Option<String>,
}

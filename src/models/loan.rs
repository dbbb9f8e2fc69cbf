//! Loan (borrow) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrowed_at: DateTime<Utc>,
    pub returned: bool,
}

/// Borrower summary embedded in a loan
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanUser {
    pub id: i32,
    pub username: Option<String>,
}

/// Book summary embedded in a loan
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanBook {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
}

/// Loan with borrower and book for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub user: LoanUser,
    pub book: LoanBook,
    pub returned: bool,
    pub borrowed_at: DateTime<Utc>,
}

/// Internal row structure for joined loan queries
#[derive(Debug, Clone, FromRow)]
pub struct LoanDetailsRow {
    id: i32,
    user_id: i32,
    username: Option<String>,
    book_id: i32,
    title: String,
    author: String,
    genre: Option<String>,
    returned: bool,
    borrowed_at: DateTime<Utc>,
}

impl From<LoanDetailsRow> for LoanDetails {
    fn from(row: LoanDetailsRow) -> Self {
        LoanDetails {
            id: row.id,
            user: LoanUser {
                id: row.user_id,
                username: row.username,
            },
            book: LoanBook {
                id: row.book_id,
                title: row.title,
                author: row.author,
                genre: row.genre,
            },
            returned: row.returned,
            borrowed_at: row.borrowed_at,
        }
    }
}

/// Borrow request; both ids are checked by the service so a missing one is a 400.
/// Ids may be sent as numbers or numeric strings.
#[serde_as]
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct BorrowRequest {
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub user_id: Option<i32>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub book_id: Option<i32>,
}

/// Return request
#[serde_as]
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReturnRequest {
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub loan_id: Option<i32>,
}

/// Query for a user's active loans
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BorrowedBooksQuery {
    pub user_id: Option<i32>,
}

/// Update loan request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLoan {
    pub returned: Option<bool>,
}

//! Loans repository for database operations
//!
//! Every write that touches both a loan and its book runs in one transaction,
//! and a book is reserved with a compare-and-set on `books.available` so two
//! concurrent borrows of the same copy cannot both succeed.

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanDetails, LoanDetailsRow},
};

const LOAN_DETAILS_SELECT: &str = r#"
    SELECT l.id, l.user_id, c.username, l.book_id, b.title, b.author, b.genre,
           l.returned, l.borrowed_at
    FROM loans l
    JOIN user_profiles p ON l.user_id = p.id
    LEFT JOIN credentials c ON p.credential_id = c.id
    JOIN books b ON l.book_id = b.id
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_details(&self, filter: &str, bind: Option<i32>) -> AppResult<Vec<LoanDetails>> {
        let query = format!("{} {} ORDER BY l.id", LOAN_DETAILS_SELECT, filter);
        let mut builder = sqlx::query_as::<_, LoanDetailsRow>(&query);
        if let Some(value) = bind {
            builder = builder.bind(value);
        }
        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(LoanDetails::from).collect())
    }

    /// List every loan
    pub async fn list(&self) -> AppResult<Vec<LoanDetails>> {
        self.fetch_details("", None).await
    }

    /// Get loan details by ID
    pub async fn get_details(&self, id: i32) -> AppResult<LoanDetails> {
        self.fetch_details("WHERE l.id = $1", Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Active loans of a user
    pub async fn active_for_user(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        self.fetch_details("WHERE l.user_id = $1 AND NOT l.returned", Some(user_id))
            .await
    }

    /// Loan history of a set of books, oldest first
    pub async fn for_books(&self, book_ids: &[i32]) -> AppResult<Vec<LoanDetails>> {
        let query = format!("{} WHERE l.book_id = ANY($1) ORDER BY l.id", LOAN_DETAILS_SELECT);
        let rows = sqlx::query_as::<_, LoanDetailsRow>(&query)
            .bind(book_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(LoanDetails::from).collect())
    }

    /// Create an active loan and mark the book unavailable
    pub async fn borrow(&self, user_id: i32, book_id: i32) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        // Share lock keeps the borrower from being deleted under us
        let user: Option<i32> =
            sqlx::query_scalar("SELECT id FROM user_profiles WHERE id = $1 FOR SHARE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if user.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let reserved: Option<i32> = sqlx::query_scalar(
            "UPDATE books SET available = FALSE WHERE id = $1 AND available RETURNING id",
        )
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?;

        if reserved.is_none() {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
                .bind(book_id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists {
                AppError::Unavailable("Book is not available".to_string())
            } else {
                AppError::NotFound("Book not found".to_string())
            });
        }

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (user_id, book_id, borrowed_at, returned)
            VALUES ($1, $2, $3, FALSE)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Close an active loan and make its book available again.
    ///
    /// A missing loan and an already returned one are the same error.
    pub async fn return_active(&self, loan_id: i32) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>(
            "UPDATE loans SET returned = TRUE WHERE id = $1 AND NOT returned RETURNING *",
        )
        .bind(loan_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Loan not found or already returned.".to_string()))?;

        sqlx::query("UPDATE books SET available = TRUE WHERE id = $1")
            .bind(loan.book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Set the returned flag of a loan, keeping its book's availability in step
    pub async fn set_returned(&self, loan_id: i32, returned: bool) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(loan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if loan.returned == returned {
            tx.commit().await?;
            return Ok(loan);
        }

        if returned {
            sqlx::query("UPDATE books SET available = TRUE WHERE id = $1")
                .bind(loan.book_id)
                .execute(&mut *tx)
                .await?;
        } else {
            // Reopening needs the book back
            let reserved: Option<i32> = sqlx::query_scalar(
                "UPDATE books SET available = FALSE WHERE id = $1 AND available RETURNING id",
            )
            .bind(loan.book_id)
            .fetch_optional(&mut *tx)
            .await?;
            if reserved.is_none() {
                return Err(AppError::Unavailable("Book is not available".to_string()));
            }
        }

        let loan = sqlx::query_as::<_, Loan>("UPDATE loans SET returned = $2 WHERE id = $1 RETURNING *")
            .bind(loan_id)
            .bind(returned)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Delete a loan; an active one releases its book
    pub async fn delete(&self, loan_id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>("DELETE FROM loans WHERE id = $1 RETURNING *")
            .bind(loan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if !loan.returned {
            sqlx::query("UPDATE books SET available = TRUE WHERE id = $1")
                .bind(loan.book_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

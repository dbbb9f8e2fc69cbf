//! Loan management service

use crate::{
    error::{AppError, AppResult},
    models::loan::{BorrowRequest, Loan, LoanDetails, UpdateLoan},
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Borrow a book. Only per-book exclusivity is enforced; a user may hold any number of loans.
    pub async fn borrow(&self, request: BorrowRequest) -> AppResult<Loan> {
        let (user_id, book_id) = match (request.user_id, request.book_id) {
            (Some(user_id), Some(book_id)) => (user_id, book_id),
            _ => return Err(AppError::BadRequest("Missing user_id or book_id".to_string())),
        };

        let loan = self.repository.loans.borrow(user_id, book_id).await?;
        tracing::info!(loan_id = loan.id, user_id, book_id, "Book borrowed");
        Ok(loan)
    }

    /// Return the book held by an active loan
    pub async fn return_book(&self, loan_id: Option<i32>) -> AppResult<Loan> {
        let loan_id = loan_id.ok_or_else(|| AppError::BadRequest("Loan ID missing.".to_string()))?;

        let loan = self.repository.loans.return_active(loan_id).await?;
        tracing::info!(loan_id, book_id = loan.book_id, "Book returned");
        Ok(loan)
    }

    /// Active loans of a user
    pub async fn borrowed_books(&self, user_id: Option<i32>) -> AppResult<Vec<LoanDetails>> {
        let user_id = user_id.ok_or_else(|| AppError::BadRequest("user_id is required".to_string()))?;
        self.repository.loans.active_for_user(user_id).await
    }

    pub async fn list(&self) -> AppResult<Vec<LoanDetails>> {
        self.repository.loans.list().await
    }

    pub async fn get(&self, id: i32) -> AppResult<LoanDetails> {
        self.repository.loans.get_details(id).await
    }

    pub async fn update(&self, id: i32, update: UpdateLoan) -> AppResult<LoanDetails> {
        if let Some(returned) = update.returned {
            self.repository.loans.set_returned(id, returned).await?;
            tracing::info!(loan_id = id, returned, "Loan updated");
        }
        self.repository.loans.get_details(id).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.loans.delete(id).await?;
        tracing::info!(loan_id = id, "Loan deleted");
        Ok(())
    }
}

//! Book catalog service

use std::collections::HashMap;

use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookDetails, CreateBook, UpdateBook},
        loan::LoanDetails,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// All books with their loan history
    pub async fn list(&self) -> AppResult<Vec<BookDetails>> {
        let books = self.repository.books.list().await?;
        let ids: Vec<i32> = books.iter().map(|b| b.id).collect();

        let mut loans_by_book: HashMap<i32, Vec<LoanDetails>> = HashMap::new();
        for loan in self.repository.loans.for_books(&ids).await? {
            loans_by_book.entry(loan.book.id).or_default().push(loan);
        }

        Ok(books
            .into_iter()
            .map(|book| {
                let loans = loans_by_book.remove(&book.id).unwrap_or_default();
                BookDetails::new(book, loans)
            })
            .collect())
    }

    pub async fn get(&self, id: i32) -> AppResult<BookDetails> {
        let book = self.repository.books.get_by_id(id).await?;
        self.with_loans(book).await
    }

    pub async fn create(&self, book: CreateBook) -> AppResult<BookDetails> {
        book.validate()?;
        let created = self.repository.books.create(&book).await?;
        tracing::info!(book_id = created.id, "Book created");
        Ok(BookDetails::new(created, Vec::new()))
    }

    pub async fn update(&self, id: i32, book: UpdateBook) -> AppResult<BookDetails> {
        book.validate()?;
        let updated = self.repository.books.update(id, &book).await?;
        self.with_loans(updated).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    async fn with_loans(&self, book: Book) -> AppResult<BookDetails> {
        let loans = self.repository.loans.for_books(&[book.id]).await?;
        Ok(BookDetails::new(book, loans))
    }
}

//! Data models for the lending server

pub mod book;
pub mod enums;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookDetails};
pub use enums::{ProfileStatus, UserRole};
pub use loan::{Loan, LoanDetails};
pub use user::{UserClaims, UserProfile};

//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::loan::{BorrowRequest, BorrowedBooksQuery, LoanDetails, ReturnRequest, UpdateLoan},
    AppState,
};

use super::{Json, MessageResponse, RequestContext};

/// Borrow response
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    pub message: String,
    pub loan_id: i32,
}

/// Borrow a book for a user
#[utoipa::path(
    post,
    path = "/loans/borrow_book",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Loan created", body = BorrowResponse),
        (status = 400, description = "Missing user_id or book_id"),
        (status = 404, description = "User or book not found"),
        (status = 409, description = "Book is not available")
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<BorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    ctx.require_authenticated()?;

    let loan = state.services.loans.borrow(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            message: "Book borrowed successfully!".to_string(),
            loan_id: loan.id,
        }),
    ))
}

/// Active loans of a user
#[utoipa::path(
    get,
    path = "/loans/borrowed_books",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(BorrowedBooksQuery),
    responses(
        (status = 200, description = "Active loans", body = Vec<LoanDetails>),
        (status = 400, description = "user_id is required")
    )
)]
pub async fn borrowed_books(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<BorrowedBooksQuery>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    ctx.require_authenticated()?;

    let loans = state.services.loans.borrowed_books(query.user_id).await?;
    Ok(Json(loans))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/return_book",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Book returned", body = MessageResponse),
        (status = 400, description = "Loan ID missing"),
        (status = 404, description = "Loan not found or already returned")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<ReturnRequest>,
) -> AppResult<Json<MessageResponse>> {
    ctx.require_authenticated()?;

    state.services.loans.return_book(request.loan_id).await?;
    Ok(Json(MessageResponse::new("Book returned successfully!")))
}

/// List every loan
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All loans", body = Vec<LoanDetails>)
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> AppResult<Json<Vec<LoanDetails>>> {
    ctx.require_authenticated()?;

    let loans = state.services.loans.list().await?;
    Ok(Json(loans))
}

/// Get a loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    ctx.require_authenticated()?;

    let loan = state.services.loans.get(id).await?;
    Ok(Json(loan))
}

/// Set the returned flag of a loan
#[utoipa::path(
    put,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = UpdateLoan,
    responses(
        (status = 200, description = "Loan updated", body = LoanDetails),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Book is held by another loan")
    )
)]
pub async fn update_loan(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
    Json(update): Json<UpdateLoan>,
) -> AppResult<Json<LoanDetails>> {
    ctx.require_authenticated()?;

    let loan = state.services.loans.update(id, update).await?;
    Ok(Json(loan))
}

/// Delete a loan
#[utoipa::path(
    delete,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 204, description = "Loan deleted"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn delete_loan(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    ctx.require_authenticated()?;

    state.services.loans.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Checkout, return and renewal endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::loan::Loan,
    repository::loans::LoanIdentifier,
    services::circulation::CheckoutCommand,
};

use super::AuthenticatedActor;

/// Checkout request
#[derive(Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    /// Borrowing patron
    #[validate(range(min = 1))]
    pub patron_id: i32,
    /// Copy ID (optional if barcode provided)
    pub copy_id: Option<i32>,
    /// Copy barcode
    #[validate(length(min = 1, max = 64))]
    pub barcode: Option<String>,
}

/// Response carrying a loan
#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    pub loan: Loan,
    /// Status message
    pub message: String,
}

/// Return response with the fine, if one was charged
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    pub loan: Loan,
    /// Overdue fine charged on this return
    pub fine_charged: Option<Decimal>,
    /// Hold promoted to ready-for-pickup by this return
    pub promoted_hold_id: Option<i32>,
    /// When the promoted hold must be picked up by
    pub pickup_deadline: Option<chrono::DateTime<chrono::Utc>>,
}

/// Get a patron's open loans
#[utoipa::path(
    get,
    path = "/patrons/{id}/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Patron ID")
    ),
    responses(
        (status = 200, description = "Patron's open loans", body = Vec<Loan>),
        (status = 403, description = "Not the actor's own account"),
        (status = 404, description = "Patron not found")
    )
)]
pub async fn get_patron_loans(
    State(state): State<crate::AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(patron_id): Path<i32>,
) -> AppResult<Json<Vec<Loan>>> {
    let loans = state
        .services
        .circulation
        .get_patron_loans(patron_id, &actor)
        .await?;
    Ok(Json(loans))
}

/// Checkout a copy to a patron
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanResponse),
        (status = 400, description = "Missing copy identifier"),
        (status = 403, description = "Suspended, expired, over limit or held for another patron"),
        (status = 404, description = "Patron or copy not found"),
        (status = 409, description = "Copy is not available")
    )
)]
pub async fn checkout(
    State(state): State<crate::AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    request.validate()?;

    let command = CheckoutCommand {
        patron_id: request.patron_id,
        copy_id: request.copy_id,
        barcode: request.barcode,
    };

    let loan = state.services.circulation.checkout(command, &actor).await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse {
            loan,
            message: "Copy checked out".to_string(),
        }),
    ))
}

/// Return a copy by loan ID
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Copy returned", body = ReturnResponse),
        (status = 403, description = "Not the actor's own loan"),
        (status = 404, description = "Active loan not found")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let outcome = state
        .services
        .circulation
        .return_copy(LoanIdentifier::LoanId(loan_id), &actor)
        .await?;

    Ok(Json(ReturnResponse {
        loan: outcome.loan,
        fine_charged: outcome.fine_charged,
        promoted_hold_id: outcome.promoted_hold.map(|h| h.id),
        pickup_deadline: outcome.pickup_deadline,
    }))
}

/// Return a copy by copy ID (at most one loan can be open for it)
#[utoipa::path(
    post,
    path = "/loans/copies/{copy_id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("copy_id" = i32, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Copy returned", body = ReturnResponse),
        (status = 403, description = "Not the actor's own loan"),
        (status = 404, description = "Active loan not found")
    )
)]
pub async fn return_by_copy(
    State(state): State<crate::AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(copy_id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let outcome = state
        .services
        .circulation
        .return_copy(LoanIdentifier::CopyId(copy_id), &actor)
        .await?;

    Ok(Json(ReturnResponse {
        loan: outcome.loan,
        fine_charged: outcome.fine_charged,
        promoted_hold_id: outcome.promoted_hold.map(|h| h.id),
        pickup_deadline: outcome.pickup_deadline,
    }))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan renewed", body = LoanResponse),
        (status = 403, description = "Max renewals reached or held for another patron"),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Loan is already closed")
    )
)]
pub async fn renew_loan(
    State(state): State<crate::AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanResponse>> {
    let loan = state.services.circulation.renew(loan_id, &actor).await?;
    let message = format!("Loan renewed ({} renewals)", loan.renewal_count);

    Ok(Json(LoanResponse { loan, message }))
}

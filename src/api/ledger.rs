//! Fine ledger endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{error::AppResult, models::ledger::LedgerEntry};

use super::AuthenticatedActor;

/// Payment request
#[derive(Deserialize, ToSchema)]
pub struct PaymentRequest {
    /// Amount to apply against the entry's outstanding balance
    pub amount: Decimal,
}

/// List a patron's ledger entries
#[utoipa::path(
    get,
    path = "/patrons/{id}/ledger",
    tag = "ledger",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Patron ID")
    ),
    responses(
        (status = 200, description = "Patron's ledger, newest first", body = Vec<LedgerEntry>),
        (status = 403, description = "Not the actor's own account")
    )
)]
pub async fn list_patron_ledger(
    State(state): State<crate::AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(patron_id): Path<i32>,
) -> AppResult<Json<Vec<LedgerEntry>>> {
    let entries = state.services.ledger.list_for_patron(patron_id, &actor).await?;
    Ok(Json(entries))
}

/// Record a payment against one charge entry (staff only)
#[utoipa::path(
    post,
    path = "/ledger/{id}/payments",
    tag = "ledger",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Ledger entry ID")
    ),
    request_body = PaymentRequest,
    responses(
        (status = 200, description = "Updated charge entry", body = LedgerEntry),
        (status = 400, description = "Non-positive amount or overpayment"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Entry not found")
    )
)]
pub async fn record_payment(
    State(state): State<crate::AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(entry_id): Path<i32>,
    Json(request): Json<PaymentRequest>,
) -> AppResult<Json<LedgerEntry>> {
    let entry = state
        .services
        .ledger
        .record_payment(entry_id, request.amount, &actor)
        .await?;
    Ok(Json(entry))
}

/// Waive the remaining balance of a charge entry (staff only)
#[utoipa::path(
    post,
    path = "/ledger/{id}/waive",
    tag = "ledger",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Ledger entry ID")
    ),
    responses(
        (status = 200, description = "Waived charge entry", body = LedgerEntry),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Entry not found"),
        (status = 422, description = "Entry is not an open charge")
    )
)]
pub async fn waive_entry(
    State(state): State<crate::AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(entry_id): Path<i32>,
) -> AppResult<Json<LedgerEntry>> {
    let entry = state.services.ledger.waive(entry_id, &actor).await?;
    Ok(Json(entry))
}

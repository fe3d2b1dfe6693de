//! Patron policy endpoint

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{error::AppResult, models::patron::BorrowingPolicy};

use super::AuthenticatedActor;

/// Resolve a patron's borrowing policy (staff only)
#[utoipa::path(
    get,
    path = "/patrons/{id}/policy",
    tag = "patrons",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Patron ID")
    ),
    responses(
        (status = 200, description = "Resolved borrowing policy", body = BorrowingPolicy),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Patron not found")
    )
)]
pub async fn get_patron_policy(
    State(state): State<crate::AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(patron_id): Path<i32>,
) -> AppResult<Json<BorrowingPolicy>> {
    actor.require_staff()?;

    let policy = state.services.policy.resolve(patron_id).await?;
    Ok(Json(policy))
}

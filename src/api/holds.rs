//! Hold queue endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{error::AppResult, models::hold::Hold, services::holds::PlaceHoldCommand};

use super::AuthenticatedActor;

/// Place hold request
#[derive(Deserialize, Validate, ToSchema)]
pub struct PlaceHoldRequest {
    /// Patron placing the hold
    #[validate(range(min = 1))]
    pub patron_id: i32,
    /// Work to queue on
    #[validate(range(min = 1))]
    pub work_id: i32,
    /// Reserve one specific copy instead of the next available one
    pub copy_id: Option<i32>,
}

/// Place a hold on a work
#[utoipa::path(
    post,
    path = "/holds",
    tag = "holds",
    security(("bearer_auth" = [])),
    request_body = PlaceHoldRequest,
    responses(
        (status = 201, description = "Hold placed", body = Hold),
        (status = 403, description = "Not the actor's own account"),
        (status = 404, description = "Patron or work not found"),
        (status = 409, description = "Patron already holds this work")
    )
)]
pub async fn place_hold(
    State(state): State<crate::AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(request): Json<PlaceHoldRequest>,
) -> AppResult<(StatusCode, Json<Hold>)> {
    request.validate()?;

    let command = PlaceHoldCommand {
        patron_id: request.patron_id,
        work_id: request.work_id,
        copy_id: request.copy_id,
    };

    let hold = state.services.holds.place_hold(command, &actor).await?;

    Ok((StatusCode::CREATED, Json(hold)))
}

/// Cancel an active hold
#[utoipa::path(
    post,
    path = "/holds/{id}/cancel",
    tag = "holds",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Hold ID")
    ),
    responses(
        (status = 200, description = "Hold cancelled", body = Hold),
        (status = 403, description = "Not the actor's own hold"),
        (status = 404, description = "Hold not found"),
        (status = 422, description = "Hold is not active")
    )
)]
pub async fn cancel_hold(
    State(state): State<crate::AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(hold_id): Path<i32>,
) -> AppResult<Json<Hold>> {
    let hold = state.services.holds.cancel_hold(hold_id, &actor).await?;
    Ok(Json(hold))
}

/// List a work's active hold queue in promotion order (staff only)
#[utoipa::path(
    get,
    path = "/works/{id}/holds",
    tag = "holds",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Work ID")
    ),
    responses(
        (status = 200, description = "Active holds in promotion order", body = Vec<Hold>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn get_work_queue(
    State(state): State<crate::AppState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(work_id): Path<i32>,
) -> AppResult<Json<Vec<Hold>>> {
    let holds = state.services.holds.get_work_queue(work_id, &actor).await?;
    Ok(Json(holds))
}

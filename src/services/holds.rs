//! Hold queue manager

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{actor::ActorClaims, hold::Hold},
    repository::Repository,
};

/// Place-hold command
#[derive(Debug, Clone)]
pub struct PlaceHoldCommand {
    pub patron_id: i32,
    pub work_id: i32,
    /// Reserve one specific copy instead of the next available one
    pub copy_id: Option<i32>,
}

#[derive(Clone)]
pub struct HoldsService {
    repository: Repository,
}

impl HoldsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Queue a hold on a work for a patron
    pub async fn place_hold(&self, command: PlaceHoldCommand, actor: &ActorClaims) -> AppResult<Hold> {
        actor.require_self_or_staff(command.patron_id)?;

        let now = Utc::now();
        let mut tx = self.repository.begin().await?;

        self.repository
            .patrons
            .exists(&mut tx, command.patron_id)
            .await?;

        // Work row lock serializes priority assignment per work.
        self.repository.holds.lock_work(&mut tx, command.work_id).await?;

        if let Some(copy_id) = command.copy_id {
            let copy = self.repository.copies.get(copy_id).await?;
            if copy.work_id != command.work_id {
                return Err(AppError::InvalidInput(format!(
                    "Copy {} does not belong to work {}",
                    copy_id, command.work_id
                )));
            }
        }

        if self
            .repository
            .holds
            .has_active_for_patron(&mut tx, command.work_id, command.patron_id)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "Patron {} already holds work {}",
                command.patron_id, command.work_id
            )));
        }

        let priority = self
            .repository
            .holds
            .next_priority(&mut tx, command.work_id)
            .await?;

        let hold = self
            .repository
            .holds
            .insert(
                &mut tx,
                command.patron_id,
                command.work_id,
                command.copy_id,
                priority,
                now,
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            hold_id = hold.id,
            work_id = hold.work_id,
            priority = hold.priority,
            "hold placed"
        );

        Ok(hold)
    }

    /// Cancel an active hold. Remaining priorities keep their values.
    pub async fn cancel_hold(&self, hold_id: i32, actor: &ActorClaims) -> AppResult<Hold> {
        let now = Utc::now();
        let mut tx = self.repository.begin().await?;

        let hold = self.repository.holds.lock_by_id(&mut tx, hold_id).await?;
        actor.require_self_or_staff(hold.patron_id)?;

        let hold = self.repository.holds.cancel(&mut tx, hold.id, now).await?;

        tx.commit().await?;

        tracing::info!(hold_id = hold.id, "hold cancelled");

        Ok(hold)
    }

    /// Staff view of a work's active queue in promotion order
    pub async fn get_work_queue(&self, work_id: i32, actor: &ActorClaims) -> AppResult<Vec<Hold>> {
        actor.require_staff()?;
        self.repository.holds.get_queue_for_work(work_id).await
    }
}

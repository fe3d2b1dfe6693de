//! Holds repository for database operations
//!
//! Priority assignment is serialized per work: `lock_work` takes the work
//! row lock before the active-hold count, so concurrent placements on the
//! same work cannot collide on a priority value. The partial unique index
//! on (work_id, priority) is the backstop.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::HoldStatus,
        hold::{Hold, HoldRow},
    },
};

const ACTIVE_STATUSES: &str = "0, 1"; // pending, ready_for_pickup

#[derive(Clone)]
pub struct HoldsRepository {
    pool: Pool<Postgres>,
}

impl HoldsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a hold by id
    pub async fn get_by_id(&self, id: i32) -> AppResult<Hold> {
        sqlx::query_as::<_, HoldRow>("SELECT * FROM holds WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Hold::from)
            .ok_or_else(|| AppError::NotFound(format!("Hold with id {} not found", id)))
    }

    /// Lock a hold by id for the caller's transaction
    pub async fn lock_by_id(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
    ) -> AppResult<Hold> {
        sqlx::query_as::<_, HoldRow>("SELECT * FROM holds WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .map(Hold::from)
            .ok_or_else(|| AppError::NotFound(format!("Hold with id {} not found", id)))
    }

    /// Lock the work row, failing with NotFound if the work does not exist
    pub async fn lock_work(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        work_id: i32,
    ) -> AppResult<()> {
        let found: Option<i32> =
            sqlx::query_scalar("SELECT id FROM works WHERE id = $1 FOR UPDATE")
                .bind(work_id)
                .fetch_optional(&mut **tx)
                .await?;

        found
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Work with id {} not found", work_id)))
    }

    /// Find an active hold on this copy or its work that outranks the given
    /// patron. Such a hold blocks checkout and renewal.
    ///
    /// Only holds queued ahead of the patron's own place in line count: a
    /// patron whose hold was promoted to ready-for-pickup must not be turned
    /// away because someone queued behind them. A patron with no hold at all
    /// is outranked by every active hold.
    pub async fn find_blocking(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        work_id: i32,
        copy_id: i32,
        patron_id: i32,
    ) -> AppResult<Option<Hold>> {
        let row = sqlx::query_as::<_, HoldRow>(&format!(
            r#"
            SELECT * FROM holds
            WHERE work_id = $1
              AND status IN ({ACTIVE_STATUSES})
              AND patron_id <> $2
              AND (copy_id IS NULL OR copy_id = $3)
              AND priority < COALESCE((
                  SELECT MIN(priority) FROM holds
                  WHERE work_id = $1 AND patron_id = $2
                    AND status IN ({ACTIVE_STATUSES})
                    AND (copy_id IS NULL OR copy_id = $3)
              ), 2147483647)
            ORDER BY priority
            LIMIT 1
            "#
        ))
        .bind(work_id)
        .bind(patron_id)
        .bind(copy_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.map(Hold::from))
    }

    /// Does the patron already have an active hold on this work?
    pub async fn has_active_for_patron(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        work_id: i32,
        patron_id: i32,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(&format!(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM holds
                WHERE work_id = $1 AND patron_id = $2 AND status IN ({ACTIVE_STATUSES})
            )
            "#
        ))
        .bind(work_id)
        .bind(patron_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(exists)
    }

    /// Next priority for the work's queue: one past the highest active
    /// priority. Cancellations leave gaps, so counting active holds would
    /// re-issue a surviving priority; MAX never does. Callers must hold the
    /// work row lock.
    pub async fn next_priority(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        work_id: i32,
    ) -> AppResult<i32> {
        let max: Option<i32> = sqlx::query_scalar(&format!(
            "SELECT MAX(priority) FROM holds WHERE work_id = $1 AND status IN ({ACTIVE_STATUSES})"
        ))
        .bind(work_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(max.unwrap_or(0) + 1)
    }

    /// Insert a new pending hold with the given priority
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        patron_id: i32,
        work_id: i32,
        copy_id: Option<i32>,
        priority: i32,
        placed_at: DateTime<Utc>,
    ) -> AppResult<Hold> {
        let row = sqlx::query_as::<_, HoldRow>(
            r#"
            INSERT INTO holds (patron_id, work_id, copy_id, placed_at, priority, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(patron_id)
        .bind(work_id)
        .bind(copy_id)
        .bind(placed_at)
        .bind(priority)
        .bind(i16::from(HoldStatus::Pending))
        .fetch_one(&mut **tx)
        .await?;

        Ok(Hold::from(row))
    }

    /// Mark the patron's own active holds on this copy or work as fulfilled
    /// (side effect of the patron checking the copy out)
    pub async fn fulfil_for_patron(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        work_id: i32,
        copy_id: i32,
        patron_id: i32,
    ) -> AppResult<u64> {
        let rows = sqlx::query(&format!(
            r#"
            UPDATE holds SET status = $1
            WHERE work_id = $2 AND patron_id = $3
              AND status IN ({ACTIVE_STATUSES})
              AND (copy_id IS NULL OR copy_id = $4)
            "#
        ))
        .bind(i16::from(HoldStatus::Fulfilled))
        .bind(work_id)
        .bind(patron_id)
        .bind(copy_id)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        Ok(rows)
    }

    /// Lock the next pending hold in the work's queue: lowest priority,
    /// earliest placed as tie-break
    pub async fn lock_next_pending(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        work_id: i32,
    ) -> AppResult<Option<Hold>> {
        let row = sqlx::query_as::<_, HoldRow>(
            r#"
            SELECT * FROM holds
            WHERE work_id = $1 AND status = $2
            ORDER BY priority, placed_at
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(work_id)
        .bind(i16::from(HoldStatus::Pending))
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.map(Hold::from))
    }

    /// Promote a pending hold to ready-for-pickup
    pub async fn promote(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        hold_id: i32,
        ready_since: DateTime<Utc>,
    ) -> AppResult<Hold> {
        let row = sqlx::query_as::<_, HoldRow>(
            r#"
            UPDATE holds SET status = $1, ready_since = $2
            WHERE id = $3 AND status = $4
            RETURNING *
            "#,
        )
        .bind(i16::from(HoldStatus::ReadyForPickup))
        .bind(ready_since)
        .bind(hold_id)
        .bind(i16::from(HoldStatus::Pending))
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::Conflict(format!("Hold {} is no longer pending", hold_id)))?;

        Ok(Hold::from(row))
    }

    /// Cancel an active hold. Priorities of the remaining holds keep their
    /// values; gaps do not break the queue order.
    pub async fn cancel(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        hold_id: i32,
        cancelled_at: DateTime<Utc>,
    ) -> AppResult<Hold> {
        let row = sqlx::query_as::<_, HoldRow>(&format!(
            r#"
            UPDATE holds SET status = $1, cancelled_at = $2
            WHERE id = $3 AND status IN ({ACTIVE_STATUSES})
            RETURNING *
            "#
        ))
        .bind(i16::from(HoldStatus::Cancelled))
        .bind(cancelled_at)
        .bind(hold_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::InvalidState(format!("Hold {} is not active", hold_id)))?;

        Ok(Hold::from(row))
    }

    /// List a work's active holds in promotion order
    pub async fn get_queue_for_work(&self, work_id: i32) -> AppResult<Vec<Hold>> {
        let rows = sqlx::query_as::<_, HoldRow>(&format!(
            r#"
            SELECT * FROM holds
            WHERE work_id = $1 AND status IN ({ACTIVE_STATUSES})
            ORDER BY priority, placed_at
            "#
        ))
        .bind(work_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Hold::from).collect())
    }
}

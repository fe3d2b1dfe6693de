//! Copies repository: the item availability state machine
//!
//! Every status change is a conditional UPDATE guarded by the expected
//! current status; zero affected rows means another transaction got there
//! first and the caller sees a `Conflict` instead of a silent overwrite.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        copy::{Copy, CopyRow},
        enums::CopyStatus,
    },
};

/// Copy lookup key: internal id or external barcode
#[derive(Debug, Clone)]
pub enum CopyIdentifier {
    Id(i32),
    Barcode(String),
}

#[derive(Clone)]
pub struct CopiesRepository {
    pool: Pool<Postgres>,
}

impl CopiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a copy by id
    pub async fn get(&self, id: i32) -> AppResult<Copy> {
        sqlx::query_as::<_, CopyRow>("SELECT * FROM copies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Copy::from)
            .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))
    }

    /// Resolve and lock a copy by id or barcode for the caller's transaction
    pub async fn lock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        identifier: &CopyIdentifier,
    ) -> AppResult<Copy> {
        let row = match identifier {
            CopyIdentifier::Id(id) => {
                sqlx::query_as::<_, CopyRow>("SELECT * FROM copies WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(&mut **tx)
                    .await?
            }
            CopyIdentifier::Barcode(barcode) => {
                sqlx::query_as::<_, CopyRow>("SELECT * FROM copies WHERE barcode = $1 FOR UPDATE")
                    .bind(barcode)
                    .fetch_optional(&mut **tx)
                    .await?
            }
        };

        row.map(Copy::from)
            .ok_or_else(|| AppError::NotFound("Copy not found".to_string()))
    }

    /// Transition available -> on_loan, stamping the due date and bumping the
    /// lifetime loan counter
    pub async fn mark_on_loan(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        copy_id: i32,
        due_date: DateTime<Utc>,
    ) -> AppResult<()> {
        let rows = sqlx::query(
            r#"
            UPDATE copies
            SET status = $1, due_date = $2, loan_count = loan_count + 1
            WHERE id = $3 AND status = $4
            "#,
        )
        .bind(i16::from(CopyStatus::OnLoan))
        .bind(due_date)
        .bind(copy_id)
        .bind(i16::from(CopyStatus::Available))
        .execute(&mut **tx)
        .await?
        .rows_affected();

        self.check_transitioned(rows, copy_id, tx).await
    }

    /// Transition on_loan -> available, clearing the due date and recording
    /// the last-borrowed date
    pub async fn mark_returned(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        copy_id: i32,
        returned_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let rows = sqlx::query(
            r#"
            UPDATE copies
            SET status = $1, due_date = NULL, last_borrowed_date = $2
            WHERE id = $3 AND status = $4
            "#,
        )
        .bind(i16::from(CopyStatus::Available))
        .bind(returned_at)
        .bind(copy_id)
        .bind(i16::from(CopyStatus::OnLoan))
        .execute(&mut **tx)
        .await?
        .rows_affected();

        self.check_transitioned(rows, copy_id, tx).await
    }

    /// Extend the due date on renewal and bump the lifetime renewal counter
    pub async fn apply_renewal(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        copy_id: i32,
        new_due_date: DateTime<Utc>,
    ) -> AppResult<()> {
        let rows = sqlx::query(
            r#"
            UPDATE copies
            SET due_date = $1, renewal_count = renewal_count + 1
            WHERE id = $2 AND status = $3
            "#,
        )
        .bind(new_due_date)
        .bind(copy_id)
        .bind(i16::from(CopyStatus::OnLoan))
        .execute(&mut **tx)
        .await?
        .rows_affected();

        self.check_transitioned(rows, copy_id, tx).await
    }

    /// Turn a failed conditional update into a conflict naming the status
    /// the copy actually has
    async fn check_transitioned(
        &self,
        rows_affected: u64,
        copy_id: i32,
        tx: &mut Transaction<'_, Postgres>,
    ) -> AppResult<()> {
        if rows_affected == 1 {
            return Ok(());
        }

        let current: Option<i16> = sqlx::query_scalar("SELECT status FROM copies WHERE id = $1")
            .bind(copy_id)
            .fetch_optional(&mut **tx)
            .await?;

        match current {
            Some(status) => Err(AppError::Conflict(format!(
                "Copy {} is {}",
                copy_id,
                CopyStatus::from(status)
            ))),
            None => Err(AppError::NotFound(format!("Copy with id {} not found", copy_id))),
        }
    }
}

//! Ledger repository for database operations

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{LedgerEntryKind, LedgerEntryStatus},
        ledger::{LedgerEntry, LedgerEntryRow},
    },
};

#[derive(Clone)]
pub struct LedgerRepository {
    pool: Pool<Postgres>,
}

impl LedgerRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Lock a ledger entry for the caller's transaction
    pub async fn lock_by_id(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
    ) -> AppResult<LedgerEntry> {
        sqlx::query_as::<_, LedgerEntryRow>("SELECT * FROM ledger_entries WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .map(LedgerEntry::from)
            .ok_or_else(|| AppError::NotFound(format!("Ledger entry with id {} not found", id)))
    }

    /// Record a charge (overdue fine, lost item, damage) with
    /// charged = outstanding = amount
    pub async fn insert_charge(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        patron_id: i32,
        copy_id: Option<i32>,
        loan_id: Option<i32>,
        kind: LedgerEntryKind,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> AppResult<LedgerEntry> {
        let row = sqlx::query_as::<_, LedgerEntryRow>(
            r#"
            INSERT INTO ledger_entries
                (patron_id, copy_id, loan_id, kind, charged, outstanding, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(patron_id)
        .bind(copy_id)
        .bind(loan_id)
        .bind(i16::from(kind))
        .bind(amount)
        .bind(i16::from(LedgerEntryStatus::Open))
        .bind(created_at)
        .fetch_one(&mut **tx)
        .await?;

        Ok(LedgerEntry::from(row))
    }

    /// Record a payment line. Payments carry no outstanding balance of their
    /// own; they settle the targeted charge via `settle`.
    pub async fn insert_payment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        patron_id: i32,
        copy_id: Option<i32>,
        loan_id: Option<i32>,
        amount: Decimal,
        recorded_by: Option<i32>,
        created_at: DateTime<Utc>,
    ) -> AppResult<LedgerEntry> {
        let row = sqlx::query_as::<_, LedgerEntryRow>(
            r#"
            INSERT INTO ledger_entries
                (patron_id, copy_id, loan_id, kind, charged, outstanding, status, created_at, recorded_by)
            VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(patron_id)
        .bind(copy_id)
        .bind(loan_id)
        .bind(i16::from(LedgerEntryKind::Payment))
        .bind(amount)
        .bind(i16::from(LedgerEntryStatus::Paid))
        .bind(created_at)
        .bind(recorded_by)
        .fetch_one(&mut **tx)
        .await?;

        Ok(LedgerEntry::from(row))
    }

    /// Write a charge's new outstanding balance and settlement status
    pub async fn settle(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry_id: i32,
        outstanding: Decimal,
        status: LedgerEntryStatus,
        recorded_by: Option<i32>,
    ) -> AppResult<LedgerEntry> {
        let row = sqlx::query_as::<_, LedgerEntryRow>(
            r#"
            UPDATE ledger_entries
            SET outstanding = $1, status = $2, recorded_by = COALESCE($3, recorded_by)
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(outstanding)
        .bind(i16::from(status))
        .bind(recorded_by)
        .bind(entry_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ledger entry with id {} not found", entry_id)))?;

        Ok(LedgerEntry::from(row))
    }

    /// List a patron's ledger, newest first
    pub async fn list_for_patron(&self, patron_id: i32) -> AppResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerEntryRow>(
            "SELECT * FROM ledger_entries WHERE patron_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(patron_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LedgerEntry::from).collect())
    }
}

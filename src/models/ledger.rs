//! Patron account ledger model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::{LedgerEntryKind, LedgerEntryStatus};

/// Internal row structure for ledger queries
#[derive(Debug, Clone, FromRow)]
pub struct LedgerEntryRow {
    pub id: i32,
    pub patron_id: i32,
    pub copy_id: Option<i32>,
    pub loan_id: Option<i32>,
    pub kind: i16,
    pub charged: Decimal,
    pub outstanding: Decimal,
    pub status: i16,
    pub created_at: DateTime<Utc>,
    pub recorded_by: Option<i32>,
}

impl From<LedgerEntryRow> for LedgerEntry {
    fn from(row: LedgerEntryRow) -> Self {
        LedgerEntry {
            id: row.id,
            patron_id: row.patron_id,
            copy_id: row.copy_id,
            loan_id: row.loan_id,
            kind: LedgerEntryKind::from(row.kind),
            charged: row.charged,
            outstanding: row.outstanding,
            status: LedgerEntryStatus::from(row.status),
            created_at: row.created_at,
            recorded_by: row.recorded_by,
        }
    }
}

/// One charge or payment line against a patron account
///
/// Charge-type entries keep `0 <= outstanding <= charged`; entries are never
/// deleted, only settled or waived.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LedgerEntry {
    pub id: i32,
    pub patron_id: i32,
    pub copy_id: Option<i32>,
    pub loan_id: Option<i32>,
    pub kind: LedgerEntryKind,
    pub charged: Decimal,
    pub outstanding: Decimal,
    pub status: LedgerEntryStatus,
    pub created_at: DateTime<Utc>,
    /// Staff patron id for payments and waives
    pub recorded_by: Option<i32>,
}

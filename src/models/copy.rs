//! Work and copy (physical item) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::CopyStatus;

/// Catalog title. Read-only here; copies hang off it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Work {
    pub id: i32,
    pub title: String,
}

/// Internal row structure for copy queries
#[derive(Debug, Clone, FromRow)]
pub struct CopyRow {
    pub id: i32,
    pub work_id: i32,
    pub barcode: Option<String>,
    pub status: i16,
    pub loanable: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub last_borrowed_date: Option<DateTime<Utc>>,
    pub loan_count: i32,
    pub renewal_count: i32,
    pub replacement_cost: Option<Decimal>,
}

impl From<CopyRow> for Copy {
    fn from(row: CopyRow) -> Self {
        Copy {
            id: row.id,
            work_id: row.work_id,
            barcode: row.barcode,
            status: CopyStatus::from(row.status),
            loanable: row.loanable,
            due_date: row.due_date,
            last_borrowed_date: row.last_borrowed_date,
            loan_count: row.loan_count,
            renewal_count: row.renewal_count,
            replacement_cost: row.replacement_cost,
        }
    }
}

/// Physical copy of a work
///
/// Availability status, due date and the lifetime counters are mutated
/// exclusively by the circulation engines; everything else belongs to
/// catalog management.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Copy {
    pub id: i32,
    pub work_id: i32,
    pub barcode: Option<String>,
    pub status: CopyStatus,
    /// Copies flagged not loanable are refused at checkout regardless of status
    pub loanable: bool,
    /// Set only while the copy is on loan
    pub due_date: Option<DateTime<Utc>>,
    pub last_borrowed_date: Option<DateTime<Utc>>,
    pub loan_count: i32,
    pub renewal_count: i32,
    pub replacement_cost: Option<Decimal>,
}

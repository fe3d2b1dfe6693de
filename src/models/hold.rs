//! Hold (reservation) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::HoldStatus;

/// Internal row structure for hold queries
#[derive(Debug, Clone, FromRow)]
pub struct HoldRow {
    pub id: i32,
    pub patron_id: i32,
    pub work_id: i32,
    pub copy_id: Option<i32>,
    pub placed_at: DateTime<Utc>,
    pub priority: i32,
    pub status: i16,
    pub ready_since: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<HoldRow> for Hold {
    fn from(row: HoldRow) -> Self {
        Hold {
            id: row.id,
            patron_id: row.patron_id,
            work_id: row.work_id,
            copy_id: row.copy_id,
            placed_at: row.placed_at,
            priority: row.priority,
            status: HoldStatus::from(row.status),
            ready_since: row.ready_since,
            cancelled_at: row.cancelled_at,
        }
    }
}

/// Queued request for the next available copy of a work
///
/// Priorities on one work's active holds form a total order; gaps left by
/// cancellations are fine, ordering is the invariant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Hold {
    pub id: i32,
    pub patron_id: i32,
    pub work_id: i32,
    /// Set when the patron reserved one specific copy rather than the work
    pub copy_id: Option<i32>,
    pub placed_at: DateTime<Utc>,
    pub priority: i32,
    pub status: HoldStatus,
    pub ready_since: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

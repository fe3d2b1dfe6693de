//! Patron standing and borrowing policy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Patron joined with its category, as read by the policy resolver
#[derive(Debug, Clone, FromRow)]
pub struct PatronRecord {
    pub id: i32,
    pub category_id: i32,
    pub membership_expiry: Option<DateTime<Utc>>,
    pub suspended_until: Option<DateTime<Utc>>,
    pub suspension_reason: Option<String>,
    pub max_loans: i16,
    pub loan_period_days: i16,
}

/// Resolved borrowing policy for one patron
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowingPolicy {
    pub patron_id: i32,
    pub max_concurrent_loans: i16,
    pub loan_period_days: i16,
    pub is_suspended: bool,
    pub suspended_until: Option<DateTime<Utc>>,
    pub is_membership_expired: bool,
}

impl BorrowingPolicy {
    /// Derive the policy from a patron record at a point in time.
    ///
    /// Suspended iff `suspended_until >= now`; expired iff
    /// `membership_expiry < now`. A null date means not suspended / no
    /// expiry.
    pub fn from_record(record: &PatronRecord, now: DateTime<Utc>) -> Self {
        let is_suspended = record.suspended_until.map(|until| until >= now).unwrap_or(false);
        let is_membership_expired = record
            .membership_expiry
            .map(|expiry| expiry < now)
            .unwrap_or(false);

        Self {
            patron_id: record.id,
            max_concurrent_loans: record.max_loans,
            loan_period_days: record.loan_period_days,
            is_suspended,
            suspended_until: if is_suspended { record.suspended_until } else { None },
            is_membership_expired,
        }
    }
}

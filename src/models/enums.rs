//! Shared circulation status enums
//!
//! Statuses are stored as smallint codes; the enums here are the only way
//! the engines read or write them, so invalid states stay unrepresentable.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// CopyStatus
// ---------------------------------------------------------------------------

/// Availability state of a physical copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum CopyStatus {
    Available = 0,
    OnLoan = 1,
    Lost = 2,
    Damaged = 3,
    Withdrawn = 4,
}

impl From<i16> for CopyStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => CopyStatus::OnLoan,
            2 => CopyStatus::Lost,
            3 => CopyStatus::Damaged,
            4 => CopyStatus::Withdrawn,
            _ => CopyStatus::Available,
        }
    }
}

impl From<CopyStatus> for i16 {
    fn from(s: CopyStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CopyStatus::Available => "available",
            CopyStatus::OnLoan => "on_loan",
            CopyStatus::Lost => "lost",
            CopyStatus::Damaged => "damaged",
            CopyStatus::Withdrawn => "withdrawn",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// HoldStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a hold
///
/// Pending and ReadyForPickup are the active states; the other three are
/// terminal and never mutated again. Expired is written by the external
/// pickup-window sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum HoldStatus {
    Pending = 0,
    ReadyForPickup = 1,
    Fulfilled = 2,
    Cancelled = 3,
    Expired = 4,
}

impl HoldStatus {
    pub fn is_active(self) -> bool {
        matches!(self, HoldStatus::Pending | HoldStatus::ReadyForPickup)
    }
}

impl From<i16> for HoldStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => HoldStatus::ReadyForPickup,
            2 => HoldStatus::Fulfilled,
            3 => HoldStatus::Cancelled,
            4 => HoldStatus::Expired,
            _ => HoldStatus::Pending,
        }
    }
}

impl From<HoldStatus> for i16 {
    fn from(s: HoldStatus) -> Self {
        s as i16
    }
}

// ---------------------------------------------------------------------------
// LedgerEntryKind
// ---------------------------------------------------------------------------

/// Kind of a ledger line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum LedgerEntryKind {
    OverdueFine = 0,
    LostItem = 1,
    Damage = 2,
    Payment = 3,
}

impl LedgerEntryKind {
    /// Charge-type entries carry an outstanding balance; payments do not.
    pub fn is_charge(self) -> bool {
        !matches!(self, LedgerEntryKind::Payment)
    }
}

impl From<i16> for LedgerEntryKind {
    fn from(v: i16) -> Self {
        match v {
            1 => LedgerEntryKind::LostItem,
            2 => LedgerEntryKind::Damage,
            3 => LedgerEntryKind::Payment,
            _ => LedgerEntryKind::OverdueFine,
        }
    }
}

impl From<LedgerEntryKind> for i16 {
    fn from(k: LedgerEntryKind) -> Self {
        k as i16
    }
}

// ---------------------------------------------------------------------------
// LedgerEntryStatus
// ---------------------------------------------------------------------------

/// Settlement state of a ledger line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum LedgerEntryStatus {
    Open = 0,
    Partial = 1,
    Paid = 2,
    Waived = 3,
}

impl From<i16> for LedgerEntryStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => LedgerEntryStatus::Partial,
            2 => LedgerEntryStatus::Paid,
            3 => LedgerEntryStatus::Waived,
            _ => LedgerEntryStatus::Open,
        }
    }
}

impl From<LedgerEntryStatus> for i16 {
    fn from(s: LedgerEntryStatus) -> Self {
        s as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_status_round_trips() {
        for s in [
            CopyStatus::Available,
            CopyStatus::OnLoan,
            CopyStatus::Lost,
            CopyStatus::Damaged,
            CopyStatus::Withdrawn,
        ] {
            assert_eq!(CopyStatus::from(i16::from(s)), s);
        }
    }

    #[test]
    fn hold_activity() {
        assert!(HoldStatus::Pending.is_active());
        assert!(HoldStatus::ReadyForPickup.is_active());
        assert!(!HoldStatus::Fulfilled.is_active());
        assert!(!HoldStatus::Cancelled.is_active());
        assert!(!HoldStatus::Expired.is_active());
    }

    #[test]
    fn payment_is_not_a_charge() {
        assert!(LedgerEntryKind::OverdueFine.is_charge());
        assert!(LedgerEntryKind::LostItem.is_charge());
        assert!(!LedgerEntryKind::Payment.is_charge());
    }
}

//! Circulation engines: checkout, return and renewal
//!
//! Each public operation runs inside one transaction; any failure aborts the
//! whole operation with no partial state change. Lock order is patron row
//! first, then copy row, in every path that takes both.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{actor::ActorClaims, enums::{CopyStatus, LedgerEntryKind}, hold::Hold, loan::Loan},
    repository::{
        copies::CopyIdentifier,
        loans::LoanIdentifier,
        settings::{FINE_PER_DAY, HOLD_EXPIRY_DAYS, MAX_RENEWALS},
        Repository,
    },
    services::policy::PolicyService,
};

/// Checkout command: the copy is addressed by internal id or barcode
#[derive(Debug, Clone)]
pub struct CheckoutCommand {
    pub patron_id: i32,
    pub copy_id: Option<i32>,
    pub barcode: Option<String>,
}

/// Result of a return, with the fine surfaced to the caller
#[derive(Debug, Clone)]
pub struct ReturnOutcome {
    pub loan: Loan,
    pub fine_charged: Option<Decimal>,
    pub promoted_hold: Option<Hold>,
    /// When the promoted hold must be picked up by (ready_since plus the
    /// configured pickup window)
    pub pickup_deadline: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    policy: PolicyService,
    defaults: CirculationConfig,
}

impl CirculationService {
    pub fn new(repository: Repository, policy: PolicyService, defaults: CirculationConfig) -> Self {
        Self {
            repository,
            policy,
            defaults,
        }
    }

    /// Borrow a copy for a patron
    pub async fn checkout(&self, command: CheckoutCommand, actor: &ActorClaims) -> AppResult<Loan> {
        actor.require_self_or_staff(command.patron_id)?;

        let identifier = match (command.copy_id, command.barcode) {
            (Some(id), _) => CopyIdentifier::Id(id),
            (None, Some(barcode)) => CopyIdentifier::Barcode(barcode),
            (None, None) => {
                return Err(AppError::InvalidInput(
                    "copy_id or barcode required".to_string(),
                ))
            }
        };

        let now = Utc::now();
        let mut tx = self.repository.begin().await?;

        // Patron row lock held until commit serializes the limit check.
        let policy = self
            .policy
            .resolve_locked(&mut tx, command.patron_id, now)
            .await?;

        if policy.is_suspended {
            return Err(AppError::Forbidden(format!(
                "Patron {} is suspended",
                command.patron_id
            )));
        }
        if policy.is_membership_expired {
            return Err(AppError::Forbidden(format!(
                "Membership of patron {} has expired",
                command.patron_id
            )));
        }

        let copy = self.repository.copies.lock(&mut tx, &identifier).await?;

        if !copy.loanable {
            return Err(AppError::Forbidden(format!("Copy {} is not loanable", copy.id)));
        }
        if copy.status != CopyStatus::Available {
            return Err(AppError::Conflict(format!(
                "Copy {} is {}",
                copy.id, copy.status
            )));
        }

        if let Some(hold) = self
            .repository
            .holds
            .find_blocking(&mut tx, copy.work_id, copy.id, command.patron_id)
            .await?
        {
            return Err(AppError::Forbidden(format!(
                "Copy {} is held for another patron (hold {})",
                copy.id, hold.id
            )));
        }

        let open_loans = self
            .repository
            .loans
            .count_open_for_patron(&mut tx, command.patron_id)
            .await?;
        if open_loans >= policy.max_concurrent_loans as i64 {
            return Err(AppError::Forbidden(format!(
                "Maximum loans reached ({}/{})",
                open_loans, policy.max_concurrent_loans
            )));
        }

        let due_date = now + Duration::days(policy.loan_period_days as i64);

        let loan = self
            .repository
            .loans
            .insert(&mut tx, command.patron_id, copy.id, now, due_date)
            .await?;

        self.repository
            .copies
            .mark_on_loan(&mut tx, copy.id, due_date)
            .await?;

        let fulfilled = self
            .repository
            .holds
            .fulfil_for_patron(&mut tx, copy.work_id, copy.id, command.patron_id)
            .await?;

        tx.commit().await?;

        tracing::info!(
            loan_id = loan.id,
            patron_id = command.patron_id,
            copy_id = copy.id,
            holds_fulfilled = fulfilled,
            "checkout completed"
        );

        Ok(loan)
    }

    /// Return a copy, identified by loan id or copy id
    pub async fn return_copy(
        &self,
        identifier: LoanIdentifier,
        actor: &ActorClaims,
    ) -> AppResult<ReturnOutcome> {
        let now = Utc::now();
        let mut tx = self.repository.begin().await?;

        let loan = self.repository.loans.lock_open(&mut tx, identifier).await?;
        actor.require_self_or_staff(loan.patron_id)?;

        let loan = self.repository.loans.close(&mut tx, loan.id, now).await?;

        let copy = self
            .repository
            .copies
            .lock(&mut tx, &CopyIdentifier::Id(loan.copy_id))
            .await?;
        self.repository
            .copies
            .mark_returned(&mut tx, copy.id, now)
            .await?;

        let fine_per_day = self
            .repository
            .settings
            .get_decimal(FINE_PER_DAY, self.defaults.fine_per_day)
            .await?;
        let fine_charged = overdue_fine(loan.due_date, now, fine_per_day);
        if let Some(amount) = fine_charged {
            self.repository
                .ledger
                .insert_charge(
                    &mut tx,
                    loan.patron_id,
                    Some(copy.id),
                    Some(loan.id),
                    LedgerEntryKind::OverdueFine,
                    amount,
                    now,
                )
                .await?;
        }

        // Exactly one hold moves to ready-for-pickup per returned copy.
        let promoted_hold = match self
            .repository
            .holds
            .lock_next_pending(&mut tx, copy.work_id)
            .await?
        {
            Some(next) => Some(self.repository.holds.promote(&mut tx, next.id, now).await?),
            None => None,
        };

        let pickup_deadline = match &promoted_hold {
            Some(_) => {
                let window = self
                    .repository
                    .settings
                    .get_i16(HOLD_EXPIRY_DAYS, self.defaults.hold_expiry_days)
                    .await?;
                Some(now + Duration::days(window as i64))
            }
            None => None,
        };

        tx.commit().await?;

        tracing::info!(
            loan_id = loan.id,
            copy_id = copy.id,
            fine = %fine_charged.unwrap_or_default(),
            promoted_hold = promoted_hold.as_ref().map(|h| h.id),
            "return completed"
        );

        Ok(ReturnOutcome {
            loan,
            fine_charged,
            promoted_hold,
            pickup_deadline,
        })
    }

    /// Renew an open loan, extending from its existing due date
    pub async fn renew(&self, loan_id: i32, actor: &ActorClaims) -> AppResult<Loan> {
        let now = Utc::now();
        let mut tx = self.repository.begin().await?;

        let loan = self.repository.loans.lock_by_id(&mut tx, loan_id).await?;
        actor.require_self_or_staff(loan.patron_id)?;

        if !loan.is_open() {
            return Err(AppError::InvalidState(
                "Cannot renew a closed loan".to_string(),
            ));
        }

        let max_renewals = self
            .repository
            .settings
            .get_i16(MAX_RENEWALS, self.defaults.max_renewals)
            .await?;
        if loan.renewal_count >= max_renewals {
            return Err(AppError::Forbidden(format!(
                "Maximum renewals reached ({}/{})",
                loan.renewal_count, max_renewals
            )));
        }

        let copy = self
            .repository
            .copies
            .lock(&mut tx, &CopyIdentifier::Id(loan.copy_id))
            .await?;

        // Renewal yields to queued demand from other patrons.
        if let Some(hold) = self
            .repository
            .holds
            .find_blocking(&mut tx, copy.work_id, copy.id, loan.patron_id)
            .await?
        {
            return Err(AppError::Forbidden(format!(
                "Copy {} is held for another patron (hold {})",
                copy.id, hold.id
            )));
        }

        let record = self
            .repository
            .patrons
            .get_with_category(loan.patron_id)
            .await?;
        let new_due_date = renewal_due_date(loan.due_date, record.loan_period_days);

        let loan = self
            .repository
            .loans
            .apply_renewal(&mut tx, loan.id, new_due_date, now)
            .await?;
        self.repository
            .copies
            .apply_renewal(&mut tx, copy.id, new_due_date)
            .await?;

        tx.commit().await?;

        tracing::info!(
            loan_id = loan.id,
            renewal_count = loan.renewal_count,
            "renewal completed"
        );

        Ok(loan)
    }

    /// Get a patron's open loans
    pub async fn get_patron_loans(
        &self,
        patron_id: i32,
        actor: &ActorClaims,
    ) -> AppResult<Vec<Loan>> {
        actor.require_self_or_staff(patron_id)?;
        self.repository.patrons.get_with_category(patron_id).await?;
        self.repository.loans.get_open_for_patron(patron_id).await
    }
}

/// Days late, counting any started day as a full one
fn days_late(due_date: DateTime<Utc>, returned_date: DateTime<Utc>) -> i64 {
    let late_ms = (returned_date - due_date).num_milliseconds();
    if late_ms <= 0 {
        return 0;
    }
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    (late_ms + DAY_MS - 1) / DAY_MS
}

/// Overdue fine for a returned loan, None when nothing is owed
pub fn overdue_fine(
    due_date: DateTime<Utc>,
    returned_date: DateTime<Utc>,
    fine_per_day: Decimal,
) -> Option<Decimal> {
    let days = days_late(due_date, returned_date);
    if days == 0 {
        return None;
    }
    let amount = (Decimal::from(days) * fine_per_day).round_dp(2);
    if amount > Decimal::ZERO {
        Some(amount)
    } else {
        None
    }
}

/// Renewal extends from the existing due date, not from "now", so repeated
/// renewals compound correctly even when requested late
pub fn renewal_due_date(current_due: DateTime<Utc>, loan_period_days: i16) -> DateTime<Utc> {
    current_due + Duration::days(loan_period_days as i64)
}

//! Fine ledger service

use chrono::Utc;
use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::{
        actor::ActorClaims,
        enums::LedgerEntryStatus,
        ledger::LedgerEntry,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LedgerService {
    repository: Repository,
}

impl LedgerService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Apply a payment against exactly one charge entry.
    ///
    /// Overpayment is rejected rather than clamped so the ledger stays exact;
    /// the payment itself is recorded as its own ledger line.
    pub async fn record_payment(
        &self,
        entry_id: i32,
        amount: Decimal,
        actor: &ActorClaims,
    ) -> AppResult<LedgerEntry> {
        actor.require_staff()?;

        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "Payment amount must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let mut tx = self.repository.begin().await?;

        let entry = self.repository.ledger.lock_by_id(&mut tx, entry_id).await?;

        if !entry.kind.is_charge() {
            return Err(AppError::InvalidState(format!(
                "Ledger entry {} is not a charge",
                entry.id
            )));
        }
        if entry.status == LedgerEntryStatus::Waived {
            return Err(AppError::InvalidState(format!(
                "Ledger entry {} has been waived",
                entry.id
            )));
        }
        if amount > entry.outstanding {
            return Err(AppError::InvalidInput(format!(
                "Payment of {} exceeds outstanding balance of {}",
                amount, entry.outstanding
            )));
        }

        let outstanding = entry.outstanding - amount;
        let status = if outstanding.is_zero() {
            LedgerEntryStatus::Paid
        } else {
            LedgerEntryStatus::Partial
        };

        let entry = self
            .repository
            .ledger
            .settle(&mut tx, entry.id, outstanding, status, actor.patron_id)
            .await?;

        self.repository
            .ledger
            .insert_payment(
                &mut tx,
                entry.patron_id,
                entry.copy_id,
                entry.loan_id,
                amount,
                actor.patron_id,
                now,
            )
            .await?;

        tx.commit().await?;

        tracing::info!(entry_id = entry.id, %amount, "payment recorded");

        Ok(entry)
    }

    /// Waive the remaining balance of a charge entry
    pub async fn waive(&self, entry_id: i32, actor: &ActorClaims) -> AppResult<LedgerEntry> {
        actor.require_staff()?;

        let mut tx = self.repository.begin().await?;

        let entry = self.repository.ledger.lock_by_id(&mut tx, entry_id).await?;

        if !entry.kind.is_charge() {
            return Err(AppError::InvalidState(format!(
                "Ledger entry {} is not a charge",
                entry.id
            )));
        }
        if matches!(entry.status, LedgerEntryStatus::Paid | LedgerEntryStatus::Waived) {
            return Err(AppError::InvalidState(format!(
                "Ledger entry {} is already settled",
                entry.id
            )));
        }

        let entry = self
            .repository
            .ledger
            .settle(
                &mut tx,
                entry.id,
                Decimal::ZERO,
                LedgerEntryStatus::Waived,
                actor.patron_id,
            )
            .await?;

        tx.commit().await?;

        tracing::info!(entry_id = entry.id, "charge waived");

        Ok(entry)
    }

    /// List a patron's ledger. Staff sees anyone; a patron only themselves.
    pub async fn list_for_patron(
        &self,
        patron_id: i32,
        actor: &ActorClaims,
    ) -> AppResult<Vec<LedgerEntry>> {
        actor.require_self_or_staff(patron_id)?;
        self.repository.ledger.list_for_patron(patron_id).await
    }
}

//! Policy resolver service

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};

use crate::{
    error::AppResult,
    models::patron::BorrowingPolicy,
    repository::Repository,
};

/// Resolves a patron's borrowing policy from patron + category records.
/// Pure read; the locked variant is what the engines use inside their
/// transactions.
#[derive(Clone)]
pub struct PolicyService {
    repository: Repository,
}

impl PolicyService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Resolve a patron's policy without locking
    pub async fn resolve(&self, patron_id: i32) -> AppResult<BorrowingPolicy> {
        let record = self.repository.patrons.get_with_category(patron_id).await?;
        Ok(BorrowingPolicy::from_record(&record, Utc::now()))
    }

    /// Resolve a patron's policy inside an engine transaction, locking the
    /// patron row until that transaction commits
    pub async fn resolve_locked(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        patron_id: i32,
        now: DateTime<Utc>,
    ) -> AppResult<BorrowingPolicy> {
        let record = self.repository.patrons.lock_with_category(tx, patron_id).await?;
        Ok(BorrowingPolicy::from_record(&record, now))
    }
}

//! Repository layer for database operations
//!
//! Every engine runs as one atomic unit of work: mutating repository methods
//! take the caller's transaction, and the contended rows (patron for the loan
//! limit, work for hold priority, copy/loan/entry for transitions) are locked
//! with `FOR UPDATE` for the duration of that transaction.

pub mod copies;
pub mod holds;
pub mod ledger;
pub mod loans;
pub mod patrons;
pub mod settings;

use sqlx::{Pool, Postgres, Transaction};

use crate::error::AppResult;

/// Main repository struct holding the database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub patrons: patrons::PatronsRepository,
    pub copies: copies::CopiesRepository,
    pub loans: loans::LoansRepository,
    pub holds: holds::HoldsRepository,
    pub ledger: ledger::LedgerRepository,
    pub settings: settings::SettingsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            patrons: patrons::PatronsRepository::new(pool.clone()),
            copies: copies::CopiesRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            holds: holds::HoldsRepository::new(pool.clone()),
            ledger: ledger::LedgerRepository::new(pool.clone()),
            settings: settings::SettingsRepository::new(pool.clone()),
            pool,
        }
    }

    /// Begin the unit-of-work transaction for one engine operation
    pub async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }
}

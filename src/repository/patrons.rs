//! Patrons repository for database operations

use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::patron::PatronRecord,
};

const PATRON_WITH_CATEGORY: &str = r#"
    SELECT p.id, p.category_id, p.membership_expiry, p.suspended_until,
           p.suspension_reason, c.max_loans, c.loan_period_days
    FROM patrons p
    JOIN categories c ON p.category_id = c.id
    WHERE p.id = $1
"#;

#[derive(Clone)]
pub struct PatronsRepository {
    pool: Pool<Postgres>,
}

impl PatronsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a patron joined with its category policy
    pub async fn get_with_category(&self, id: i32) -> AppResult<PatronRecord> {
        sqlx::query_as::<_, PatronRecord>(PATRON_WITH_CATEGORY)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Patron with id {} not found", id)))
    }

    /// Get a patron joined with its category, locking the patron row.
    ///
    /// The lock is held until the caller's transaction commits and is the
    /// serialization point for the open-loan count: two concurrent checkouts
    /// for the same patron queue here instead of both seeing a free slot.
    pub async fn lock_with_category(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
    ) -> AppResult<PatronRecord> {
        sqlx::query_as::<_, PatronRecord>(&format!("{} FOR UPDATE OF p", PATRON_WITH_CATEGORY))
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Patron with id {} not found", id)))
    }

    /// Check that a patron exists without locking
    pub async fn exists(&self, tx: &mut Transaction<'_, Postgres>, id: i32) -> AppResult<()> {
        let found: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM patrons WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut **tx)
            .await?;

        if found {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Patron with id {} not found", id)))
        }
    }
}

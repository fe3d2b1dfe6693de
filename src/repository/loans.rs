//! Loans repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::loan::Loan,
};

/// Open-loan lookup key for returns: loan id or copy id (at most one open
/// loan can reference a copy)
#[derive(Debug, Clone, Copy)]
pub enum LoanIdentifier {
    LoanId(i32),
    CopyId(i32),
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a loan by id (open or closed)
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Lock a loan by id for the caller's transaction
    pub async fn lock_by_id(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
    ) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Find and lock the open loan matching a loan id or copy id
    pub async fn lock_open(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        identifier: LoanIdentifier,
    ) -> AppResult<Loan> {
        let loan = match identifier {
            LoanIdentifier::LoanId(id) => {
                sqlx::query_as::<_, Loan>(
                    "SELECT * FROM loans WHERE id = $1 AND returned_date IS NULL FOR UPDATE",
                )
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?
            }
            LoanIdentifier::CopyId(id) => {
                sqlx::query_as::<_, Loan>(
                    "SELECT * FROM loans WHERE copy_id = $1 AND returned_date IS NULL FOR UPDATE",
                )
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?
            }
        };

        loan.ok_or_else(|| AppError::NotFound("Active loan not found".to_string()))
    }

    /// Count a patron's open loans.
    ///
    /// Callers must hold the patron row lock so the count stays valid until
    /// the new loan commits.
    pub async fn count_open_for_patron(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        patron_id: i32,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE patron_id = $1 AND returned_date IS NULL",
        )
        .bind(patron_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(count)
    }

    /// Create a new open loan
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        patron_id: i32,
        copy_id: i32,
        start_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (patron_id, copy_id, start_date, due_date, renewal_count)
            VALUES ($1, $2, $3, $4, 0)
            RETURNING *
            "#,
        )
        .bind(patron_id)
        .bind(copy_id)
        .bind(start_date)
        .bind(due_date)
        .fetch_one(&mut **tx)
        .await?;

        Ok(loan)
    }

    /// Close an open loan. The guard on `returned_date` keeps a closed loan
    /// immutable even under a double return.
    pub async fn close(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        loan_id: i32,
        returned_date: DateTime<Utc>,
    ) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET returned_date = $1
            WHERE id = $2 AND returned_date IS NULL
            RETURNING *
            "#,
        )
        .bind(returned_date)
        .bind(loan_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Active loan not found".to_string()))
    }

    /// Advance the due date and renewal bookkeeping on an open loan
    pub async fn apply_renewal(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        loan_id: i32,
        new_due_date: DateTime<Utc>,
        renewed_at: DateTime<Utc>,
    ) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET due_date = $1, last_renewed_date = $2, renewal_count = renewal_count + 1
            WHERE id = $3 AND returned_date IS NULL
            RETURNING *
            "#,
        )
        .bind(new_due_date)
        .bind(renewed_at)
        .bind(loan_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::InvalidState("Cannot renew a closed loan".to_string()))
    }

    /// Get a patron's open loans, oldest first
    pub async fn get_open_for_patron(&self, patron_id: i32) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE patron_id = $1 AND returned_date IS NULL
            ORDER BY start_date
            "#,
        )
        .bind(patron_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }
}

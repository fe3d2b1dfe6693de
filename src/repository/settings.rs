//! Circulation settings store
//!
//! Key/value lookups with per-key defaults: a missing row (or a value that
//! does not parse) means "use the default", never an error.

use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};
use std::str::FromStr;

use crate::error::AppResult;

pub const FINE_PER_DAY: &str = "fine_per_day";
pub const MAX_RENEWALS: &str = "max_renewals";
pub const HOLD_EXPIRY_DAYS: &str = "hold_expiry_days";

#[derive(Clone)]
pub struct SettingsRepository {
    pool: Pool<Postgres>,
}

impl SettingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM circulation_settings WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    /// Get a decimal setting, falling back to the given default
    pub async fn get_decimal(&self, key: &str, default: Decimal) -> AppResult<Decimal> {
        Ok(self
            .get_raw(key)
            .await?
            .and_then(|v| Decimal::from_str(v.trim()).ok())
            .unwrap_or(default))
    }

    /// Get an integer setting, falling back to the given default
    pub async fn get_i16(&self, key: &str, default: i16) -> AppResult<i16> {
        Ok(self
            .get_raw(key)
            .await?
            .and_then(|v| v.trim().parse::<i16>().ok())
            .unwrap_or(default))
    }
}

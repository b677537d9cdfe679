//! # Quota Store
//!
//! Per-user token balances persisted in SQLite. Each generation request
//! consumes one token; the administrator can set or adjust balances.
//!
//! Every mutation is a single statement in autocommit mode, so it is durable
//! once the call returns and the check-then-decrement in
//! [`QuotaStore::try_consume`] cannot interleave with another consume for the
//! same user.

use sqlx::sqlite::SqlitePool;
use tracing::{debug, info, warn};

use crate::errors::QuotaError;

/// SQLite-backed token balances
#[derive(Clone, Debug)]
pub struct QuotaStore {
    pool: SqlitePool,
    default_tokens: i64,
}

impl QuotaStore {
    /// Create a store over an initialized pool
    ///
    /// `default_tokens` is the balance given to a user on first contact.
    pub fn new(pool: SqlitePool, default_tokens: i64) -> Self {
        Self {
            pool,
            default_tokens: default_tokens.max(0),
        }
    }

    pub fn default_tokens(&self) -> i64 {
        self.default_tokens
    }

    async fn ensure_user(&self, user_id: i64) -> Result<(), QuotaError> {
        let result = sqlx::query(
            "INSERT INTO user_balances (telegram_user_id, tokens) VALUES (?1, ?2)
             ON CONFLICT(telegram_user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(self.default_tokens)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            info!(user_id, tokens = self.default_tokens, "Created token balance for new user");
        }
        Ok(())
    }

    /// Current balance, initialized to the default for an unseen user
    pub async fn get_balance(&self, user_id: i64) -> Result<i64, QuotaError> {
        self.ensure_user(user_id).await?;

        let tokens: i64 =
            sqlx::query_scalar("SELECT tokens FROM user_balances WHERE telegram_user_id = ?1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(tokens)
    }

    /// Consume `amount` tokens if the balance allows it
    ///
    /// Returns the remaining balance. When the balance is lower than
    /// `amount` nothing is changed and [`QuotaError::Insufficient`] is returned.
    pub async fn try_consume(&self, user_id: i64, amount: i64) -> Result<i64, QuotaError> {
        if amount <= 0 {
            return Err(QuotaError::InvalidAmount(amount));
        }
        self.ensure_user(user_id).await?;

        let remaining: Option<i64> = sqlx::query_scalar(
            "UPDATE user_balances
             SET tokens = tokens - ?1, updated_at = CURRENT_TIMESTAMP
             WHERE telegram_user_id = ?2 AND tokens >= ?1
             RETURNING tokens",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match remaining {
            Some(tokens) => {
                debug!(user_id, amount, remaining = tokens, "Tokens consumed");
                Ok(tokens)
            }
            None => {
                let balance = self.get_balance(user_id).await?;
                debug!(user_id, amount, balance, "Token consumption rejected");
                Err(QuotaError::Insufficient { balance })
            }
        }
    }

    /// Overwrite the balance
    pub async fn set_balance(&self, user_id: i64, value: i64) -> Result<i64, QuotaError> {
        if value < 0 {
            return Err(QuotaError::InvalidAmount(value));
        }

        sqlx::query(
            "INSERT INTO user_balances (telegram_user_id, tokens) VALUES (?1, ?2)
             ON CONFLICT(telegram_user_id)
             DO UPDATE SET tokens = excluded.tokens, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(user_id)
        .bind(value)
        .execute(&self.pool)
        .await?;

        info!(user_id, tokens = value, "Token balance set");
        Ok(value)
    }

    /// Add a positive amount and return the new balance
    ///
    /// A sum that would not fit in `i64` is rejected with
    /// [`QuotaError::InvalidAmount`] and the balance is left unchanged.
    pub async fn add_tokens(&self, user_id: i64, amount: i64) -> Result<i64, QuotaError> {
        if amount <= 0 {
            return Err(QuotaError::InvalidAmount(amount));
        }
        self.ensure_user(user_id).await?;

        // SQLite turns an overflowing integer sum into REAL
        let tokens: Option<i64> = sqlx::query_scalar(
            "UPDATE user_balances
             SET tokens = tokens + ?1, updated_at = CURRENT_TIMESTAMP
             WHERE telegram_user_id = ?2 AND tokens <= ?3 - ?1
             RETURNING tokens",
        )
        .bind(amount)
        .bind(user_id)
        .bind(i64::MAX)
        .fetch_optional(&self.pool)
        .await?;

        let Some(tokens) = tokens else {
            warn!(user_id, amount, "Token addition would overflow the balance");
            return Err(QuotaError::InvalidAmount(amount));
        };

        info!(user_id, amount, tokens, "Tokens added");
        Ok(tokens)
    }

    /// Remove up to `amount` tokens, flooring the balance at zero
    pub async fn remove_tokens(&self, user_id: i64, amount: i64) -> Result<i64, QuotaError> {
        if amount <= 0 {
            return Err(QuotaError::InvalidAmount(amount));
        }
        self.ensure_user(user_id).await?;

        let tokens: i64 = sqlx::query_scalar(
            "UPDATE user_balances
             SET tokens = MAX(tokens - ?1, 0), updated_at = CURRENT_TIMESTAMP
             WHERE telegram_user_id = ?2
             RETURNING tokens",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        info!(user_id, amount, tokens, "Tokens removed");
        Ok(tokens)
    }
}

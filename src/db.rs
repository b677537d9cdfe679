//! Database connection and schema management

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use tracing::info;

/// Open the SQLite pool, creating the database file when it does not exist
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    info!(database_url = %database_url, "Opening database");

    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid database URL: {database_url}"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    Ok(pool)
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &SqlitePool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS user_balances (
            telegram_user_id INTEGER PRIMARY KEY,
            tokens INTEGER NOT NULL CHECK (tokens >= 0),
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create user_balances table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS user_languages (
            telegram_user_id INTEGER PRIMARY KEY,
            language TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create user_languages table")?;

    info!("Database schema initialized successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_connect_creates_database_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("bot.sqlite3");
        let pool = connect(&format!("sqlite://{}", path.display())).await?;
        init_database_schema(&pool).await?;

        assert!(path.exists());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_balances")
            .fetch_one(&pool)
            .await?;
        assert_eq!(count, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_schema_init_is_idempotent() -> Result<()> {
        let dir = TempDir::new()?;
        let pool = connect(&format!("sqlite://{}", dir.path().join("a.db").display())).await?;
        init_database_schema(&pool).await?;
        init_database_schema(&pool).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_negative_tokens_rejected_by_schema() -> Result<()> {
        let dir = TempDir::new()?;
        let pool = connect(&format!("sqlite://{}", dir.path().join("c.db").display())).await?;
        init_database_schema(&pool).await?;

        let result = sqlx::query("INSERT INTO user_balances (telegram_user_id, tokens) VALUES (1, -1)")
            .execute(&pool)
            .await;
        assert!(result.is_err());
        Ok(())
    }
}

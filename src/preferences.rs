//! Per-user settings chosen in the bot, currently the message language

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePool;
use tracing::info;

#[derive(Clone, Debug)]
pub struct PreferenceStore {
    pool: SqlitePool,
}

impl PreferenceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Language picked with `/language`, if any
    pub async fn language(&self, user_id: i64) -> Result<Option<String>> {
        let language: Option<String> =
            sqlx::query_scalar("SELECT language FROM user_languages WHERE telegram_user_id = ?1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to read user language")?;
        Ok(language)
    }

    pub async fn set_language(&self, user_id: i64, language: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_languages (telegram_user_id, language) VALUES (?1, ?2)
             ON CONFLICT(telegram_user_id)
             DO UPDATE SET language = excluded.language, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(user_id)
        .bind(language)
        .execute(&self.pool)
        .await
        .context("Failed to store user language")?;

        info!(user_id, language, "User language changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect, init_database_schema};
    use tempfile::TempDir;

    async fn setup_store() -> Result<(PreferenceStore, TempDir)> {
        let dir = TempDir::new()?;
        let pool = connect(&format!("sqlite://{}", dir.path().join("prefs.db").display())).await?;
        init_database_schema(&pool).await?;
        Ok((PreferenceStore::new(pool), dir))
    }

    #[tokio::test]
    async fn test_language_is_unset_by_default() -> Result<()> {
        let (store, _dir) = setup_store().await?;
        assert_eq!(store.language(1).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_language_choice_is_overwritten() -> Result<()> {
        let (store, _dir) = setup_store().await?;

        store.set_language(1, "ru").await?;
        assert_eq!(store.language(1).await?.as_deref(), Some("ru"));

        store.set_language(1, "en").await?;
        assert_eq!(store.language(1).await?.as_deref(), Some("en"));
        assert_eq!(store.language(2).await?, None);
        Ok(())
    }
}

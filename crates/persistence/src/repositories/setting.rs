//! Setting repository for the key/value settings table.

use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::entities::SettingEntity;
use crate::error::StoreError;

/// Repository for setting-related database operations.
#[derive(Clone)]
pub struct SettingRepository {
    pool: SqlitePool,
}

impl SettingRepository {
    /// Creates a new SettingRepository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns a setting value, or `None` if the key is unset.
    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Upserts a setting value.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value,
                                            updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns all settings as a map.
    pub async fn get_all(&self) -> Result<HashMap<String, String>, StoreError> {
        let rows = sqlx::query_as::<_, SettingEntity>(
            "SELECT key, value, updated_at FROM settings",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|row| (row.key, row.value)).collect())
    }
}

use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::SqlitePool;

use common::{Error, Result};
use strategy::StrategyConfig;

/// Persists `StrategyConfig` as a flat record keyed by field name.
///
/// Each value is stored JSON-encoded so numbers and booleans come back with
/// their original type.
#[derive(Clone)]
pub struct ConfigStore {
    pool: SqlitePool,
}

impl ConfigStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// `Ok(None)` when nothing has been saved yet. A stored record that no
    /// longer parses or validates is an error.
    pub async fn load(&self) -> Result<Option<StrategyConfig>> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM strategy_config")
            .fetch_all(&self.pool)
            .await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let mut fields = Map::new();
        for (key, raw) in rows {
            let value: Value = serde_json::from_str(&raw)
                .map_err(|e| Error::Config(format!("stored value for '{key}' is not JSON: {e}")))?;
            fields.insert(key, value);
        }

        let config: StrategyConfig = serde_json::from_value(Value::Object(fields))
            .map_err(|e| Error::Config(format!("stored strategy config is malformed: {e}")))?;
        config.validate()?;
        Ok(Some(config))
    }

    /// Replace every stored field in one transaction.
    pub async fn save(&self, config: &StrategyConfig) -> Result<()> {
        let Value::Object(fields) = serde_json::to_value(config)? else {
            return Err(Error::Config("strategy config did not serialize to an object".into()));
        };
        let updated_at = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;
        for (key, value) in fields {
            sqlx::query(
                r#"
                INSERT INTO strategy_config (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
            )
            .bind(key)
            .bind(value.to_string())
            .bind(&updated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

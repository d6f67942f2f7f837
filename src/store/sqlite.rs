use crate::core::{ExchangeRecord, RateError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Connection, SqlitePool};
use std::path::Path;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

use super::QuoteStore;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS exchange(
    id INTEGER PRIMARY KEY,
    created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    value NUMERIC(8,4) NOT NULL
)
"#;

/// SQLite-backed quote store. Cloning shares the underlying pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database file and ensures the
    /// `exchange` table exists.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        let store = Self { pool };
        store.create_table().await?;
        debug!("Opened exchange database at {}", path.display());
        Ok(store)
    }

    async fn create_table(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .context("Failed to create exchange table")?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, RateError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM exchange")
            .fetch_one(&self.pool)
            .await
            .map_err(RateError::persist)?;
        Ok(count)
    }

    /// Most recently inserted row, if any.
    pub async fn latest(&self) -> Result<Option<ExchangeRecord>, RateError> {
        sqlx::query_as::<_, ExchangeRecord>(
            "SELECT id, created_at, CAST(value AS REAL) AS value FROM exchange ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(RateError::persist)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl QuoteStore for SqliteStore {
    async fn save(&self, value: f64, deadline: Duration) -> Result<i64, RateError> {
        let expires = Instant::now() + deadline;

        let mut conn = timeout_at(expires, self.pool.acquire())
            .await
            .map_err(|_| RateError::persist_deadline(deadline))?
            .map_err(RateError::persist)?;
        // BEGIN is not abandoned, so a pooled connection never carries a half-open transaction.
        let mut tx = Connection::begin(&mut *conn)
            .await
            .map_err(RateError::persist)?;

        let inserted = timeout_at(
            expires,
            sqlx::query("INSERT INTO exchange(value) VALUES (?)")
                .bind(value)
                .execute(&mut *tx),
        )
        .await;
        let id = match inserted {
            Ok(result) => result.map_err(RateError::persist)?.last_insert_rowid(),
            Err(_) => {
                // Uncommitted; the ROLLBACK queued on drop runs behind the abandoned insert.
                drop(tx);
                debug!(value, "Insert missed its deadline, rolled back");
                return Err(RateError::persist_deadline(deadline));
            }
        };

        // Past this point the row may already be durable, so the commit is never abandoned.
        tx.commit().await.map_err(RateError::persist)?;
        debug!(id, value, "Stored exchange rate");
        Ok(id)
    }
}

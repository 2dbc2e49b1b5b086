//! SQLite-backed key-value store for the local cart state.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use tokio::sync::Mutex;

use super::{KeyValueStore, StoreError};

const DB_FILE_NAME: &str = "cart.db";

/// Durable key-value store in a single SQLite file.
///
/// The connection pool is opened lazily on first use, so constructing the
/// store never touches the filesystem. Cloning is cheap and clones share the
/// pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    location: Location,
    pool: Arc<Mutex<Option<SqlitePool>>>,
}

#[derive(Debug, Clone)]
enum Location {
    /// `{app_data_dir}/bookstore/cart.db`
    Default,
    Dir(PathBuf),
    File(PathBuf),
}

impl SqliteStore {
    /// Store in the OS application data directory.
    pub fn new() -> Self {
        Self::with_location(Location::Default)
    }

    /// Store as `cart.db` inside `dir` (created if missing).
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::with_location(Location::Dir(dir.into()))
    }

    /// Store in exactly this database file.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self::with_location(Location::File(path.into()))
    }

    fn with_location(location: Location) -> Self {
        Self {
            location,
            pool: Arc::new(Mutex::new(None)),
        }
    }

    /// Open the pool and create the table if needed (called lazily).
    async fn pool(&self) -> anyhow::Result<SqlitePool> {
        let mut pool_guard = self.pool.lock().await;
        if let Some(pool) = pool_guard.as_ref() {
            return Ok(pool.clone());
        }

        let db_path = self.db_path()?;
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create store directory at {parent:?}"))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .with_context(|| format!("failed to open SQLite store at {db_path:?}"))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create kv_store table")?;

        tracing::debug!(path = %db_path.display(), "opened local cart store");
        *pool_guard = Some(pool.clone());
        Ok(pool)
    }

    fn db_path(&self) -> anyhow::Result<PathBuf> {
        match &self.location {
            Location::Default => default_db_path(),
            Location::Dir(dir) => Ok(dir.join(DB_FILE_NAME)),
            Location::File(path) => Ok(path.clone()),
        }
    }

    async fn get_inner(&self, key: &str) -> anyhow::Result<Option<String>> {
        let pool = self.pool().await?;
        let row = sqlx::query(
            r#"
            SELECT value
            FROM kv_store
            WHERE key = ?1
            "#,
        )
        .bind(key)
        .fetch_optional(&pool)
        .await
        .with_context(|| format!("failed to read key {key}"))?;

        row.map(|row| row.try_get::<String, _>("value"))
            .transpose()
            .context("failed to decode stored value")
    }

    async fn set_inner(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let pool = self.pool().await?;
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key)
            DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .with_context(|| format!("failed to write key {key}"))?;
        Ok(())
    }

    async fn remove_inner(&self, key: &str) -> anyhow::Result<()> {
        let pool = self.pool().await?;
        sqlx::query(
            r#"
            DELETE FROM kv_store
            WHERE key = ?1
            "#,
        )
        .bind(key)
        .execute(&pool)
        .await
        .with_context(|| format!("failed to remove key {key}"))?;
        Ok(())
    }
}

impl Default for SqliteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.get_inner(key).await.map_err(backend_error)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set_inner(key, value).await.map_err(backend_error)
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.remove_inner(key).await.map_err(backend_error)
    }
}

fn backend_error(err: anyhow::Error) -> StoreError {
    tracing::error!("local cart store failure: {err:?}");
    StoreError::Backend(format!("{err:#}"))
}

/// Resolve `{app_data_dir}/bookstore/cart.db`.
fn default_db_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    Ok(base.join("bookstore").join(DB_FILE_NAME))
}

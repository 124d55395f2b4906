//! SQLite cache store, on disk or in memory.

use super::{CacheStore, EntryMetadata};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use serde_json::Value;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use time::UtcDateTime;
use tracing::instrument;

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// Requests are short; a handful of connections is plenty.
const MAX_CONNECTIONS: u32 = 5;

fn mtime_to_row(mtime: UtcDateTime) -> Result<i64> {
    i64::try_from(mtime.unix_timestamp_nanos()).or_raise(|| ErrorKind::InvalidData("mtime"))
}

fn mtime_from_row(nanos: i64) -> Result<UtcDateTime> {
    UtcDateTime::from_unix_timestamp_nanos(i128::from(nanos)).or_raise(|| ErrorKind::InvalidData("mtime"))
}

/// Cache store backed by a SQLite database.
///
/// Per-key reads and writes are atomic, so several engines (or processes)
/// may share one database file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    async fn new(options: SqliteConnectOptions, max: Option<u32>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Query-based PRAGMAs must be applied to every pooled
            // connection, not just the first one.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max.unwrap_or(MAX_CONNECTIONS))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Open (creating if missing) the cache database at the given path.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = Self::base_options().filename(path.as_ref()).create_if_missing(true);
        Self::new(options, None).await
    }

    /// Connect to an in-memory database.
    ///
    /// Not limited to `#[cfg(test)]` so other crates can use it in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        // Every connection to ":memory:" is its own database, so the pool has
        // to stay at one connection.
        Self::new(options, Some(1)).await
    }

    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_millis(1500))
    }

    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA cache_size = -4096;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    #[instrument("performing cache migrations", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the connection pool. The store must not be used afterwards.
    pub async fn close(&self) {
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn has_item(&self, key: &str) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(include_str!("../../queries/has_entry.sql"))
            .bind(key)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(exists)
    }

    async fn get_item(&self, key: &str) -> Result<Option<Value>> {
        let row: Option<(String,)> = sqlx::query_as(include_str!("../../queries/get_entry.sql"))
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(|(payload,)| serde_json::from_str(&payload).or_raise(|| ErrorKind::InvalidData("payload")))
            .transpose()
    }

    #[instrument(level = "trace", skip(self, value))]
    async fn set_item(&self, key: &str, value: &Value) -> Result<()> {
        let payload = serde_json::to_string(value).or_raise(|| ErrorKind::InvalidData("payload"))?;
        sqlx::query(include_str!("../../queries/upsert_entry.sql"))
            .bind(key)
            .bind(payload)
            .bind(mtime_to_row(UtcDateTime::now())?)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn remove_items(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        for key in keys {
            sqlx::query(include_str!("../../queries/delete_entry.sql"))
                .bind(key)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<EntryMetadata>> {
        let row: Option<(i64,)> = sqlx::query_as(include_str!("../../queries/get_metadata.sql"))
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(|(nanos,)| Ok(EntryMetadata { mtime: mtime_from_row(nanos)? })).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_connect_in_memory() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        assert!(!store.pool().is_closed());
        store.close().await;
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        store.migrate().await.unwrap();
        store.close().await;
    }

    #[tokio::test]
    async fn test_set_get_and_overwrite() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        assert!(!store.has_item("k").await.unwrap());
        assert_eq!(store.get_item("k").await.unwrap(), None);

        store.set_item("k", &json!({"raw": "one"})).await.unwrap();
        assert!(store.has_item("k").await.unwrap());
        assert_eq!(store.get_item("k").await.unwrap(), Some(json!({"raw": "one"})));
        let first = store.get_metadata("k").await.unwrap().unwrap().mtime;

        store.set_item("k", &json!({"raw": "two"})).await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap(), Some(json!({"raw": "two"})));
        assert!(store.get_metadata("k").await.unwrap().unwrap().mtime >= first);
    }

    #[tokio::test]
    async fn test_metadata_mtime_is_write_time() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let before = UtcDateTime::now();
        store.set_item("k", &json!(null)).await.unwrap();
        let after = UtcDateTime::now();
        let mtime = store.get_metadata("k").await.unwrap().unwrap().mtime;
        assert!(before <= mtime && mtime <= after);
        assert_eq!(store.get_metadata("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_items() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        store.set_item("a", &json!(1)).await.unwrap();
        store.set_item("b", &json!(2)).await.unwrap();
        store.remove_items(&["a".to_string(), "missing".to_string()]).await.unwrap();
        assert!(!store.has_item("a").await.unwrap());
        assert!(store.has_item("b").await.unwrap());
        store.remove_items(&[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_on_disk_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.sqlite");
        let store = SqliteStore::connect(&path).await.unwrap();
        store.set_item("k", &json!("cached")).await.unwrap();
        store.close().await;

        let store = SqliteStore::connect(&path).await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap(), Some(json!("cached")));
        store.close().await;
    }
}

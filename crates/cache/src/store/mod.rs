mod memory;
mod sqlite;

pub use self::memory::MemoryStore;
pub use self::sqlite::SqliteStore;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use time::UtcDateTime;

/// Shared handle to a cache store. Stores outlive the engines using them.
pub type StoreHandle = Arc<dyn CacheStore>;

/// Bookkeeping the store keeps alongside each entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    /// When the entry was last written. Set by the store, not the caller.
    pub mtime: UtcDateTime,
}

/// Key/value store for processed documents.
///
/// Keys are opaque strings (folio uses a hex digest of the logical key).
/// Values are JSON. Every write stamps the entry with the current time, which
/// is what cache validity is checked against.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Name of the store, for logging.
    fn name(&self) -> &str;

    async fn has_item(&self, key: &str) -> Result<bool>;

    async fn get_item(&self, key: &str) -> Result<Option<Value>>;

    /// Insert or replace an entry, stamping it with the current time.
    async fn set_item(&self, key: &str, value: &Value) -> Result<()>;

    /// Remove every listed entry. Keys without an entry are ignored.
    async fn remove_items(&self, keys: &[String]) -> Result<()>;

    async fn get_metadata(&self, key: &str) -> Result<Option<EntryMetadata>>;
}

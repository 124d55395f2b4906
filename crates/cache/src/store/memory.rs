//! In-process cache store.

use super::{CacheStore, EntryMetadata};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use time::UtcDateTime;
use tokio::sync::RwLock;

/// Cache store held entirely in memory.
///
/// Nothing survives the process. Useful for tests, and for a single long
/// running process where an on-disk cache is not wanted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, (EntryMetadata, Value)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Overwrite the write time of an existing entry. Returns `false` if
    /// there is no such entry.
    pub async fn touch(&self, key: &str, mtime: UtcDateTime) -> bool {
        match self.entries.write().await.get_mut(key) {
            Some((metadata, _)) => {
                metadata.mtime = mtime;
                true
            },
            None => false,
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn has_item(&self, key: &str) -> Result<bool> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn get_item(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).map(|(_, value)| value.clone()))
    }

    async fn set_item(&self, key: &str, value: &Value) -> Result<()> {
        let metadata = EntryMetadata { mtime: UtcDateTime::now() };
        self.entries.write().await.insert(key.to_string(), (metadata, value.clone()));
        Ok(())
    }

    async fn remove_items(&self, keys: &[String]) -> Result<()> {
        let mut guard = self.entries.write().await;
        for key in keys {
            guard.remove(key);
        }
        Ok(())
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<EntryMetadata>> {
        Ok(self.entries.read().await.get(key).map(|(metadata, _)| *metadata))
    }
}

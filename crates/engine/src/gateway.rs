//! Modification-time validated cache around document processing.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use folio_cache::StoreHandle;
use folio_codec::Document;
use folio_storage::BackendHandle;
use std::future::Future;
use std::path::Path;
use tracing::instrument;

/// How a [`Gateway::fetch`] was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    /// Straight from the cache store; nothing was processed.
    Cached,
    /// Processed from the content file (and stored, if there is a store).
    Computed,
}

/// Serves processed documents from a cache store while they are fresh.
///
/// An entry is fresh while the content file's modification time is strictly
/// earlier than the time the entry was written. Entries never expire by age.
#[derive(Clone)]
pub struct Gateway {
    backend: BackendHandle,
    store: Option<StoreHandle>,
}

impl Gateway {
    pub fn new(backend: BackendHandle, store: Option<StoreHandle>) -> Self {
        Self { backend, store }
    }

    pub fn store(&self) -> Option<&StoreHandle> {
        self.store.as_ref()
    }

    /// Return the cached document for `hash` if still fresh against the file
    /// at `path`, otherwise run `compute` and store its result.
    #[instrument(skip(self, compute), fields(path = %path.display()))]
    pub async fn fetch<F, Fut>(&self, hash: &str, path: &Path, compute: F) -> Result<(Document, Served)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Document>>,
    {
        let Some(store) = &self.store else {
            return Ok((compute().await?, Served::Computed));
        };
        let modified = self.backend.stat(path).await.or_raise(|| ErrorKind::Storage)?.modified;
        if let Some(metadata) = store.get_metadata(hash).await.or_raise(|| ErrorKind::Cache)?
            && modified < metadata.mtime
            && let Some(payload) = store.get_item(hash).await.or_raise(|| ErrorKind::Cache)?
        {
            match serde_json::from_value::<Document>(payload) {
                Ok(document) => {
                    tracing::debug!("cache hit");
                    return Ok((document, Served::Cached));
                },
                Err(error) => tracing::warn!(%error, "cached payload is unreadable; recomputing"),
            }
        } else {
            tracing::debug!("cache miss");
        }
        let document = compute().await?;
        let payload = serde_json::to_value(&document).or_raise(|| ErrorKind::Cache)?;
        store.set_item(hash, &payload).await.or_raise(|| ErrorKind::Cache)?;
        Ok((document, Served::Computed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_cache::{CacheStore, MemoryStore};
    use folio_codec::Meta;
    use folio_storage::backend::MockBackend;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::{Duration, UtcDateTime};

    const HASH: &str = "about-hash";

    fn document(raw: &str) -> Document {
        Document {
            keypath: "about".to_string(),
            filepath: PathBuf::from("/mock/about.md"),
            raw: raw.to_string(),
            content: Some(raw.to_string()),
            meta: Meta::new(),
            depth: 0,
        }
    }

    struct Fixture {
        mock: Arc<MockBackend>,
        store: Arc<MemoryStore>,
        gateway: Gateway,
        computed: AtomicUsize,
    }

    impl Fixture {
        fn new() -> Self {
            let mock = Arc::new(MockBackend::with_files([("about.md", "About")]));
            let store = Arc::new(MemoryStore::new());
            let gateway = Gateway::new(mock.clone(), Some(store.clone() as StoreHandle));
            Self { mock, store, gateway, computed: AtomicUsize::new(0) }
        }

        async fn fetch(&self, raw: &str) -> (Document, Served) {
            self.gateway
                .fetch(HASH, Path::new("about.md"), || async {
                    self.computed.fetch_add(1, Ordering::SeqCst);
                    Ok(document(raw))
                })
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_second_fetch_is_cached() {
        let fixture = Fixture::new();
        let (first, served) = fixture.fetch("v1").await;
        assert_eq!(served, Served::Computed);
        let (second, served) = fixture.fetch("v2").await;
        assert_eq!(served, Served::Cached);
        assert_eq!(first, second);
        assert_eq!(fixture.computed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_modified_file_is_recomputed_and_overwritten() {
        let fixture = Fixture::new();
        fixture.fetch("v1").await;
        let later = UtcDateTime::now() + Duration::hours(1);
        fixture.mock.touch("about.md", later).await.unwrap();

        let (document, served) = fixture.fetch("v2").await;
        assert_eq!(served, Served::Computed);
        assert_eq!(document.raw, "v2");
        let stored: Document = serde_json::from_value(fixture.store.get_item(HASH).await.unwrap().unwrap()).unwrap();
        assert_eq!(stored.raw, "v2");
        assert_eq!(fixture.computed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_equal_mtime_is_stale() {
        let fixture = Fixture::new();
        fixture.fetch("v1").await;
        let written = fixture.store.get_metadata(HASH).await.unwrap().unwrap().mtime;
        fixture.mock.touch("about.md", written).await.unwrap();
        let (_, served) = fixture.fetch("v2").await;
        assert_eq!(served, Served::Computed);
    }

    #[tokio::test]
    async fn test_unreadable_payload_is_recomputed() {
        let fixture = Fixture::new();
        fixture.store.set_item(HASH, &serde_json::json!({"not": "a document"})).await.unwrap();
        fixture.mock.touch("about.md", UtcDateTime::now() - Duration::hours(1)).await.unwrap();
        let (document, served) = fixture.fetch("fresh").await;
        assert_eq!(served, Served::Computed);
        assert_eq!(document.raw, "fresh");
        let (_, served) = fixture.fetch("ignored").await;
        assert_eq!(served, Served::Cached);
    }

    #[tokio::test]
    async fn test_without_store_always_computes() {
        let mock: BackendHandle = Arc::new(MockBackend::with_files([("about.md", "About")]));
        let gateway = Gateway::new(mock, None);
        for _ in 0..2 {
            let (_, served) = gateway.fetch(HASH, Path::new("about.md"), || async { Ok(document("x")) }).await.unwrap();
            assert_eq!(served, Served::Computed);
        }
    }

    #[tokio::test]
    async fn test_compute_failure_does_not_write() {
        let fixture = Fixture::new();
        let err = fixture
            .gateway
            .fetch(HASH, Path::new("about.md"), || async { Err(exn::Exn::from(ErrorKind::Codec)) })
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::Codec));
        assert!(!fixture.store.has_item(HASH).await.unwrap());
    }
}

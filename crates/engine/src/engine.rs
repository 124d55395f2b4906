use crate::collection::{self, Builder, Summary, Transform};
use crate::error::{ErrorKind, Result};
use crate::gateway::Gateway;
use crate::pager::{slice, step};
use crate::resolve::{Resolution, Resolved, Resolver};
use exn::ResultExt;
use folio_cache::{SqliteStore, StoreHandle};
use folio_codec::{Codec, Document, Mode, ParseHeader, Render};
use folio_config::{Config, Direction};
use folio_storage::BackendHandle;
use folio_storage::backend::{ContentBackend, DEFAULT_EXTENSION, DEFAULT_RESERVED, LocalBackend};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::instrument;

enum Source {
    Directory(PathBuf),
    Backend(BackendHandle),
}

/// Configures and builds an [`Engine`].
pub struct EngineBuilder {
    source: Source,
    extension: String,
    reserved: String,
    delimiter: Option<String>,
    codec: Codec,
    sort: Option<(String, Direction)>,
    transform: Option<Transform>,
    store: Option<StoreHandle>,
}

impl EngineBuilder {
    fn new(source: Source) -> Self {
        Self {
            source,
            extension: DEFAULT_EXTENSION.to_string(),
            reserved: DEFAULT_RESERVED.to_string(),
            delimiter: None,
            codec: Codec::default(),
            sort: None,
            transform: None,
            store: None,
        }
    }

    /// Serve content from an existing backend instead of a local directory.
    pub fn from_backend(backend: BackendHandle) -> Self {
        Self::new(Source::Backend(backend))
    }

    /// Content file suffix, including the leading dot. Defaults to `.md`.
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Base name kept out of collections. Defaults to `404`.
    pub fn reserved(mut self, reserved: impl Into<String>) -> Self {
        self.reserved = reserved.into();
        self
    }

    /// Front matter delimiter regex; checked when the engine is built.
    pub fn delimiter(mut self, pattern: impl Into<String>) -> Self {
        self.delimiter = Some(pattern.into());
        self
    }

    pub fn renderer(mut self, renderer: impl Render + 'static) -> Self {
        self.codec = self.codec.with_renderer(renderer);
        self
    }

    pub fn parser(mut self, parser: impl ParseHeader + 'static) -> Self {
        self.codec = self.codec.with_parser(parser);
        self
    }

    /// Order collections by a front matter key.
    pub fn sort_by(mut self, key: impl Into<String>, direction: Direction) -> Self {
        self.sort = Some((key.into(), direction));
        self
    }

    /// Rewrite collections after they are built and sorted.
    pub fn transform(mut self, transform: impl Fn(Vec<Summary>) -> Vec<Summary> + Send + Sync + 'static) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Cache processed documents in `store`. Without one, every retrieval
    /// processes the content file.
    pub fn store(mut self, store: StoreHandle) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the engine. Fails with [`ErrorKind::Directory`] if the content
    /// directory is missing, not a directory, or not writable.
    pub fn build(self) -> Result<Engine> {
        let inner: BackendHandle = match self.source {
            Source::Directory(directory) => {
                let local = LocalBackend::new("content", &directory).or_raise(|| ErrorKind::Directory(directory.clone()))?;
                Arc::new(local)
            },
            Source::Backend(backend) => backend,
        };
        let backend: BackendHandle =
            Arc::new(ContentBackend::new(inner).with_extension(&self.extension).with_reserved(self.reserved));
        let codec = match &self.delimiter {
            Some(pattern) => self.codec.with_delimiter(pattern).or_raise(|| ErrorKind::Config)?,
            None => self.codec,
        };
        tracing::debug!(root = %backend.root().display(), cached = self.store.is_some(), "engine ready");
        Ok(Engine {
            resolver: Resolver::new(backend.clone(), &self.extension),
            gateway: Gateway::new(backend.clone(), self.store),
            backend,
            codec,
            extension: self.extension,
            sort: self.sort,
            transform: self.transform,
            collection: None,
            cursor: None,
            current: None,
            pending: Vec::new(),
        })
    }
}

/// A request-scoped view of a content root.
///
/// The engine remembers the last key it resolved, and keeps the collection
/// it builds for its whole lifetime. Cache entries for keys found to have no
/// content file are removed when the engine is [closed](Engine::close).
pub struct Engine {
    backend: BackendHandle,
    resolver: Resolver,
    gateway: Gateway,
    codec: Codec,
    extension: String,
    sort: Option<(String, Direction)>,
    transform: Option<Transform>,
    collection: Option<Vec<Summary>>,
    /// Position of the last resolved document in `collection`.
    cursor: Option<usize>,
    current: Option<Resolved>,
    /// Cache keys to remove on close.
    pending: Vec<String>,
}

impl Engine {
    /// Start building an engine serving the content under `directory`.
    pub fn builder(directory: impl Into<PathBuf>) -> EngineBuilder {
        EngineBuilder::new(Source::Directory(directory.into()))
    }

    /// Build an engine from loaded configuration, connecting the SQLite
    /// cache store if caching is enabled.
    #[instrument(skip(config), fields(directory = %config.directory.display()))]
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate().or_raise(|| ErrorKind::Config)?;
        let local = LocalBackend::new("content", &config.directory)
            .or_raise(|| ErrorKind::Directory(config.directory.clone()))?;
        let mut builder = EngineBuilder::from_backend(Arc::new(local))
            .extension(&config.extension)
            .reserved(&config.reserved)
            .delimiter(&config.delimiter);
        if let Some(key) = &config.sort.key {
            builder = builder.sort_by(key, config.sort.direction);
        }
        if config.cache.enabled {
            let path = config.cache.path();
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Cache)?;
            }
            let store = SqliteStore::connect(&path).await.or_raise(|| ErrorKind::Cache)?;
            builder = builder.store(Arc::new(store));
        }
        builder.build()
    }

    /// Resolve `keypath`, remembering it as the current key if found. The
    /// cursor follows if the collection has already been built.
    async fn locate(&mut self, keypath: &str) -> Result<Option<Resolved>> {
        match self.resolver.resolve(keypath).await? {
            Resolution::Found(resolved) => {
                if let Some(entries) = &self.collection {
                    self.cursor = collection::locate(entries, &resolved.keypath);
                }
                self.current = Some(resolved.clone());
                Ok(Some(resolved))
            },
            Resolution::NotFound { hash } => {
                self.queue_removal(hash).await?;
                Ok(None)
            },
        }
    }

    async fn queue_removal(&mut self, hash: String) -> Result<()> {
        let Some(store) = self.gateway.store() else {
            return Ok(());
        };
        if !self.pending.contains(&hash) && store.has_item(&hash).await.or_raise(|| ErrorKind::Cache)? {
            tracing::debug!(%hash, "queueing stale cache entry for removal");
            self.pending.push(hash);
        }
        Ok(())
    }

    /// Whether `keypath` has a content file behind it.
    pub async fn exists(&mut self, keypath: &str) -> Result<bool> {
        Ok(self.locate(keypath).await?.is_some())
    }

    /// Retrieve the document for `keypath`, from the cache while it is fresh.
    ///
    /// Never builds the collection.
    #[instrument(skip(self))]
    pub async fn get(&mut self, keypath: &str) -> Result<Option<Document>> {
        let Some(resolved) = self.locate(keypath).await? else {
            return Ok(None);
        };
        let backend = &self.backend;
        let codec = &self.codec;
        let (document, served) = self
            .gateway
            .fetch(&resolved.hash, &resolved.path, || async {
                let contents = backend.read(&resolved.path).await.or_raise(|| ErrorKind::Storage)?;
                codec
                    .decode(&contents, &resolved.keypath, &resolved.filepath, Mode::Full)
                    .or_raise(|| ErrorKind::Codec)
            })
            .await?;
        tracing::debug!(?served, keypath = %resolved.keypath, "document retrieved");
        Ok(Some(document))
    }

    /// Retrieve the document for the last key resolved, if any.
    pub async fn current(&mut self) -> Result<Option<Document>> {
        let Some(keypath) = self.current.as_ref().map(|current| current.keypath.clone()) else {
            return Ok(None);
        };
        self.get(&keypath).await
    }

    /// Normalized key of the last document resolved.
    pub fn current_key(&self) -> Option<&str> {
        self.current.as_ref().map(|current| current.keypath.as_str())
    }

    /// Every document under the content root, built on first use.
    pub async fn collection(&mut self) -> Result<&[Summary]> {
        if self.collection.is_none() {
            self.rebuild().await?;
        }
        Ok(self.collection.as_deref().unwrap_or_default())
    }

    /// Rebuild the collection from the content root and relocate the cursor.
    pub async fn rebuild(&mut self) -> Result<&[Summary]> {
        let builder = Builder {
            backend: &self.backend,
            codec: &self.codec,
            extension: &self.extension,
            sort: self.sort.as_ref().map(|(key, direction)| (key.as_str(), *direction)),
            transform: self.transform.as_ref(),
        };
        let entries = builder.build().await?;
        self.cursor = self.current.as_ref().and_then(|current| collection::locate(&entries, &current.keypath));
        Ok(self.collection.insert(entries).as_slice())
    }

    /// Position of the current document in the collection, if it is there.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Up to `count` collection entries starting at `offset`. Offsets outside
    /// the collection yield nothing.
    pub async fn limit(&mut self, count: usize, offset: isize) -> Result<&[Summary]> {
        let entries = self.collection().await?;
        Ok(slice(entries, offset, count))
    }

    /// The entry after the current document: empty at the end of the
    /// collection, [`ErrorKind::CursorUnset`] with no current document.
    pub async fn next(&mut self) -> Result<&[Summary]> {
        let Some(cursor) = self.cursor else {
            exn::bail!(ErrorKind::CursorUnset);
        };
        self.limit(1, step(cursor, 1)).await
    }

    /// The entry before the current document: empty at the start of the
    /// collection, [`ErrorKind::CursorUnset`] with no current document.
    pub async fn prev(&mut self) -> Result<&[Summary]> {
        let Some(cursor) = self.cursor else {
            exn::bail!(ErrorKind::CursorUnset);
        };
        self.limit(1, step(cursor, -1)).await
    }

    /// Cache keys queued for removal on close.
    pub fn pending_removals(&self) -> &[String] {
        &self.pending
    }

    /// Tear the engine down, removing queued stale cache entries. A failed
    /// removal is logged and returned; the engine is gone either way.
    #[instrument(skip(self))]
    pub async fn close(mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        let Some(store) = self.gateway.store() else {
            return Ok(());
        };
        if pending.is_empty() {
            return Ok(());
        }
        if let Err(error) = store.remove_items(&pending).await {
            tracing::error!(?error, count = pending.len(), store = store.name(), "failed to remove stale cache entries");
            return Err(error).or_raise(|| ErrorKind::Cache);
        }
        tracing::debug!(count = pending.len(), "removed stale cache entries");
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            tracing::warn!(count = self.pending.len(), "engine dropped without close(); stale cache entries were not removed");
        }
    }
}

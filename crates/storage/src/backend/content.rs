//! Content-filtered storage backend decorator.
//!
//! Wraps another backend and restricts it to content files: files carrying the
//! configured suffix (`.md` by default). Listing additionally skips the
//! reserved error document (`404.md`, `404.html.md`, ...), which is only ever
//! served explicitly and must not show up in collections.

use crate::backend::FileInfoStream;
use crate::error::ErrorKind;
use crate::{BackendHandle, StorageBackend, error::Result, file::FileInfo};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;

pub const DEFAULT_EXTENSION: &str = ".md";
pub const DEFAULT_RESERVED: &str = "404";

/// Content-filtered storage backend.
///
/// Point lookups (`exists`, `read`, `stat`) reject paths without the content
/// suffix with [`FilteredPath`](ErrorKind::FilteredPath); directory checks
/// pass straight through since directories never carry the suffix.
#[derive(Clone)]
pub struct ContentBackend {
    inner: BackendHandle,
    extension: String,
    reserved: String,
}
impl ContentBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self {
            inner,
            extension: DEFAULT_EXTENSION.to_string(),
            reserved: DEFAULT_RESERVED.to_string(),
        }
    }

    /// File name suffix of content files, including the leading dot.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Base name (everything before the first dot) excluded from listings.
    pub fn with_reserved(mut self, reserved: impl Into<String>) -> Self {
        self.reserved = reserved.into();
        self
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Check if a path names a content file:
    /// - `about.md` -> true
    /// - `blog/index.md` -> true
    /// - `notes.txt` -> false
    /// - `.md` -> false (a dotfile, not a document)
    pub fn is_content_path(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref()
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.len() > self.extension.len() && name.ends_with(self.extension.as_str()))
    }

    /// Check if a path names the reserved error document (`404.*`).
    pub fn is_reserved_path(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref()
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.split_once('.'))
            .is_some_and(|(base, _)| base == self.reserved)
    }

    fn check(&self, path: &Path) -> Result<()> {
        if !self.is_content_path(path) {
            exn::bail!(ErrorKind::FilteredPath(path.to_path_buf()));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for ContentBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn root(&self) -> &Path {
        self.inner.root()
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        Box::pin(self.inner.list_stream().filter(|item| {
            std::future::ready(match item {
                Ok(info) => self.is_content_path(&info.path) && !self.is_reserved_path(&info.path),
                Err(_) => true, // propagate errors
            })
        }))
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        self.check(path)?;
        self.inner.exists(path).await
    }

    async fn is_dir(&self, path: &Path) -> Result<bool> {
        self.inner.is_dir(path).await
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.check(path)?;
        self.inner.read(path).await
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        self.check(path)?;
        self.inner.stat(path).await
    }
}

//! Read-only access to a content root.
//!
//! [`StorageBackend`] is all the engine knows about where documents live.
//! Content is never written through a backend; authoring happens elsewhere.

mod content;
mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::content::{ContentBackend, DEFAULT_EXTENSION, DEFAULT_RESERVED};
pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use crate::file::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// A tree of files addressed by paths relative to its root.
///
/// Every implementation runs incoming paths through
/// [`validate_path`](crate::validate_path), so `..` and absolute paths are
/// refused before touching anything.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use folio_storage::{backend::StorageBackend, error::Result};
///
/// async fn body_length(backend: &dyn StorageBackend) -> Result<u64> {
///     let path = Path::new("blog/index.md");
///     if backend.exists(path).await? {
///         let data = backend.read(path).await?;
///         Ok(data.len() as u64)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend (used for logging only).
    fn name(&self) -> &str;

    /// Physical location of the content root. Documents report their
    /// `filepath` as this root joined with their relative path.
    fn root(&self) -> &Path;

    /// Every file under the root, collected from
    /// [`list_stream()`](Self::list_stream).
    async fn list(&self) -> Result<Vec<FileInfo>> {
        self.list_stream().try_collect().await
    }

    /// Walk every file under the root lazily.
    ///
    /// Order is whatever the backend finds them in; for [`LocalBackend`] that
    /// is directory order, so callers wanting stability must sort.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// # use folio_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut files = backend.list_stream();
    /// let mut total = 0;
    /// while let Some(file) = files.try_next().await? {
    ///     total += file.size;
    /// }
    /// tracing::debug!(total, "content size");
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream(&self) -> FileInfoStream<'_>;

    /// Check if a regular file exists at the path.
    ///
    /// Directories are not files: `exists("blog")` is `false` even when
    /// `blog/index.md` exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Check if a directory exists at the path.
    async fn is_dir(&self, path: &Path) -> Result<bool>;

    /// Whole file as raw bytes; decoding is the codec's job.
    ///
    /// Raises [`NotFound`](crate::error::ErrorKind::NotFound) for a missing file.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Size and modification time, leaving the contents on disk.
    ///
    /// Raises [`NotFound`](crate::error::ErrorKind::NotFound) for a missing file.
    async fn stat(&self, path: &Path) -> Result<FileInfo>;
}

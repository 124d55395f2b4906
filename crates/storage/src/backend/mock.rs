//! In-memory storage backend for testing.

use super::FileInfoStream;
use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::file::FileInfo;
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Files are stored in a `BTreeMap` behind a [`RwLock`], so listings come out
/// in path order and are stable between runs. Directories are implied by the
/// file paths. Every file carries its own modification time, which tests can
/// move around with [`touch`](Self::touch) to exercise cache invalidation.
///
/// # Examples
///
/// ```
/// use folio_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("blog/index.md", "---\ntitle: Blog\n---\n"),
/// ]);
/// assert!(backend.exists(Path::new("blog/index.md")).await?);
/// assert!(backend.is_dir(Path::new("blog")).await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    root: PathBuf,
    storage: RwLock<BTreeMap<PathBuf, (UtcDateTime, Vec<u8>)>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = BTreeMap::new();
        let now = UtcDateTime::now();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                // The panic here is DELIBERATE. MockBackend is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            root: PathBuf::from("/mock"),
            storage: RwLock::new(map),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add or replace a file, stamped with the current time.
    pub async fn insert(&self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) -> Result<()> {
        let path = validate_path(path)?;
        self.storage.write().await.insert(path, (UtcDateTime::now(), data.into()));
        Ok(())
    }

    /// Remove a file, as if it had been deleted from the content root.
    pub async fn remove(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = validate_path(path)?;
        self.storage.write().await.remove(&path).map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }

    /// Set the modification time of an existing file.
    pub async fn touch(&self, path: impl AsRef<Path>, modified: UtcDateTime) -> Result<()> {
        let path = validate_path(path)?;
        let mut guard = self.storage.write().await;
        let entry = guard.get_mut(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        entry.0 = modified;
        Ok(())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        Box::pin(stream! {
            // Snapshot under the read lock; it is not held across yields.
            let entries: Vec<FileInfo> = {
                let guard = self.storage.read().await;
                guard
                    .iter()
                    .map(|(path, (modified, data))| FileInfo::new(path.clone(), data.len() as u64, *modified))
                    .collect()
            };
            for info in entries {
                yield Ok(info);
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.storage.read().await.contains_key(&path))
    }

    async fn is_dir(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        let guard = self.storage.read().await;
        Ok(guard.keys().any(|file| file != &path && file.starts_with(&path)))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        let (_modified, data) =
            self.storage.read().await.get(&path).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))?;
        Ok(data)
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let path = validate_path(path)?;
        let guard = self.storage.read().await;
        let (modified, data) = guard.get(&path).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path.clone())))?;
        Ok(FileInfo::new(path.clone(), data.len() as u64, *modified))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[tokio::test]
    async fn test_with_files() {
        let backend = MockBackend::with_files([("index.md", "home"), ("blog/index.md", "blog")]);
        assert!(backend.exists(Path::new("index.md")).await.unwrap());
        assert!(backend.exists(Path::new("blog/index.md")).await.unwrap());
        assert!(!backend.exists(Path::new("blog")).await.unwrap());
        assert!(!backend.exists(Path::new("missing.md")).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_dir() {
        let backend = MockBackend::with_files([("blog/2024/post.md", "post"), ("blogroll.md", "links")]);
        assert!(backend.is_dir(Path::new("blog")).await.unwrap());
        assert!(backend.is_dir(Path::new("blog/2024")).await.unwrap());
        assert!(!backend.is_dir(Path::new("blog/2024/post.md")).await.unwrap());
        assert!(!backend.is_dir(Path::new("blogroll")).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let backend = MockBackend::default();
        let err = backend.read(Path::new("missing.md")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_touch_moves_modified_time() {
        let backend = MockBackend::with_files([("about.md", "about")]);
        let later = UtcDateTime::now() + Duration::hours(1);
        backend.touch("about.md", later).await.unwrap();
        assert_eq!(backend.stat(Path::new("about.md")).await.unwrap().modified, later);
        let err = backend.touch("missing.md", later).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_insert_and_remove() {
        let backend = MockBackend::default();
        backend.insert("about.md", "about").await.unwrap();
        assert_eq!(backend.read(Path::new("about.md")).await.unwrap(), b"about");
        backend.remove("about.md").await.unwrap();
        assert!(!backend.exists(Path::new("about.md")).await.unwrap());
        assert!(backend.remove("about.md").await.is_err());
    }

    #[tokio::test]
    async fn test_list_is_path_ordered() {
        let backend = MockBackend::with_files([("b.md", "b"), ("a.md", "a"), ("c/index.md", "c")]);
        let files = backend.list().await.unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.to_str().unwrap()).collect();
        assert_eq!(paths, vec!["a.md", "b.md", "c/index.md"]);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let backend = MockBackend::default();
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.insert("../escape.md", "bad").await.is_err());
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockBackend::with_files([("../escape", "bad")]);
    }
}

//! Local filesystem storage backend.
//!
//! Files are read from a configured content directory using `tokio::fs`.

use crate::backend::FileInfoStream;
use crate::error::ErrorKind;
use crate::{FileInfo, StorageBackend, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::{Metadata, canonicalize};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(FileInfo),
    Descend(PathBuf),
    Skip,
}

/// Local filesystem storage backend.
///
/// All paths are relative to the configured content root.
///
/// # Examples
///
/// ```no_run
/// use folio_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("content", "/srv/site/content")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LocalBackend {
    name: String,
    /// Canonical root directory for the content
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Errors
    ///
    /// The content root must already exist, be a directory and be writable.
    /// It is never created on demand: a missing root means a misconfigured
    /// site.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        // Non-async on purpose; it only happens once per engine and it's not
        // worth making the constructor async.
        let root = canonicalize(root).map_err(|e| Self::map_io_error(e, root))?;
        let metadata = std::fs::metadata(&root).map_err(|e| Self::map_io_error(e, &root))?;
        if !metadata.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        Self::check_writable(&root)?;
        let name = name.into();
        tracing::debug!(backend = %name, root = %root.display(), "opened content root");
        Ok(Self { name, root })
    }

    /// Mode bits ignore who is asking, so try an actual write: an anonymous
    /// temporary file, gone once dropped.
    fn check_writable(root: &Path) -> Result<()> {
        match tempfile::tempfile_in(root) {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.kind(), IoErrorKind::PermissionDenied | IoErrorKind::ReadOnlyFilesystem) => {
                exn::bail!(ErrorKind::PermissionDenied(root.to_path_buf()))
            },
            Err(e) => Err(Self::map_io_error(e, root).into()),
        }
    }

    /// Get the absolute path for a relative storage path.
    ///
    /// Validates the path and joins it with the root directory.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    /// Convert an absolute path back to a relative storage path.
    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        if !absolute.is_absolute() {
            exn::bail!(ErrorKind::BackendError(format!(
                "attempting to get relative path of non-absolute path `{:?}`",
                absolute
            )))
        }
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("path `{:?}` is not within root `{:?}`", absolute, self.root))
        })?;
        Ok(validate_path(relative)?)
    }

    /// Re-use same data collection from file metadata for both list and stat functions
    fn metadata(path: &Path, metadata: Metadata) -> Result<FileInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?;
        Ok(FileInfo::from_system_time(path, metadata.len(), modified))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Keeps the stream loop free of error plumbing: everything that can fail
    /// for a single entry happens here, and the loop only has to yield it.
    async fn process_entry(&self, entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &path))?;
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if metadata.is_file() {
            let relative = self.relative_path(&path)?;
            return Ok(WalkEntry::File(Self::metadata(&relative, metadata)?));
        }
        // Note: silently drop what is most likely a broken symlink.
        Ok(WalkEntry::Skip)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn list_stream(&self) -> FileInfoStream<'_> {
        let mut stack = vec![self.root.clone()];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    // A directory removed mid-walk is simply empty.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &current)));
                        continue 'dirs;
                    }
                };
                // Directories are visited after the files of their parent, in
                // the order the filesystem hands them out.
                let mut descend = Vec::new();
                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &current))); continue 'entries; },
                    };
                    match self.process_entry(entry).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => descend.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
                stack.extend(descend.into_iter().rev());
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        match fs::metadata(&abs_path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            // `about.md/child` fails with ENOTDIR; it is just as missing.
            Err(e) if matches!(e.kind(), std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory) => Ok(false),
            Err(e) => Err(Self::map_io_error(e, path).into()),
        }
    }

    async fn is_dir(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        match fs::metadata(&abs_path).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            // `about.md/child` fails with ENOTDIR; it is just as missing.
            Err(e) if matches!(e.kind(), std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory) => Ok(false),
            Err(e) => Err(Self::map_io_error(e, path).into()),
        }
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo> {
        let abs_path = self.absolute_path(path)?;
        let metadata = fs::metadata(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?;
        Self::metadata(path, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as sync_fs;

    fn setup(files: &[&str]) -> (tempfile::TempDir, LocalBackend) {
        let temp_dir = tempfile::tempdir().unwrap();
        for file in files {
            let path = temp_dir.path().join(file);
            sync_fs::create_dir_all(path.parent().unwrap()).unwrap();
            sync_fs::write(path, format!("contents of {file}")).unwrap();
        }
        let backend = LocalBackend::new("content", temp_dir.path()).unwrap();
        (temp_dir, backend)
    }

    #[test]
    fn test_new_requires_existing_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("content", temp_dir.path()).is_ok());
        let err = LocalBackend::new("content", temp_dir.path().join("missing")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_new_rejects_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("index.md");
        sync_fs::write(&file, b"---\n---\n").unwrap();
        let err = LocalBackend::new("content", &file).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_new_checks_actual_write_access() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        sync_fs::set_permissions(temp_dir.path(), sync_fs::Permissions::from_mode(0o555)).unwrap();
        // Root writes through 0o555; anyone else is refused.
        let writable = sync_fs::write(temp_dir.path().join("canary"), b"").is_ok();
        let result = LocalBackend::new("content", temp_dir.path());
        let leftovers: Vec<_> = sync_fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name != "canary")
            .collect();
        sync_fs::set_permissions(temp_dir.path(), sync_fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(result.is_ok(), writable);
        if let Err(err) = result {
            assert!(matches!(&*err, ErrorKind::PermissionDenied(_)));
        }
        // The write check leaves nothing behind in the content root.
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_absolute_path() {
        let (temp_dir, backend) = setup(&[]);
        let expected = sync_fs::canonicalize(temp_dir.path()).unwrap().join("blog/index.md");
        assert_eq!(backend.absolute_path(Path::new("blog/index.md")).unwrap(), expected);
        // Path traversal is prevented
        assert!(backend.absolute_path(Path::new("../etc/passwd")).is_err());
    }

    #[test]
    fn test_relative_path() {
        let (_temp_dir, backend) = setup(&[]);
        let abs = backend.root().join("blog/index.md");
        assert_eq!(backend.relative_path(&abs).unwrap(), Path::new("blog/index.md"));
        assert!(backend.relative_path(PathBuf::from("/other/file.md")).is_err());
    }

    #[tokio::test]
    async fn test_exists_only_for_files() {
        let (_temp_dir, backend) = setup(&["about.md", "blog/index.md"]);
        assert!(backend.exists(Path::new("about.md")).await.unwrap());
        assert!(backend.exists(Path::new("blog/index.md")).await.unwrap());
        assert!(!backend.exists(Path::new("blog")).await.unwrap());
        assert!(!backend.exists(Path::new("missing.md")).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_dir() {
        let (_temp_dir, backend) = setup(&["about.md", "blog/index.md"]);
        assert!(backend.is_dir(Path::new("blog")).await.unwrap());
        assert!(!backend.is_dir(Path::new("about.md")).await.unwrap());
        assert!(!backend.is_dir(Path::new("about")).await.unwrap());
        assert!(!backend.is_dir(Path::new("about.md/child")).await.unwrap());
        assert!(!backend.exists(Path::new("about.md/child.md")).await.unwrap());
    }

    #[tokio::test]
    async fn test_read() {
        let (_temp_dir, backend) = setup(&["about.md"]);
        let data = backend.read(Path::new("about.md")).await.unwrap();
        assert_eq!(data, b"contents of about.md");
        let err = backend.read(Path::new("missing.md")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stat() {
        let (_temp_dir, backend) = setup(&["about.md"]);
        let info = backend.stat(Path::new("about.md")).await.unwrap();
        assert_eq!(info.path, PathBuf::from("about.md"));
        assert_eq!(info.size, "contents of about.md".len() as u64);
    }

    #[tokio::test]
    async fn test_list_empty_directory() {
        let (_temp_dir, backend) = setup(&[]);
        assert_eq!(backend.list().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_list_returns_all_files() {
        let (_temp_dir, backend) = setup(&["index.md", "about.md", "blog/index.md", "blog/2024/post.md", "notes.txt"]);
        let files = backend.list().await.unwrap();
        assert_eq!(files.len(), 5);
    }

    #[tokio::test]
    async fn test_list_paths_are_relative_to_root() {
        let (_temp_dir, backend) = setup(&["about.md", "blog/index.md", "blog/2024/post.md"]);
        let mut paths: Vec<_> = backend.list().await.unwrap().into_iter().map(|f| f.path).collect();
        paths.sort();
        assert_eq!(
            paths,
            vec![PathBuf::from("about.md"), PathBuf::from("blog/2024/post.md"), PathBuf::from("blog/index.md")]
        );
    }

    #[tokio::test]
    async fn test_path_security() {
        let (_temp_dir, backend) = setup(&[]);
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.exists(Path::new("blog/../../passwd")).await.is_err());
        assert!(backend.stat(Path::new("../../file")).await.is_err());
    }
}

//! File metadata as reported by storage backends.

use std::path::PathBuf;
use std::time::SystemTime;
use time::UtcDateTime;

/// File metadata returned by storage backends.
///
/// The `modified` timestamp is what the cache gateway compares against a cache
/// entry's own timestamp, so backends must report the real modification time
/// and never the time of listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from the content root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: UtcDateTime,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: impl Into<UtcDateTime>) -> Self {
        Self {
            path: path.into(),
            size,
            modified: modified.into(),
        }
    }

    /// Build from a [`SystemTime`] as returned by [`std::fs::Metadata::modified`].
    pub fn from_system_time(path: impl Into<PathBuf>, size: u64, modified: SystemTime) -> Self {
        Self::new(path, size, UtcDateTime::from(modified))
    }

    /// Name of the file without any of its parent directories.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_from_system_time() {
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let info = FileInfo::from_system_time("blog/index.md", 12, at);
        assert_eq!(info.modified.unix_timestamp(), 1_700_000_000);
        assert_eq!(info.file_name(), Some("index.md"));
    }
}

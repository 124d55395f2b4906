//! Errors raised while reading a content root.
//!
//! Every failure is an [`exn::Exn`] wrapping an [`ErrorKind`], so callers in
//! the engine can attach their own context frames on top.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// Storage error carrying the location it was raised at.
pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong, grouped by how a caller reacts to it: a missing file turns
/// into a "not found" resolution, everything else bubbles up.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Nothing at this path
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Not readable, or a content root that is not writable
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Absolute, or climbs out of the content root with `..`
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// The backend itself is misconfigured
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
    /// Path rejected by the content extension filter
    #[display("filtered path: {}", _0.display())]
    FilteredPath(#[error(not(source))] PathBuf),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Transient failures: the same call could succeed a moment later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::BackendError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NotFound(PathBuf::from("about.md")).to_string(), "file not found: about.md");
        assert_eq!(ErrorKind::FilteredPath(PathBuf::from("notes.txt")).to_string(), "filtered path: notes.txt");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(!ErrorKind::NotFound(PathBuf::from("x")).is_retryable());
        assert!(!ErrorKind::InvalidPath(PathBuf::from("../x")).is_retryable());
        assert!(ErrorKind::Io(IoError::other("disk on fire")).is_retryable());
    }
}

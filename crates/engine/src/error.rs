//! Engine Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Failures from the storage, codec and
//! cache crates are raised into the matching kind here, keeping their error
//! tree as the source.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The content directory is missing, not a directory, or not writable.
    #[display("unusable content directory: {}", _0.display())]
    Directory(#[error(not(source))] PathBuf),
    #[display("could not access content storage")]
    Storage,
    /// A content file could not be decoded (bad front matter, bad encoding).
    #[display("could not decode content file")]
    Codec,
    #[display("cache store failure")]
    Cache,
    #[display("invalid engine configuration")]
    Config,
    /// `next()`/`prev()` was called before any document was located in the
    /// collection.
    #[display("no current document in the collection")]
    CursorUnset,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage | Self::Cache => true,
            Self::Directory(_) | Self::Codec | Self::Config | Self::CursorUnset => false,
        }
    }
}

//! Codec Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A codec error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The front matter block exists but could not be parsed. This is an
    /// authoring mistake in the content file and is never defaulted away.
    #[display("malformed front matter")]
    MalformedHeader,
    /// The front matter parsed, but not into a key/value mapping.
    #[display("front matter is not a mapping, found: {_0}")]
    NotAMapping(#[error(not(source))] &'static str),
    /// The content file is not valid UTF-8.
    #[display("content is not valid UTF-8")]
    InvalidEncoding,
    /// The configured delimiter pattern is not usable.
    #[display("invalid front matter delimiter: {_0}")]
    InvalidDelimiter(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Content either parses or it doesn't; the file has to be fixed.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::MalformedHeader.to_string(), "malformed front matter");
        assert_eq!(
            ErrorKind::NotAMapping("sequence").to_string(),
            "front matter is not a mapping, found: sequence"
        );
        assert!(!ErrorKind::InvalidEncoding.is_retryable());
    }
}

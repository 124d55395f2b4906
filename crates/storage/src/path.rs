//! Path validation for content keys.
//!
//! Keys arrive from URLs, so anything that ends up as a storage path has to be
//! checked before it is joined onto the content root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a storage path for security and correctness.
/// Ensures that paths don't escape the content root (no `..` traversal).
///
/// > **Note:** This does **not** normalize backslashes, non-UTF8 bytes, or
/// >           platform-specific weirdness. Null bytes are explicitly rejected.
///
/// # Returns
/// Returns the normalized path if valid, or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if invalid. The empty path is invalid; the root document is addressed by
/// its index file, never by an empty path.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use folio_storage::validate_path;
/// // Valid paths
/// assert!(validate_path("blog/first-post.md").is_ok());
/// assert!(validate_path("/about/").is_ok());
/// assert!(validate_path("blog/../about.md").is_ok()); // (never leaves content root)
/// // Invalid paths
/// assert!(validate_path("../secrets.md").is_err());
/// assert!(validate_path("blog/../../etc").is_err());
/// assert!(validate_path("a\0b").is_err());
/// // Paths get resolved
/// assert_eq!(
///     validate_path("/blog//./drafts/../post/").unwrap(),
///     Path::new("blog/post")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                components.push(s)
            },
            // Keys are URL paths, a leading slash is expected and meaningless.
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

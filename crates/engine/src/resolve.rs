//! Key resolution: logical content keys to content files.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use folio_storage::{BackendHandle, validate_path};
use std::path::PathBuf;
use tracing::instrument;

/// Base name of the file a directory (or the root) resolves to.
pub const INDEX: &str = "index";

/// Normalize a logical key: surrounding separators are meaningless, and the
/// empty key is the root.
pub fn normalize(keypath: &str) -> &str {
    keypath.trim_matches('/')
}

/// Cache key for a logical key.
///
/// ```
/// use folio_engine::resolve::hash;
///
/// assert_eq!(hash(""), hash("/"));
/// assert_eq!(hash("/blog/"), hash("blog"));
/// assert_ne!(hash("blog"), hash("about"));
/// ```
pub fn hash(keypath: &str) -> String {
    blake3::hash(normalize(keypath).as_bytes()).to_string()
}

/// A key that maps to an existing content file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Normalized logical key (empty for the root).
    pub keypath: String,
    /// Location of the file relative to the content root.
    pub path: PathBuf,
    /// Location of the file on the backend, content root included.
    pub filepath: PathBuf,
    /// Cache key, see [`hash`].
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(Resolved),
    NotFound { hash: String },
}

impl Resolution {
    pub fn hash(&self) -> &str {
        match self {
            Self::Found(resolved) => &resolved.hash,
            Self::NotFound { hash } => hash,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Maps keys to files: `key` is `key<ext>` or, if `key` is a directory,
/// `key/index<ext>`. The root key is `index<ext>`.
#[derive(Clone)]
pub struct Resolver {
    backend: BackendHandle,
    extension: String,
}

impl Resolver {
    pub fn new(backend: BackendHandle, extension: impl Into<String>) -> Self {
        Self { backend, extension: extension.into() }
    }

    /// Resolve a key. A key with no file behind it, or one that would leave
    /// the content root, is [`Resolution::NotFound`]; only storage failures
    /// are errors.
    #[instrument(skip(self), fields(backend = self.backend.name()))]
    pub async fn resolve(&self, keypath: &str) -> Result<Resolution> {
        let key = normalize(keypath);
        let hash = hash(key);
        let candidate = if key.is_empty() { INDEX } else { key };
        let Ok(candidate) = validate_path(candidate) else {
            tracing::debug!("key escapes the content root");
            return Ok(Resolution::NotFound { hash });
        };
        let path = if self.backend.is_dir(&candidate).await.or_raise(|| ErrorKind::Storage)? {
            candidate.join(format!("{INDEX}{}", self.extension))
        } else {
            let mut path = candidate.into_os_string();
            path.push(&self.extension);
            PathBuf::from(path)
        };
        if !self.backend.exists(&path).await.or_raise(|| ErrorKind::Storage)? {
            tracing::debug!(path = %path.display(), "no content file for key");
            return Ok(Resolution::NotFound { hash });
        }
        Ok(Resolution::Found(Resolved {
            keypath: key.to_string(),
            filepath: self.backend.root().join(&path),
            path,
            hash,
        }))
    }
}

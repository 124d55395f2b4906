//! Storage for a folio content root.
//!
//! Content lives on a [`StorageBackend`] as plain text files. Every path handed
//! to a backend is relative to the content root and validated with
//! [`validate_path`] so that logical keys coming from URLs can never escape it.
//!
//! [`ContentBackend`](crate::backend::ContentBackend) decorates another backend
//! and is the file enumerator used when building document collections: it only
//! lists files carrying the content extension, and skips the reserved error
//! document (`404.md` and friends).

pub mod backend;
pub mod error;
pub mod file;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::file::FileInfo;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;

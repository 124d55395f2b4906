//! Cache stores for processed documents.
//!
//! The cache is never the source of truth, the content files are. Deleting a
//! store only costs the time to process every document again.
//!
//! Two stores are provided:
//! - [`SqliteStore`]: a SQLite database, on disk or in memory, safe to share
//!   between engines and processes.
//! - [`MemoryStore`]: a map held in the current process.

pub mod error;
mod store;

pub use crate::store::{CacheStore, EntryMetadata, MemoryStore, SqliteStore, StoreHandle};

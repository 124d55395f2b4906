//! Flat-file content engine.
//!
//! Logical keys (URL-like paths) map to content files under a content root:
//! `about` is `about.md`, `blog` is `blog/index.md` and the empty key is
//! `index.md`. Resolved files are decoded into [`Document`]s through a cache
//! that stays valid until the file is modified. The whole content root can also
//! be listed as a collection, optionally sorted by a front matter key, and
//! paged through relative to the last document retrieved.
//!
//! ```no_run
//! use folio_engine::Engine;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut engine = Engine::builder("content").build()?;
//! if let Some(document) = engine.get("/blog").await? {
//!     println!("{}", document.content.unwrap_or_default());
//! }
//! let next = engine.next().await?.first().map(|entry| entry.path.clone());
//! engine.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod collection;
mod engine;
pub mod error;
pub mod gateway;
pub mod pager;
pub mod resolve;

pub use crate::collection::{Summary, Transform};
pub use crate::engine::{Engine, EngineBuilder};
pub use crate::gateway::Served;
pub use crate::resolve::Resolution;
pub use folio_config::{Config, Direction};
pub use folio_codec::Document;

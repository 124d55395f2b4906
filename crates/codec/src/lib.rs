//! Document codec for folio content files.
//!
//! A content file is a block of structured front matter followed by a markup
//! body. The [`Codec`] splits the two apart, parses the front matter through a
//! [`ParseHeader`] implementation into a [`Meta`] mapping, and renders the body
//! through a [`Render`] implementation.

mod codec;
mod consts;
pub mod error;
mod header;
pub mod models;
mod render;

pub use crate::codec::{Codec, Mode};
pub use crate::consts::DEFAULT_DELIMITER;
pub use crate::header::{ParseHeader, YamlParser};
pub use crate::models::{Document, Meta};
#[cfg(feature = "markdown")]
pub use crate::render::MarkdownRenderer;
pub use crate::render::{PassthroughRenderer, Render};

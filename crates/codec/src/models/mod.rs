mod document;

pub use self::document::{Document, Meta, ROOT_DEPTH, depth};

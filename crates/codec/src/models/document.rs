use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Structured metadata parsed from a document's front matter.
pub type Meta = BTreeMap<String, serde_json::Value>;

/// Depth of the root document (the empty keypath).
pub const ROOT_DEPTH: i32 = -1;

/// Nesting depth of a keypath: its segment count minus one.
///
/// Leading and trailing separators are ignored, so `/blog/` and `blog` are
/// the same key.
///
/// ```
/// use folio_codec::models::depth;
///
/// assert_eq!(depth(""), -1);
/// assert_eq!(depth("/about"), 0);
/// assert_eq!(depth("blog/post"), 1);
/// ```
pub fn depth(keypath: &str) -> i32 {
    let segments = keypath.split('/').filter(|segment| !segment.is_empty()).count();
    i32::try_from(segments).map_or(i32::MAX, |count| count + ROOT_DEPTH)
}

/// A fully processed content document.
///
/// Built fresh on every resolution and never mutated afterwards. Its
/// serialized form is what the cache stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Logical identifier. Empty for the root index.
    pub keypath: String,
    /// Physical location of the source file.
    pub filepath: PathBuf,
    /// Body with the front matter block removed.
    pub raw: String,
    /// Rendered body. Absent when only metadata was extracted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Front matter. Empty if the file has none.
    #[serde(default)]
    pub meta: Meta,
    pub depth: i32,
}

impl Document {
    /// Front matter value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.meta.get(key)
    }
}

//! Collections: every document under the content root, metadata only.

use crate::error::{ErrorKind, Result};
use crate::resolve::{INDEX, normalize};
use exn::ResultExt;
use folio_codec::models::depth;
use folio_codec::{Codec, Meta, Mode};
use folio_config::Direction;
use folio_storage::BackendHandle;
use futures::TryStreamExt;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::instrument;

/// Rewrites a freshly built collection (filtering, reordering, ...). Applied
/// once per build, after sorting.
pub type Transform = Box<dyn Fn(Vec<Summary>) -> Vec<Summary> + Send + Sync>;

/// One document of a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Logical path: `/` for the root, `/blog` for `blog/index.md`, `/about`
    /// for `about.md`.
    pub path: String,
    pub filepath: PathBuf,
    pub meta: Meta,
    pub depth: i32,
}

impl Summary {
    /// The logical key this entry resolves from.
    pub fn keypath(&self) -> &str {
        normalize(&self.path)
    }
}

/// Logical path of a content file, given its location relative to the
/// content root.
pub fn logical_path(relative: &Path, extension: &str) -> String {
    let relative = relative.to_string_lossy();
    let stem = relative.strip_suffix(extension).unwrap_or(&relative);
    let stem = match stem.rsplit_once('/') {
        Some((parent, INDEX)) => parent,
        None if stem == INDEX => "",
        _ => stem,
    };
    format!("/{}", normalize(stem))
}

/// Sort ordering key for front matter values: null, then booleans, numbers,
/// strings, and finally anything else (arrays, maps) by its JSON text.
#[derive(Debug, Clone)]
struct SortKey(Value);

impl SortKey {
    fn rank(&self) -> u8 {
        match self.0 {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank()).then_with(|| match (&self.0, &other.0) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => a.as_f64().unwrap_or(f64::NAN).total_cmp(&b.as_f64().unwrap_or(f64::NAN)),
            },
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Null, Value::Null) => Ordering::Equal,
            (a, b) => a.to_string().cmp(&b.to_string()),
        })
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

/// Order entries by the front matter value at `key`.
///
/// Entries are indexed by that value, so two entries sharing a value collide
/// and only the later one survives. Every collision is logged. Entries
/// without the key are indexed under `null`.
pub fn sort(entries: Vec<Summary>, key: &str, direction: Direction) -> Vec<Summary> {
    let mut index = BTreeMap::new();
    for entry in entries {
        let value = entry.meta.get(key).cloned().unwrap_or(Value::Null);
        if let Some(replaced) = index.insert(SortKey(value.clone()), entry) {
            tracing::warn!(
                key,
                %value,
                replaced = %replaced.path,
                "sort key collision; the earlier document is dropped from the collection"
            );
        }
    }
    match direction {
        Direction::Asc => index.into_values().collect(),
        Direction::Desc => index.into_values().rev().collect(),
    }
}

/// Everything needed to build a collection.
pub struct Builder<'a> {
    pub backend: &'a BackendHandle,
    pub codec: &'a Codec,
    pub extension: &'a str,
    pub sort: Option<(&'a str, Direction)>,
    pub transform: Option<&'a Transform>,
}

impl Builder<'_> {
    /// Enumerate the content root and build the collection. The backend is
    /// expected to list content files only.
    #[instrument(skip(self), fields(backend = self.backend.name()))]
    pub async fn build(&self) -> Result<Vec<Summary>> {
        let started = Instant::now();
        let files: Vec<_> = self.backend.list_stream().try_collect().await.or_raise(|| ErrorKind::Storage)?;
        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            let contents = self.backend.read(&file.path).await.or_raise(|| ErrorKind::Storage)?;
            let path = logical_path(&file.path, self.extension);
            let filepath = self.backend.root().join(&file.path);
            let document = self
                .codec
                .decode(&contents, normalize(&path), &filepath, Mode::MetadataOnly)
                .or_raise(|| ErrorKind::Codec)?;
            entries.push(Summary { depth: depth(&path), path, filepath, meta: document.meta });
        }
        if let Some((key, direction)) = self.sort {
            entries = sort(entries, key, direction);
        }
        if let Some(transform) = self.transform {
            entries = transform(entries);
        }
        tracing::info!(count = entries.len(), elapsed = ?started.elapsed(), "collection built");
        Ok(entries)
    }
}

/// Position of the entry `keypath` resolves to, if it is in the collection.
pub fn locate(entries: &[Summary], keypath: &str) -> Option<usize> {
    let keypath = normalize(keypath);
    entries.iter().position(|entry| entry.keypath() == keypath)
}

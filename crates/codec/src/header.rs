//! Front matter parsing.

use crate::error::{ErrorKind, Result};
use crate::models::Meta;
use exn::ResultExt;
use serde_yaml::Value;

/// Turns the text of a front matter block into a [`Meta`] mapping.
///
/// Empty (or whitespace-only) input is an empty mapping, not an error.
pub trait ParseHeader: Send + Sync {
    fn parse(&self, header: &str) -> Result<Meta>;
}

/// YAML front matter, the usual flavour for flat-file content.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlParser;

impl ParseHeader for YamlParser {
    fn parse(&self, header: &str) -> Result<Meta> {
        if header.trim().is_empty() {
            return Ok(Meta::new());
        }
        let value: Value = serde_yaml::from_str(header).or_raise(|| ErrorKind::MalformedHeader)?;
        match value {
            Value::Null => Ok(Meta::new()),
            Value::Mapping(_) => serde_yaml::from_value(value).or_raise(|| ErrorKind::MalformedHeader),
            Value::Bool(_) => exn::bail!(ErrorKind::NotAMapping("boolean")),
            Value::Number(_) => exn::bail!(ErrorKind::NotAMapping("number")),
            Value::String(_) => exn::bail!(ErrorKind::NotAMapping("string")),
            Value::Sequence(_) => exn::bail!(ErrorKind::NotAMapping("sequence")),
            Value::Tagged(_) => exn::bail!(ErrorKind::NotAMapping("tagged value")),
        }
    }
}

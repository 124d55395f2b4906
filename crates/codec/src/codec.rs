use crate::consts::DEFAULT_DELIMITER_REGEX;
use crate::error::{ErrorKind, Result};
use crate::header::{ParseHeader, YamlParser};
use crate::models::{Document, Meta, depth};
use crate::render::Render;
use exn::ResultExt;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

/// How much of a document to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Split the front matter off, parse it, and render the body.
    Full,
    /// Parse the front matter only. The body is never rendered.
    MetadataOnly,
}

/// Splits a content file into front matter and body, and processes both.
///
/// The front matter block is located with a delimiter regex whose first
/// capture group is the header text. Only the first block in a file counts;
/// anything resembling a delimiter further down is body text.
#[derive(Clone)]
pub struct Codec {
    delimiter: Regex,
    parser: Arc<dyn ParseHeader>,
    renderer: Arc<dyn Render>,
}

impl Codec {
    /// Default codec: `---` delimited YAML front matter with the given body
    /// renderer.
    pub fn new(renderer: impl Render + 'static) -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER_REGEX.clone(),
            parser: Arc::new(YamlParser),
            renderer: Arc::new(renderer),
        }
    }

    /// Replace the delimiter pattern. It must compile and contain at least
    /// one capture group.
    pub fn with_delimiter(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).or_raise(|| ErrorKind::InvalidDelimiter(pattern.to_string()))?;
        // Group zero is the whole match.
        if regex.captures_len() < 2 {
            exn::bail!(ErrorKind::InvalidDelimiter(pattern.to_string()));
        }
        self.delimiter = regex;
        Ok(self)
    }

    pub fn with_parser(mut self, parser: impl ParseHeader + 'static) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    pub fn with_renderer(mut self, renderer: impl Render + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Split text into `(header, body)`. Without a front matter block the
    /// header is `None` and the body is the whole text.
    pub fn split<'t>(&self, text: &'t str) -> (Option<&'t str>, String) {
        match self.delimiter.captures(text) {
            Some(captures) => {
                let (Some(block), header) = (captures.get(0), captures.get(1)) else {
                    return (None, text.to_string());
                };
                let mut body = String::with_capacity(text.len() - block.len());
                body.push_str(&text[..block.start()]);
                body.push_str(&text[block.end()..]);
                (Some(header.map_or("", |m| m.as_str())), body)
            },
            None => (None, text.to_string()),
        }
    }

    /// Parse just the front matter of a file's text.
    pub fn metadata(&self, text: &str) -> Result<Meta> {
        match self.delimiter.captures(text).and_then(|captures| captures.get(1)) {
            Some(header) => self.parser.parse(header.as_str()),
            None => Ok(Meta::new()),
        }
    }

    /// Decode the raw bytes of a content file into a [`Document`].
    ///
    /// In [`Mode::MetadataOnly`] the body is split off but left unrendered
    /// (`content` is `None`).
    #[instrument(skip(self, contents), fields(size = contents.len()))]
    pub fn decode(&self, contents: &[u8], keypath: &str, filepath: &Path, mode: Mode) -> Result<Document> {
        let text = std::str::from_utf8(contents).or_raise(|| ErrorKind::InvalidEncoding)?;
        let (header, raw) = self.split(text);
        let meta = match header {
            Some(header) => self.parser.parse(header)?,
            None => Meta::new(),
        };
        let content = match mode {
            Mode::Full => Some(self.renderer.render(&raw)),
            Mode::MetadataOnly => None,
        };
        Ok(Document {
            keypath: keypath.to_string(),
            filepath: filepath.to_path_buf(),
            raw,
            content,
            meta,
            depth: depth(keypath),
        })
    }
}

#[cfg(feature = "markdown")]
impl Default for Codec {
    fn default() -> Self {
        Self::new(crate::render::MarkdownRenderer::new())
    }
}

#[cfg(not(feature = "markdown"))]
impl Default for Codec {
    fn default() -> Self {
        Self::new(crate::render::PassthroughRenderer)
    }
}

//! Markup rendering for document bodies.

/// Renders a document body (front matter already removed) to its output form.
pub trait Render: Send + Sync {
    fn render(&self, raw: &str) -> String;
}

/// Returns the body untouched. Useful for plain-text content, and for tests
/// that only care about what reached the renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRenderer;

impl Render for PassthroughRenderer {
    fn render(&self, raw: &str) -> String {
        raw.to_string()
    }
}

#[cfg(feature = "markdown")]
pub use self::markdown::MarkdownRenderer;

#[cfg(feature = "markdown")]
mod markdown {
    use super::Render;
    use comrak::Options;

    /// Markdown to HTML, with the "extra" syntax content authors tend to
    /// expect: tables, footnotes, definition lists, strikethrough and
    /// autolinks. Raw HTML inside the body is passed through.
    #[derive(Debug, Clone)]
    pub struct MarkdownRenderer {
        options: Options<'static>,
    }

    impl MarkdownRenderer {
        pub fn new() -> Self {
            let mut options = Options::default();
            let ext = &mut options.extension;
            ext.strikethrough = true;
            ext.table = true;
            ext.autolink = true;
            ext.tasklist = true;
            ext.footnotes = true;
            ext.description_lists = true;
            options.render.r#unsafe = true;
            Self { options }
        }

        /// Use a caller-supplied set of comrak options instead.
        pub fn with_options(options: Options<'static>) -> Self {
            Self { options }
        }
    }

    impl Default for MarkdownRenderer {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Render for MarkdownRenderer {
        fn render(&self, raw: &str) -> String {
            comrak::markdown_to_html(raw, &self.options)
        }
    }

}

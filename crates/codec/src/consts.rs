use regex::Regex;
use std::sync::LazyLock;

/// Default front matter delimiter: a block opened by a line of three dashes
/// on the very first line and closed by the next such line. The first capture
/// group is the header text. The line break after the closing marker belongs
/// to the block, so the body starts cleanly.
///
/// Only the start of the file can open a block: further down, `---` lines are
/// markdown (setext underlines, thematic breaks).
pub const DEFAULT_DELIMITER: &str = r"(?sm)\A---[ \t]*\r?\n(.*?)^---[ \t]*\r?(?:\n|\z)";

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

regex!(DEFAULT_DELIMITER_REGEX, DEFAULT_DELIMITER);

//! Response tokenizer.

use crate::error::{Result, WireError};
use crate::markup::strip_tags;
use crate::record::parse_int;
use crate::sentinel::LINE_SEPARATOR;

/// A tokenized response: an ordered, immutable sequence of text lines.
///
/// Construction strips one leading byte-order mark and deletes any leaked
/// markup fragments before splitting on the fixed `\r\n` separator, so the
/// positional field offsets that every reader depends on are preserved.
/// After a successful parse, line 0 always exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    lines: Vec<String>,
}

impl RawResponse {
    /// Tokenizes a raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::EmptyResponse`] if nothing remains once the
    /// byte-order mark and leaked markup are removed.
    pub fn parse(body: &str) -> Result<Self> {
        let body = body.strip_prefix('\u{feff}').unwrap_or(body);
        let cleaned = strip_tags(body);
        if cleaned.is_empty() {
            return Err(WireError::EmptyResponse);
        }
        Ok(Self {
            lines: cleaned
                .split(LINE_SEPARATOR)
                .map(str::to_owned)
                .collect(),
        })
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Always false for a parsed response; present for completeness.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// All lines, untrimmed.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The lines from `offset` onward; empty if `offset` is past the end.
    #[must_use]
    pub fn lines_from(&self, offset: usize) -> &[String] {
        self.lines.get(offset..).unwrap_or(&[])
    }

    /// Line `index`, untrimmed, if present.
    #[must_use]
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// Line `index`, trimmed; empty if absent.
    #[must_use]
    pub fn field(&self, index: usize) -> &str {
        self.lines.get(index).map_or("", |l| l.trim())
    }

    /// Line `index` parsed as an integer, defaulting to 0.
    #[must_use]
    pub fn int(&self, index: usize) -> i64 {
        parse_int(self.field(index))
    }

    /// Line `index` interpreted as a boolean flag: any non-empty value other
    /// than `"0"` is true.
    #[must_use]
    pub fn flag(&self, index: usize) -> bool {
        let value = self.field(index);
        !value.is_empty() && value != "0"
    }
}

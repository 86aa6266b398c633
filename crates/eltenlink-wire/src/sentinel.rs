//! Sentinel markers and the sentinel-delimited block splitter.
//!
//! Variable-length content (message bodies, forum posts, feed entries) is
//! carried inside the line-oriented framing with two reserved markers: the
//! block terminator ends one logical unit, and the newline substitute stands
//! in for a real line break inside a text field. A third marker wraps an
//! inline audio-resource reference that must be lifted out of visible text.

use crate::record::parse_int;

/// The fixed two-byte line separator used by every response.
pub const LINE_SEPARATOR: &str = "\r\n";

/// Terminates one sentinel-delimited block (message, post, feed item).
pub const BLOCK_TERMINATOR: &str = "\u{4}END\u{4}";

/// Stands in for a real line break inside a text field.
pub const NEWLINE_SUBSTITUTE: &str = "\u{4}LINE\u{4}";

/// Wraps an inline audio-resource reference embedded in post text.
pub const AUDIO_MARKER: &str = "\u{4}AUDIO\u{4}";

/// One sentinel-delimited block, kept as its constituent lines so callers can
/// read a scalar prefix positionally before treating the rest as free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    lines: Vec<String>,
}

impl TextBlock {
    fn from_raw(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            lines: trimmed.split(LINE_SEPARATOR).map(str::to_owned).collect(),
        })
    }

    /// Number of lines in the block.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True if the block has no lines. Blocks produced by [`split_blocks`]
    /// are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The lines of the block, untrimmed.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Line `index`, trimmed; empty if the block is shorter.
    #[must_use]
    pub fn line(&self, index: usize) -> &str {
        self.lines.get(index).map_or("", |l| l.trim())
    }

    /// Line `index` parsed as an integer, defaulting to 0.
    #[must_use]
    pub fn int(&self, index: usize) -> i64 {
        parse_int(self.line(index))
    }

    /// Line `index` interpreted as a boolean flag: any non-empty value other
    /// than `"0"` is true.
    #[must_use]
    pub fn flag(&self, index: usize) -> bool {
        let value = self.line(index);
        !value.is_empty() && value != "0"
    }

    /// Joins the lines from `index` onward into free text, restoring the
    /// embedded-newline substitute to real line breaks and trimming.
    #[must_use]
    pub fn text_from(&self, index: usize) -> String {
        if index >= self.lines.len() {
            return String::new();
        }
        self.lines[index..]
            .join("\n")
            .replace(NEWLINE_SUBSTITUTE, "\n")
            .trim()
            .to_owned()
    }

    /// The whole block as free text.
    #[must_use]
    pub fn text(&self) -> String {
        self.text_from(0)
    }

    /// Consumes the block, yielding its lines. For decoders whose metadata
    /// straddles a terminator and must re-slice the following block.
    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Splits a line range on the block terminator into ordered blocks.
///
/// The lines are rejoined with the line separator first, so a terminator may
/// fall anywhere within a line. Blocks that are empty after trimming (such as
/// the run after a terminator at end of input) are discarded.
#[must_use]
pub fn split_blocks(lines: &[String]) -> Vec<TextBlock> {
    lines
        .join(LINE_SEPARATOR)
        .split(BLOCK_TERMINATOR)
        .filter_map(TextBlock::from_raw)
        .collect()
}

/// Extracts the first audio reference wrapped in [`AUDIO_MARKER`] pairs and
/// strips every such span from the text. Returns the cleaned text and the
/// reference, if one was present.
#[must_use]
pub fn extract_audio(text: &str) -> (String, Option<String>) {
    let mut out = String::with_capacity(text.len());
    let mut audio = None;
    let mut rest = text;
    while let Some(open) = rest.find(AUDIO_MARKER) {
        out.push_str(&rest[..open]);
        let after = &rest[open + AUDIO_MARKER.len()..];
        if let Some(close) = after.find(AUDIO_MARKER) {
            let path = after[..close].trim();
            if audio.is_none() && !path.is_empty() {
                audio = Some(path.to_owned());
            }
            rest = &after[close + AUDIO_MARKER.len()..];
        } else {
            // Unbalanced marker stays in the visible text.
            out.push_str(&rest[open..]);
            rest = "";
        }
    }
    out.push_str(rest);
    (out.trim().to_owned(), audio)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|&l| l.to_owned()).collect()
    }

    #[test]
    fn test_two_blocks_with_embedded_newline() {
        let input = lines(&[
            "hello\u{4}LINE\u{4}world",
            "\u{4}END\u{4}",
            "second",
            "\u{4}END\u{4}",
        ]);
        let blocks = split_blocks(&input);
        let texts: Vec<String> = blocks.iter().map(TextBlock::text).collect();
        assert_eq!(texts, vec!["hello\nworld".to_owned(), "second".to_owned()]);
    }

    #[test]
    fn test_empty_trailing_block_discarded() {
        let input = lines(&["only", "\u{4}END\u{4}", ""]);
        assert_eq!(split_blocks(&input).len(), 1);
    }

    #[test]
    fn test_scalar_prefix_and_text() {
        let input = lines(&["17", "alice", "first line", "more\u{4}LINE\u{4}text"]);
        let blocks = split_blocks(&input);
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.int(0), 17);
        assert_eq!(block.line(1), "alice");
        assert_eq!(block.text_from(2), "first line\nmore\ntext");
    }

    #[test]
    fn test_flag_reads_nonzero() {
        let input = lines(&["1", "0", "", "yes"]);
        let block = &split_blocks(&input)[0];
        assert!(block.flag(0));
        assert!(!block.flag(1));
        assert!(!block.flag(2));
        assert!(block.flag(3));
    }

    #[test]
    fn test_extract_audio_strips_marker() {
        let (text, audio) =
            extract_audio("listen \u{4}AUDIO\u{4}sounds/clip.ogg\u{4}AUDIO\u{4} now");
        assert_eq!(text, "listen  now");
        assert_eq!(audio.as_deref(), Some("sounds/clip.ogg"));
    }

    #[test]
    fn test_extract_audio_without_marker() {
        let (text, audio) = extract_audio("plain text");
        assert_eq!(text, "plain text");
        assert!(audio.is_none());
    }

    #[test]
    fn test_unbalanced_audio_marker_kept() {
        let (text, audio) = extract_audio("before \u{4}AUDIO\u{4}path");
        assert_eq!(text, "before \u{4}AUDIO\u{4}path");
        assert!(audio.is_none());
    }
}

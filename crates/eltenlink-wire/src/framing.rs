//! Framing conventions and per-endpoint selection.
//!
//! The protocol has no schema; each endpoint's response is divided into
//! records by one of four conventions. Each convention is a small reader
//! parameterized by the offsets the endpoint uses, behind a common trait so
//! the request layer can decode generically. A static table records which
//! convention each endpoint speaks.

use crate::composite::{CompositeEntry, decode_entries};
use crate::error::Result;
use crate::record::{Record, read_records};
use crate::section::{Section, read_sections};
use crate::sentinel::{TextBlock, split_blocks};
use crate::tokenizer::RawResponse;

/// A framing convention applied to a status-checked response.
pub trait Framing {
    /// The decoded payload shape.
    type Output;

    /// Decodes the payload of `response` (line 0 has already been validated
    /// by the status decoder).
    ///
    /// # Errors
    ///
    /// Individual framings are truncation-tolerant and rarely fail, but the
    /// signature allows structural errors to surface.
    fn decode(&self, response: &RawResponse) -> Result<Self::Output>;
}

/// Fixed-width framing: a count line followed by homogeneous records.
#[derive(Debug, Clone, Copy)]
pub struct FixedFraming {
    /// Line holding the declared record count.
    pub count_line: usize,
    /// First data line.
    pub start: usize,
    /// Fields per record.
    pub field_width: usize,
}

impl Framing for FixedFraming {
    type Output = Vec<Record>;

    fn decode(&self, response: &RawResponse) -> Result<Self::Output> {
        let count = usize::try_from(response.int(self.count_line)).unwrap_or(0);
        Ok(read_records(
            response.lines(),
            self.start,
            count,
            self.field_width,
        ))
    }
}

/// Section framing: repeated self-describing sections of mixed kinds.
#[derive(Debug, Clone, Copy)]
pub struct SectionFraming {
    /// First line to scan for sections.
    pub start: usize,
    /// Section kinds to interpret; others are skipped by arithmetic.
    pub kinds: &'static [&'static str],
}

impl Framing for SectionFraming {
    type Output = Vec<Section>;

    fn decode(&self, response: &RawResponse) -> Result<Self::Output> {
        Ok(read_sections(response.lines(), self.start, self.kinds))
    }
}

/// Sentinel framing: variable-length blocks split on the block terminator.
#[derive(Debug, Clone, Copy)]
pub struct SentinelFraming {
    /// First line of the sentinel-delimited region.
    pub start: usize,
}

impl Framing for SentinelFraming {
    type Output = Vec<TextBlock>;

    fn decode(&self, response: &RawResponse) -> Result<Self::Output> {
        Ok(split_blocks(response.lines_from(self.start)))
    }
}

/// Composite framing: a declared number of state-machine-decoded entries.
#[derive(Debug, Clone, Copy)]
pub struct CompositeFraming {
    /// Line holding the declared entry count.
    pub count_line: usize,
    /// First line of the first entry.
    pub start: usize,
}

impl Framing for CompositeFraming {
    type Output = Vec<CompositeEntry>;

    fn decode(&self, response: &RawResponse) -> Result<Self::Output> {
        let count = usize::try_from(response.int(self.count_line)).unwrap_or(0);
        Ok(decode_entries(response.lines(), self.start, count))
    }
}

/// The framing convention an endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingKind {
    /// Fixed-width header or homogeneous listing.
    Fixed,
    /// Self-describing multi-section dump.
    Section,
    /// Sentinel-delimited variable-length blocks.
    Sentinel,
    /// Scalar prefix plus sentinel-terminated text segments per entry.
    Composite,
}

/// Which convention each listing endpoint speaks, for the conventions' most
/// detailed response mode. Endpoints answering with a bare status line or a
/// plain name-per-line listing are not framed and do not appear here.
pub const ENDPOINT_FRAMINGS: &[(&str, FramingKind)] = &[
    ("messages_conversations.php", FramingKind::Sentinel),
    ("forum_struct.php", FramingKind::Section),
    ("forum_thread.php", FramingKind::Sentinel),
    ("forum_search.php", FramingKind::Fixed),
    ("blog_list.php", FramingKind::Fixed),
    ("blog_posts.php", FramingKind::Fixed),
    ("blog_categories.php", FramingKind::Fixed),
    ("blog_read.php", FramingKind::Composite),
    ("feeds.php", FramingKind::Sentinel),
    ("user_search.php", FramingKind::Fixed),
    ("userinfo.php", FramingKind::Fixed),
    ("agent.php", FramingKind::Fixed),
];

/// Looks up the framing convention for an endpoint.
#[must_use]
pub fn framing_for(endpoint: &str) -> Option<FramingKind> {
    ENDPOINT_FRAMINGS
        .iter()
        .find(|&&(name, _)| name == endpoint)
        .map(|&(_, kind)| kind)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_framing_decodes_records() {
        let response = RawResponse::parse("0\r\n2\r\n\r\nalice\r\ntrue\r\nbob\r\nfalse").unwrap();
        let framing = FixedFraming {
            count_line: 1,
            start: 3,
            field_width: 2,
        };
        let records = framing.decode(&response).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].field(0), "alice");
        assert_eq!(records[1].field(1), "false");
    }

    #[test]
    fn test_sentinel_framing_starts_at_offset() {
        let response =
            RawResponse::parse("0\r\nheader\r\nbody\r\n\u{4}END\u{4}").unwrap();
        let framing = SentinelFraming { start: 2 };
        let blocks = framing.decode(&response).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text(), "body");
    }

    #[test]
    fn test_endpoint_lookup() {
        assert_eq!(framing_for("forum_struct.php"), Some(FramingKind::Section));
        assert_eq!(framing_for("blog_read.php"), Some(FramingKind::Composite));
        assert_eq!(framing_for("contacts.php"), None);
    }
}

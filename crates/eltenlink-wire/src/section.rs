//! Self-describing section reading for combined structure dumps.
//!
//! A single payload can carry several record kinds at once (groups, forums
//! and threads of a discussion board, for instance). Each section announces
//! itself inline: a kind label, a record count, a field width, then
//! `count * width` value lines. The reader interprets the kinds it was asked
//! for and skips the rest using the same arithmetic, so unknown sections
//! never knock later known ones out of alignment.

use crate::record::{Record, parse_int};
use crate::sentinel::NEWLINE_SUBSTITUTE;

/// Length of the content fingerprint the server emits after the status line
/// of a structure dump.
const FINGERPRINT_LEN: usize = 40;

/// One decoded section of a multi-section payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// The kind label announced before the section body.
    pub kind: String,
    /// The record count the section declared for itself.
    pub declared_count: usize,
    /// The per-record field width the section declared.
    pub field_width: usize,
    /// The records actually read (may be fewer than declared on truncation).
    pub records: Vec<Record>,
}

/// Reads repeated named sections from `lines`, starting at `start`.
///
/// Blank lines between sections are skipped, as is the 40-character content
/// fingerprint when it precedes the first section. Sections whose kind is
/// not in `known_kinds` are skipped wholesale by their own declared
/// `count * width` arithmetic. The embedded-newline substitute is restored
/// inside every value. Reading stops at end of input; a truncated final
/// section keeps only its complete records.
#[must_use]
pub fn read_sections(lines: &[String], start: usize, known_kinds: &[&str]) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut index = start;

    while index < lines.len() && lines[index].trim().is_empty() {
        index += 1;
    }
    if index < lines.len() && lines[index].trim().len() == FINGERPRINT_LEN {
        index += 1;
    }

    while index < lines.len() {
        let label = lines[index].trim();
        index += 1;
        if label.is_empty() {
            continue;
        }
        let kind = label.to_owned();

        if index >= lines.len() {
            break;
        }
        let declared_count = usize::try_from(parse_int(&lines[index])).unwrap_or(0);
        index += 1;

        if index >= lines.len() {
            break;
        }
        let field_width = usize::try_from(parse_int(&lines[index])).unwrap_or(0);
        index += 1;

        if declared_count == 0 || field_width == 0 {
            continue;
        }

        let body = declared_count.saturating_mul(field_width);
        let available = lines.len() - index;
        let take = body.min(available);
        if take < body {
            tracing::debug!(
                kind = %kind,
                declared = declared_count,
                "section truncated; keeping complete records only"
            );
        }

        if !known_kinds.contains(&kind.as_str()) {
            tracing::debug!(kind = %kind, skipped = body, "skipping unknown section");
            index += take;
            continue;
        }

        let values: Vec<String> = lines[index..index + take]
            .iter()
            .map(|l| l.replace(NEWLINE_SUBSTITUTE, "\n"))
            .collect();
        index += take;

        let records = values
            .chunks_exact(field_width)
            .map(|chunk| Record::new(chunk.to_vec()))
            .collect();

        sections.push(Section {
            kind,
            declared_count,
            field_width,
            records,
        });
    }

    sections
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|&l| l.to_owned()).collect()
    }

    #[test]
    fn test_reads_declared_sections() {
        let input = lines(&[
            "0", "groups", "2", "2", "1", "alpha", "2", "beta", "forums", "1", "3", "g1",
            "General", "7",
        ]);
        let sections = read_sections(&input, 1, &["groups", "forums"]);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].kind, "groups");
        assert_eq!(sections[0].records.len(), 2);
        assert_eq!(sections[0].records[1].field(1), "beta");
        assert_eq!(sections[1].records[0].field(1), "General");
    }

    #[test]
    fn test_unknown_section_skipped_without_misalignment() {
        let input = lines(&[
            "0", "banners", "2", "3", "x", "x", "x", "y", "y", "y", "groups", "1", "2", "5",
            "known",
        ]);
        let sections = read_sections(&input, 1, &["groups"]);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].kind, "groups");
        assert_eq!(sections[0].records[0].int(0), 5);
        assert_eq!(sections[0].records[0].field(1), "known");
    }

    #[test]
    fn test_fingerprint_line_skipped() {
        let fingerprint = "a".repeat(40);
        let input = lines(&["0", &fingerprint, "groups", "1", "1", "only"]);
        let sections = read_sections(&input, 1, &["groups"]);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].records[0].field(0), "only");
    }

    #[test]
    fn test_blank_lines_between_sections() {
        let input = lines(&["0", "", "groups", "1", "1", "a", "", "forums", "1", "1", "b"]);
        let sections = read_sections(&input, 1, &["groups", "forums"]);
        assert_eq!(sections.len(), 2);
    }

    #[test]
    fn test_truncated_section_keeps_complete_records() {
        let input = lines(&["0", "groups", "3", "2", "1", "one", "2"]);
        let sections = read_sections(&input, 1, &["groups"]);
        assert_eq!(sections[0].records.len(), 1);
        assert_eq!(sections[0].declared_count, 3);
    }

    #[test]
    fn test_newline_substitute_restored_in_values() {
        let input = lines(&["0", "groups", "1", "1", "two\u{4}LINE\u{4}lines"]);
        let sections = read_sections(&input, 1, &["groups"]);
        assert_eq!(sections[0].records[0].raw(0), "two\nlines");
    }

    #[test]
    fn test_empty_declaration_consumes_nothing() {
        let input = lines(&["0", "groups", "0", "5", "forums", "1", "1", "v"]);
        let sections = read_sections(&input, 1, &["groups", "forums"]);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].kind, "forums");
    }
}

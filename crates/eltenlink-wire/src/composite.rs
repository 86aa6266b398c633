//! State-machine decoder for composite entries.
//!
//! A composite entry (a blog post or one of its comments) opens with six
//! fixed-position scalar lines, then carries two free-text segments of
//! unknown length - an excerpt and the full content - each terminated by the
//! block sentinel on a line of its own. No count precedes the segments; the
//! only sizing information is the entry count declared once in the payload
//! header, so the decoder walks the line stream one state at a time.

use crate::markup::flatten;
use crate::record::parse_int;
use crate::sentinel::{BLOCK_TERMINATOR, NEWLINE_SUBSTITUTE, extract_audio};

/// One fully decoded composite entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositeEntry {
    /// Entry identifier.
    pub id: i64,
    /// True when the author is a native account rather than an external one.
    pub native_author: bool,
    /// Author name.
    pub author: String,
    /// Publication date, as sent.
    pub date: String,
    /// Last-modification date, as sent.
    pub modified: String,
    /// Audio-resource reference, from the header field or lifted out of the
    /// content text.
    pub audio: String,
    /// Short excerpt, markup flattened.
    pub excerpt: String,
    /// Full content, markup flattened; falls back to the excerpt when the
    /// content segment is empty.
    pub content: String,
}

/// Decoder position within one entry. The two text states own the lines
/// collected so far, so a half-read segment cannot leak between entries.
enum EntryState {
    Id,
    Origin,
    Author,
    Date,
    ModDate,
    Audio,
    Excerpt(Vec<String>),
    Content(Vec<String>),
}

/// Decodes exactly `declared_count` entries from `lines`, starting at
/// `start`.
///
/// Trailing lines after the final terminator are ignored. If input runs out
/// in the middle of an entry, the partial entry is discarded and decoding
/// stops with whatever was complete, matching the truncation policy of the
/// fixed-width readers.
#[must_use]
pub fn decode_entries(
    lines: &[String],
    start: usize,
    declared_count: usize,
) -> Vec<CompositeEntry> {
    let mut entries = Vec::with_capacity(declared_count);
    let mut position = start;

    'entries: for _ in 0..declared_count {
        let mut entry = CompositeEntry::default();
        let mut state = EntryState::Id;

        loop {
            let Some(line) = lines.get(position) else {
                tracing::debug!(
                    decoded = entries.len(),
                    declared = declared_count,
                    "entry stream truncated mid-state; discarding partial entry"
                );
                break 'entries;
            };
            position += 1;

            state = match state {
                EntryState::Id => {
                    entry.id = parse_int(line);
                    EntryState::Origin
                }
                EntryState::Origin => {
                    entry.native_author = line.trim() == "1";
                    EntryState::Author
                }
                EntryState::Author => {
                    entry.author = line.trim().to_owned();
                    EntryState::Date
                }
                EntryState::Date => {
                    entry.date = line.trim().to_owned();
                    EntryState::ModDate
                }
                EntryState::ModDate => {
                    entry.modified = line.trim().to_owned();
                    EntryState::Audio
                }
                EntryState::Audio => {
                    entry.audio = line.trim().to_owned();
                    EntryState::Excerpt(Vec::new())
                }
                EntryState::Excerpt(mut segment) => {
                    if line.trim() == BLOCK_TERMINATOR {
                        entry.excerpt = finish_segment(&segment);
                        EntryState::Content(Vec::new())
                    } else {
                        segment.push(line.clone());
                        EntryState::Excerpt(segment)
                    }
                }
                EntryState::Content(mut segment) => {
                    if line.trim() == BLOCK_TERMINATOR {
                        entry.content = finish_segment(&segment);
                        break;
                    }
                    segment.push(line.clone());
                    EntryState::Content(segment)
                }
            };
        }

        if entry.audio.is_empty() {
            let (cleaned, audio) = extract_audio(&entry.content);
            if let Some(reference) = audio {
                entry.content = cleaned;
                entry.audio = reference;
            }
        }
        if entry.content.is_empty() && !entry.excerpt.is_empty() {
            entry.content.clone_from(&entry.excerpt);
        }
        entries.push(entry);
    }

    entries
}

fn finish_segment(segment: &[String]) -> String {
    flatten(&segment.join("\n").replace(NEWLINE_SUBSTITUTE, "\n"))
}

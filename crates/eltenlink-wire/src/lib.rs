//! # eltenlink-wire
//!
//! Sans-I/O decoder for the `EltenLink` wire protocol: a legacy,
//! line-oriented, non-self-describing text format in which several framing
//! conventions coexist on the same connection.
//!
//! Every response is a `\r\n`-separated line sequence whose first line is a
//! numeric status code. Beyond that there is no schema; each endpoint frames
//! its payload by one of four conventions:
//!
//! - **Fixed**: a declared record count followed by records of a known field
//!   width at consecutive line offsets
//! - **Section**: repeated named sections, each declaring its own count and
//!   width inline
//! - **Sentinel**: variable-length blocks split on a reserved terminator
//!   marker, with a second marker standing in for embedded line breaks
//! - **Composite**: entries opening with fixed scalar lines and closing with
//!   sentinel-terminated free-text segments, decoded by a state machine
//!
//! All decoders here are pure functions over an immutable line buffer: no
//! I/O, no locking, freely shareable across threads. Truncated payload tails
//! are absorbed (and logged) rather than raised, because the upstream server
//! routinely cuts long listings short.
//!
//! ## Quick start
//!
//! ```
//! use eltenlink_wire::{RawResponse, decode_status, read_records};
//!
//! # fn main() -> eltenlink_wire::Result<()> {
//! let response = RawResponse::parse("0\r\n2\r\n\r\nalice\r\n1\r\nbob\r\n0")?;
//! decode_status(&response)?;
//! let records = read_records(response.lines(), 3, 2, 2);
//! assert_eq!(records[0].field(0), "alice");
//! assert!(records[0].flag(1));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod composite;
mod error;
pub mod markup;
mod record;
mod section;
pub mod sentinel;
pub mod status;
mod tokenizer;

pub mod framing;

pub use composite::{CompositeEntry, decode_entries};
pub use error::{Result, WireError};
pub use framing::{
    CompositeFraming, FixedFraming, Framing, FramingKind, SectionFraming, SentinelFraming,
    framing_for,
};
pub use record::{Record, parse_int, read_records};
pub use section::{Section, read_sections};
pub use sentinel::{
    AUDIO_MARKER, BLOCK_TERMINATOR, LINE_SEPARATOR, NEWLINE_SUBSTITUTE, TextBlock, extract_audio,
    split_blocks,
};
pub use status::{decode_status, error_for, meaning, status_code};
pub use tokenizer::RawResponse;

//! Error types for the wire decoder.

use thiserror::Error;

/// Errors produced while decoding a wire response.
///
/// Truncated listings are deliberately *not* represented here: the readers
/// absorb a truncated tail and return the records that were complete, because
/// the upstream server routinely cuts long listings short. Only structural
/// failures (no status line, unparseable status) and server-reported error
/// codes surface as errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The response body contained no lines at all.
    #[error("empty response from server")]
    EmptyResponse,

    /// The status line was missing or not a base-10 integer.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A recognized negative status code with a known meaning.
    #[error("server error {code}: {meaning}")]
    Protocol {
        /// The raw status code as sent on line 0.
        code: i32,
        /// Human-readable meaning from the static status table.
        meaning: &'static str,
    },

    /// A negative status code absent from the static status table.
    #[error("unrecognized server error {0}")]
    Server(i32),
}

/// Result type alias using [`WireError`].
pub type Result<T> = std::result::Result<T, WireError>;

//! Error types for the client library.

use eltenlink_wire::{WireError, status};
use thiserror::Error;

/// Errors that can occur during client operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Connection-level failure. Never retried automatically.
    #[error("transport error: {0}")]
    Transport(String),

    /// The network call exceeded the caller-supplied timeout. Distinct from
    /// protocol errors and never retried automatically.
    #[error("request timed out")]
    Timeout,

    /// A wire-protocol decoding failure or server-reported status error.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// A session-layer failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// `advance()` was called on a pagination cursor whose last response
    /// reported no further pages. A caller programming error.
    #[error("no more pages available")]
    NoMorePages,
}

/// Session-layer failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    /// An authenticated operation was attempted without a live session.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Re-submitting the cached credential failed to produce a new token.
    #[error("token refresh failed")]
    RefreshFailed,

    /// The server requires a two-factor verification code to finish login.
    #[error("two-factor authentication required")]
    TwoFactorRequired,
}

impl Error {
    /// True for failures the caller must resolve by re-authenticating:
    /// session errors and the credential-related status codes. Read
    /// operations degrade every *other* failure to an empty listing.
    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(
            self,
            Self::Session(_)
                | Self::Wire(WireError::Protocol {
                    code: status::INVALID_CREDENTIALS | status::TWO_FACTOR_REQUIRED,
                    ..
                })
        )
    }
}

/// Result type alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

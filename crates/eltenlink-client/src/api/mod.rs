//! Typed endpoint facades.
//!
//! Each submodule wraps one functional area of the server API behind a
//! borrow of the request engine. The facades share two conventions:
//!
//! - **Read operations degrade.** A listing call that fails for any reason
//!   other than authentication returns an empty collection and logs the
//!   failure; only authentication failures propagate, because those are the
//!   caller's to resolve. The server truncates and hiccups often enough that
//!   surfacing every glitch would make every screen an error screen.
//! - **Write operations report.** Mutating calls return an [`Outcome`] with
//!   a success flag and a human-readable message, mapping the handful of
//!   per-endpoint status codes that carry a more specific meaning than the
//!   global table.

pub mod account;
pub mod blog;
pub mod contacts;
pub mod feed;
pub mod forum;
pub mod messages;
pub mod users;

use eltenlink_wire::{RawResponse, WireError};

use crate::error::{Error, Result};

/// Result of a write operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Whether the server accepted the operation.
    pub success: bool,
    /// A human-readable confirmation or failure message.
    pub message: String,
}

impl Outcome {
    pub(crate) fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Builds an [`Outcome`] from a write-request result. `success` is the
/// message reported when the server accepts; `overrides` map status codes
/// whose meaning at this endpoint is more specific than the global table.
pub(crate) fn outcome(
    result: Result<RawResponse>,
    success: &str,
    overrides: &[(i32, &str)],
) -> Result<Outcome> {
    match result {
        Ok(_) => Ok(Outcome::ok(success)),
        Err(Error::Wire(WireError::Protocol { code, meaning })) => {
            let message = overrides
                .iter()
                .find(|(c, _)| *c == code)
                .map_or(meaning, |(_, m)| *m);
            Ok(Outcome::failed(message))
        }
        Err(Error::Wire(WireError::Server(code))) => {
            Ok(Outcome::failed(format!("server error {code}")))
        }
        Err(err) => Err(err),
    }
}

/// Degrades a failed read to an empty value unless the failure is an
/// authentication problem the caller must resolve.
pub(crate) fn degrade<T: Default>(endpoint: &str, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(err) if err.is_authentication() => Err(err),
        Err(err) => {
            tracing::debug!(endpoint, error = %err, "read failed, returning empty");
            Ok(T::default())
        }
    }
}

/// Decodes a bare name-per-line listing: every non-empty line after the
/// status line is one name.
pub(crate) fn name_list(response: &RawResponse) -> Vec<String> {
    response
        .lines_from(1)
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use eltenlink_wire::status;

    #[test]
    fn test_outcome_override_beats_global_meaning() {
        let err = Err(Error::Wire(eltenlink_wire::error_for(
            status::PERMISSION_DENIED,
        )));
        let out = outcome(err, "done", &[(status::PERMISSION_DENIED, "already present")])
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.message, "already present");
    }

    #[test]
    fn test_outcome_falls_back_to_global_meaning() {
        let err = Err(Error::Wire(eltenlink_wire::error_for(status::NOT_FOUND)));
        let out = outcome(err, "done", &[]).unwrap();
        assert!(!out.success);
        assert_eq!(out.message, "user not found");
    }

    #[test]
    fn test_outcome_propagates_transport_errors() {
        let result = outcome(Err(Error::Timeout), "done", &[]);
        assert_eq!(result, Err(Error::Timeout));
    }

    #[test]
    fn test_degrade_keeps_authentication_errors() {
        let degraded: Result<Vec<String>> =
            degrade("x.php", Err(Error::Wire(WireError::Server(-9))));
        assert_eq!(degraded, Ok(Vec::new()));

        let kept: Result<Vec<String>> = degrade(
            "x.php",
            Err(Error::Session(SessionError::NotAuthenticated)),
        );
        assert!(kept.is_err());
    }

    #[test]
    fn test_name_list_skips_blank_lines() {
        let response = RawResponse::parse("0\r\nalice\r\n\r\nbob\r\n  ").unwrap();
        assert_eq!(name_list(&response), vec!["alice", "bob"]);
    }
}

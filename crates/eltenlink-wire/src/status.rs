//! Status-line decoding and the static status-code table.
//!
//! Line 0 of every response is a base-10 status code. `0` is success; the
//! negative codes the server is known to emit are mapped through a fixed
//! table so the same code always yields the same meaning for the lifetime of
//! the process. Codes absent from the table surface with the raw value for
//! diagnostics.

use crate::error::{Result, WireError};
use crate::tokenizer::RawResponse;

/// Success.
pub const STATUS_OK: i32 = 0;
/// Server-side database failure.
pub const DATABASE_ERROR: i32 = -1;
/// Invalid username or password; also reported for a rejected token.
pub const INVALID_CREDENTIALS: i32 = -2;
/// Permission denied.
pub const PERMISSION_DENIED: i32 = -3;
/// User not found.
pub const NOT_FOUND: i32 = -4;
/// Two-factor authentication required to complete the login.
pub const TWO_FACTOR_REQUIRED: i32 = -5;
/// Old password did not match during an account change.
pub const OLD_PASSWORD_INCORRECT: i32 = -6;
/// Email change disallowed for this account.
pub const EMAIL_CHANGE_DISALLOWED: i32 = -7;

const MEANINGS: &[(i32, &str)] = &[
    (DATABASE_ERROR, "database error"),
    (INVALID_CREDENTIALS, "invalid username or password"),
    (PERMISSION_DENIED, "permission denied"),
    (NOT_FOUND, "user not found"),
    (TWO_FACTOR_REQUIRED, "two-factor authentication required"),
    (OLD_PASSWORD_INCORRECT, "incorrect old password"),
    (EMAIL_CHANGE_DISALLOWED, "email change not allowed"),
];

/// Looks up the meaning of a status code in the static table.
#[must_use]
pub fn meaning(code: i32) -> Option<&'static str> {
    MEANINGS
        .iter()
        .find(|&&(c, _)| c == code)
        .map(|&(_, m)| m)
}

/// Maps a non-success status code to its error.
#[must_use]
pub fn error_for(code: i32) -> WireError {
    meaning(code).map_or(WireError::Server(code), |m| WireError::Protocol {
        code,
        meaning: m,
    })
}

/// Reads the status code from line 0.
///
/// # Errors
///
/// Returns [`WireError::MalformedResponse`] when line 0 is missing or not a
/// base-10 integer.
pub fn status_code(response: &RawResponse) -> Result<i32> {
    let line = response
        .line(0)
        .ok_or(WireError::EmptyResponse)?
        .trim();
    line.parse().map_err(|_| {
        WireError::MalformedResponse(format!("non-numeric status line {line:?}"))
    })
}

/// Decodes the status line, succeeding only for status `0`.
///
/// # Errors
///
/// Returns the mapped [`WireError`] for any non-success status, or
/// [`WireError::MalformedResponse`] when the status line is unreadable.
pub fn decode_status(response: &RawResponse) -> Result<()> {
    match status_code(response)? {
        STATUS_OK => Ok(()),
        code => Err(error_for(code)),
    }
}

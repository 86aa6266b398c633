//! Request engine: authenticated request issuing with refresh-and-retry-once.
//!
//! Every endpoint call funnels through here. The engine first asks the
//! session to ensure the token is usable (probing and refreshing a stale
//! one, see [`Session::ensure_valid`]), injects the session's authentication
//! parameters, issues the request, and decodes the status line. When the
//! server still rejects the token it refreshes the session
//! (single-flight, see [`Session::refresh`]) and replays the request exactly
//! once; a second rejection surfaces as the error. Transport failures and
//! timeouts are never retried.

use std::sync::Arc;
use std::time::Duration;

use eltenlink_wire::{RawResponse, WireError, status};

use crate::error::{Error, Result};
use crate::multipart::MultipartBody;
use crate::session::Session;
use crate::transport::Transport;

/// Timeout applied by endpoint calls that do not choose their own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for write operations that upload a free-text body.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Issues requests on behalf of a session.
pub struct RequestEngine {
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
}

impl RequestEngine {
    /// Creates an engine over `transport` for `session`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, session: Arc<Session>) -> Self {
        Self { transport, session }
    }

    /// The session this engine authenticates with.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Issues an authenticated GET and decodes the status line.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors; a rejected token is refreshed
    /// and the request retried once before the rejection is returned.
    pub fn get(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        timeout: Duration,
    ) -> Result<RawResponse> {
        self.authenticated(endpoint, params, None, timeout)
    }

    /// Issues an authenticated multipart POST and decodes the status line.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors; a rejected token is refreshed
    /// and the request retried once before the rejection is returned.
    pub fn post(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        body: &MultipartBody,
        timeout: Duration,
    ) -> Result<RawResponse> {
        self.authenticated(endpoint, params, Some(body), timeout)
    }

    /// Issues an unauthenticated GET and decodes the status line. No retry.
    ///
    /// # Errors
    ///
    /// Transport or wire errors.
    pub fn get_public(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        timeout: Duration,
    ) -> Result<RawResponse> {
        let text = self.transport.get(endpoint, params, timeout)?;
        let response = RawResponse::parse(&text)?;
        eltenlink_wire::decode_status(&response)?;
        Ok(response)
    }

    fn authenticated(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        body: Option<&MultipartBody>,
        timeout: Duration,
    ) -> Result<RawResponse> {
        self.session.ensure_valid()?;
        match self.attempt(endpoint, params, body, timeout) {
            Err(Error::Wire(WireError::Protocol {
                code: status::INVALID_CREDENTIALS,
                ..
            })) => {
                tracing::debug!(endpoint, "token rejected, refreshing and retrying");
                self.session.refresh()?;
                self.attempt(endpoint, params, body, timeout)
            }
            other => other,
        }
    }

    fn attempt(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        body: Option<&MultipartBody>,
        timeout: Duration,
    ) -> Result<RawResponse> {
        let mut full = self.session.auth_params()?;
        full.extend_from_slice(params);
        let text = match body {
            Some(body) => self.transport.post(endpoint, &full, body, timeout)?,
            None => self.transport.get(endpoint, &full, timeout)?,
        };
        let response = RawResponse::parse(&text)?;
        eltenlink_wire::decode_status(&response)?;
        Ok(response)
    }
}

impl std::fmt::Debug for RequestEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestEngine")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

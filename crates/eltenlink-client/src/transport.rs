//! Transport boundary.
//!
//! The HTTP layer is an external collaborator: everything above it needs
//! only "send GET/POST with query parameters, get the raw response text
//! back". That seam is the [`Transport`] trait; [`HttpTransport`] is the
//! production implementation on a blocking `reqwest` client. Tests substitute
//! their own implementation instead of a network.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::multipart::MultipartBody;

/// Default base URL of the production API.
pub const BASE_URL: &str = "https://srvapi.elten.link/leg1/";

/// Protocol version advertised at login and in the user agent.
pub const APP_VERSION: &str = "2.5";

/// Query parameters as owned key/value pairs.
pub type Params = Vec<(String, String)>;

/// Builds one query parameter pair.
#[must_use]
pub fn param(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_owned(), value.into())
}

/// Blocking request transport.
///
/// Implementations map connection failures to [`Error::Transport`] and
/// elapsed deadlines to [`Error::Timeout`]; neither is retried here or
/// anywhere above.
pub trait Transport: Send + Sync {
    /// Issues a GET request to `endpoint` with `params` in the query string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] or [`Error::Timeout`].
    fn get(&self, endpoint: &str, params: &[(String, String)], timeout: Duration)
    -> Result<String>;

    /// Issues a POST request carrying a multipart body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] or [`Error::Timeout`].
    fn post(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        body: &MultipartBody,
        timeout: Duration,
    ) -> Result<String>;
}

/// Production transport over a blocking `reqwest` client.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport against the production API.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the underlying client cannot be
    /// constructed.
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    /// Creates a transport against a custom base URL (test servers,
    /// mirrors).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the underlying client cannot be
    /// constructed.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("Elten {APP_VERSION} agent"))
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }
}

fn map_error(error: &reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout
    } else {
        Error::Transport(error.to_string())
    }
}

impl Transport for HttpTransport {
    fn get(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        timeout: Duration,
    ) -> Result<String> {
        let response = self
            .client
            .get(self.url(endpoint))
            .query(params)
            .timeout(timeout)
            .send()
            .map_err(|e| map_error(&e))?;
        response.text().map_err(|e| map_error(&e))
    }

    fn post(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        body: &MultipartBody,
        timeout: Duration,
    ) -> Result<String> {
        let response = self
            .client
            .post(self.url(endpoint))
            .query(params)
            .header("Content-Type", body.content_type())
            .body(body.encode())
            .timeout(timeout)
            .send()
            .map_err(|e| map_error(&e))?;
        response.text().map_err(|e| map_error(&e))
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

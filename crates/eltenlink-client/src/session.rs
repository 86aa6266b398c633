//! Session state machine with single-flight token refresh.
//!
//! A session owns the identity, the cached credential, and the short-lived
//! token; nothing else in the crate mutates token state. The request engine
//! borrows authentication parameters read-only, asks the session whether the
//! token is still usable before each request, and asks it to refresh when
//! the server rejects one, so two concurrent requests can never race to
//! install two different refreshed tokens.
//!
//! ```text
//! LoggedOut -> Authenticating -> LoggedIn -> LoggedOut
//!                    |              ^
//!                    v              | verify_code()
//!             TwoFactorPending -----+
//! ```
//!
//! Logout replaces the whole state value, dropping username, credential and
//! token together; a stale token object cannot survive a logout.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eltenlink_wire::{RawResponse, WireError, status};

use crate::error::{Error, Result, SessionError};
use crate::transport::{APP_VERSION, Transport, param};

/// Application identifier sent with login and two-factor requests.
pub const APP_ID: &str = "TCELauncher";

const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A token probe within this window is considered still fresh; tokens expire
/// on the order of a day, so probing every request would be pure overhead.
const TOKEN_RECHECK_SECS: i64 = 60;

/// Identity block returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Username in the server's canonical casing.
    pub username: String,
    /// Whether the account has moderator rights.
    pub moderator: bool,
    /// Display name.
    pub full_name: String,
    /// Gender code, as sent.
    pub gender: i64,
    /// Declared languages.
    pub languages: String,
    /// Greeting line from the server.
    pub greeting: String,
}

/// A short-lived authentication token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The token value.
    pub value: String,
    /// When the token was issued by a login.
    pub issued_at: DateTime<Utc>,
    /// When the token last passed a validity probe.
    pub checked_at: DateTime<Utc>,
}

impl Token {
    fn new(value: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            value: value.into(),
            issued_at: now,
            checked_at: now,
        }
    }
}

/// The `Debug` form names the user but never the credential or the token
/// value.
enum SessionState {
    LoggedOut,
    Authenticating {
        username: String,
    },
    TwoFactorPending {
        username: String,
        credential: String,
    },
    LoggedIn {
        identity: Identity,
        credential: String,
        token: Token,
    },
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoggedOut => f.write_str("LoggedOut"),
            Self::Authenticating { username } => f
                .debug_struct("Authenticating")
                .field("username", username)
                .finish(),
            Self::TwoFactorPending { username, .. } => f
                .debug_struct("TwoFactorPending")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::LoggedIn {
                identity, token, ..
            } => f
                .debug_struct("LoggedIn")
                .field("username", &identity.username)
                .field("token_issued_at", &token.issued_at)
                .finish_non_exhaustive(),
        }
    }
}

/// Owns identity, credential, and token for one account.
pub struct Session {
    transport: Arc<dyn Transport>,
    state: RwLock<SessionState>,
    /// Bumped every time a token is installed or cleared. Lets a refresh
    /// caller detect that another caller already completed the refresh it
    /// was waiting for.
    token_generation: AtomicU64,
    /// Serializes refreshes; callers arriving mid-refresh block here and
    /// then observe the freshly installed token instead of re-logging in.
    refresh_gate: Mutex<()>,
}

impl Session {
    /// Creates a logged-out session over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            state: RwLock::new(SessionState::LoggedOut),
            token_generation: AtomicU64::new(0),
            refresh_gate: Mutex::new(()),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// True once a login has completed and not been logged out.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        matches!(&*self.read_state(), SessionState::LoggedIn { .. })
    }

    /// The logged-in username, if any.
    #[must_use]
    pub fn username(&self) -> Option<String> {
        match &*self.read_state() {
            SessionState::LoggedIn { identity, .. } => Some(identity.username.clone()),
            _ => None,
        }
    }

    /// The logged-in identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        match &*self.read_state() {
            SessionState::LoggedIn { identity, .. } => Some(identity.clone()),
            _ => None,
        }
    }

    /// The current token, if any.
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        match &*self.read_state() {
            SessionState::LoggedIn { token, .. } => Some(token.clone()),
            _ => None,
        }
    }

    /// Monotonic counter identifying the installed token.
    #[must_use]
    pub fn token_generation(&self) -> u64 {
        self.token_generation.load(Ordering::Acquire)
    }

    /// Submits the credential and enters the logged-in state.
    ///
    /// # Errors
    ///
    /// [`SessionError::TwoFactorRequired`] when the server demands a
    /// verification code (the credential is cached for [`Self::verify_code`]);
    /// otherwise the mapped status or transport error.
    pub fn login(&self, username: &str, password: &str) -> Result<Identity> {
        *self.write_state() = SessionState::Authenticating {
            username: username.to_owned(),
        };
        match self.login_request(username, password, None) {
            Ok((identity, token)) => {
                tracing::info!(username = %identity.username, "logged in");
                let result = identity.clone();
                self.install(identity, password.to_owned(), token);
                Ok(result)
            }
            Err(Error::Wire(WireError::Protocol {
                code: status::TWO_FACTOR_REQUIRED,
                ..
            })) => {
                *self.write_state() = SessionState::TwoFactorPending {
                    username: username.to_owned(),
                    credential: password.to_owned(),
                };
                Err(SessionError::TwoFactorRequired.into())
            }
            Err(err) => {
                *self.write_state() = SessionState::LoggedOut;
                Err(err)
            }
        }
    }

    /// Submits a two-factor verification code and, on success, completes the
    /// pending login with the cached credential.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAuthenticated`] when no two-factor login is
    /// pending; otherwise the mapped status or transport error.
    pub fn verify_code(&self, code: &str) -> Result<Identity> {
        let (username, credential) = self.pending_credential()?;
        let params = vec![
            param("authenticate", "1"),
            param("name", &username),
            param("code", code),
            param("appid", APP_ID),
        ];
        let text = self
            .transport
            .get("authentication.php", &params, LOGIN_TIMEOUT)?;
        let response = RawResponse::parse(&text)?;
        eltenlink_wire::decode_status(&response)?;
        self.login(&username, &credential)
    }

    /// Asks the server to re-send the two-factor code over SMS.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAuthenticated`] when no two-factor login is
    /// pending; otherwise the mapped status or transport error.
    pub fn resend_sms_code(&self) -> Result<()> {
        let (username, credential) = self.pending_credential()?;
        match self.login_request(&username, &credential, Some("phone")) {
            // The replayed login normally reports two-factor still pending.
            Err(Error::Wire(WireError::Protocol {
                code: status::TWO_FACTOR_REQUIRED,
                ..
            })) => Ok(()),
            Ok((identity, token)) => {
                self.install(identity, credential, token);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Enters the logged-in state from a previously saved identity and
    /// token, without a fresh login.
    ///
    /// The token may be arbitrarily old; the next authenticated request
    /// probes it and refreshes with `credential` when the probe fails.
    pub fn restore(&self, identity: Identity, credential: impl Into<String>, token: Token) {
        tracing::info!(username = %identity.username, "session restored");
        self.install(identity, credential.into(), token);
    }

    /// Logs out, clearing username, credential, and token wholesale.
    pub fn logout(&self) {
        *self.write_state() = SessionState::LoggedOut;
        self.token_generation.fetch_add(1, Ordering::AcqRel);
        tracing::info!("logged out");
    }

    /// Authentication query parameters (`name`, `token`) for the current
    /// session. The session injects these itself so endpoint code never
    /// handles the token.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAuthenticated`] when not logged in.
    pub fn auth_params(&self) -> Result<Vec<(String, String)>> {
        match &*self.read_state() {
            SessionState::LoggedIn {
                identity, token, ..
            } => Ok(vec![
                param("name", &identity.username),
                param("token", &token.value),
            ]),
            _ => Err(SessionError::NotAuthenticated.into()),
        }
    }

    /// Probes the server for token validity. A response that does not decode
    /// to an ok status line counts as a failed probe.
    #[must_use]
    pub fn check_token(&self) -> bool {
        let Ok(params) = self.auth_params() else {
            return false;
        };
        match self.transport.get("header.php", &params, PROBE_TIMEOUT) {
            Ok(text) => {
                let valid = RawResponse::parse(&text)
                    .and_then(|response| eltenlink_wire::status_code(&response))
                    .is_ok_and(|code| code == status::STATUS_OK);
                if valid {
                    self.mark_checked();
                }
                valid
            }
            Err(err) => {
                tracing::debug!(error = %err, "token probe failed");
                false
            }
        }
    }

    /// Ensures the token is usable, probing when the last check is stale and
    /// refreshing when the probe fails.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAuthenticated`] when not logged in,
    /// [`SessionError::RefreshFailed`] when a needed refresh fails.
    pub fn ensure_valid(&self) -> Result<()> {
        let recently_checked = match &*self.read_state() {
            SessionState::LoggedIn { token, .. } => {
                Utc::now().signed_duration_since(token.checked_at)
                    < chrono::Duration::seconds(TOKEN_RECHECK_SECS)
            }
            _ => return Err(SessionError::NotAuthenticated.into()),
        };
        if recently_checked || self.check_token() {
            return Ok(());
        }
        self.refresh()
    }

    /// Re-submits the cached credential to obtain a fresh token.
    ///
    /// Single-flight: concurrent callers that find a refresh already in
    /// progress block until it completes and then share its token instead of
    /// issuing their own re-login.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAuthenticated`] when not logged in,
    /// [`SessionError::RefreshFailed`] when the re-login does not yield a
    /// token.
    pub fn refresh(&self) -> Result<()> {
        let observed = self.token_generation.load(Ordering::Acquire);
        let _gate = self
            .refresh_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.token_generation.load(Ordering::Acquire) != observed {
            // Another caller completed the refresh while we waited.
            return Ok(());
        }

        let (username, credential) = match &*self.read_state() {
            SessionState::LoggedIn {
                identity,
                credential,
                ..
            } => (identity.username.clone(), credential.clone()),
            _ => return Err(SessionError::NotAuthenticated.into()),
        };

        match self.login_request(&username, &credential, None) {
            Ok((identity, token)) => {
                tracing::debug!(username = %identity.username, "token refreshed");
                self.install(identity, credential, token);
                Ok(())
            }
            Err(Error::Wire(WireError::Protocol {
                code: status::TWO_FACTOR_REQUIRED,
                ..
            })) => {
                *self.write_state() = SessionState::TwoFactorPending {
                    username,
                    credential,
                };
                Err(SessionError::RefreshFailed.into())
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed");
                Err(SessionError::RefreshFailed.into())
            }
        }
    }

    /// Replaces the cached credential after a successful password change.
    pub(crate) fn update_credential(&self, new_credential: &str) {
        if let SessionState::LoggedIn { credential, .. } = &mut *self.write_state() {
            *credential = new_credential.to_owned();
        }
    }

    fn pending_credential(&self) -> Result<(String, String)> {
        match &*self.read_state() {
            SessionState::TwoFactorPending {
                username,
                credential,
            } => Ok((username.clone(), credential.clone())),
            _ => Err(SessionError::NotAuthenticated.into()),
        }
    }

    fn install(&self, identity: Identity, credential: String, token: Token) {
        *self.write_state() = SessionState::LoggedIn {
            identity,
            credential,
            token,
        };
        self.token_generation.fetch_add(1, Ordering::AcqRel);
    }

    fn mark_checked(&self) {
        if let SessionState::LoggedIn { token, .. } = &mut *self.write_state() {
            token.checked_at = Utc::now();
        }
    }

    /// Issues the login request and parses the identity block. Does not
    /// touch session state; callers decide the transition.
    fn login_request(
        &self,
        username: &str,
        password: &str,
        auth_method: Option<&str>,
    ) -> Result<(Identity, Token)> {
        let mut params = vec![
            param("login", "1"),
            param("name", username),
            param("password", password),
            param("version", APP_VERSION),
            param("appid", APP_ID),
            param("submitautologin", "1"),
            param("computer", computer_name()),
            param("output", "1"),
        ];
        if let Some(method) = auth_method {
            params.push(param("authmethod", method));
        }

        let text = self.transport.get("login.php", &params, LOGIN_TIMEOUT)?;
        let response = RawResponse::parse(&text)?;
        match eltenlink_wire::status_code(&response)? {
            status::STATUS_OK => {}
            code => return Err(eltenlink_wire::error_for(code).into()),
        }

        let token_value = response.field(2);
        if token_value.is_empty() {
            return Err(
                WireError::MalformedResponse("login response missing token".to_owned()).into(),
            );
        }

        let reported = response.field(1);
        let identity = Identity {
            username: if reported.is_empty() {
                username.to_owned()
            } else {
                reported.to_owned()
            },
            moderator: response.field(3) == "1",
            full_name: response.field(4).to_owned(),
            gender: response.int(5),
            languages: response.field(6).to_owned(),
            greeting: response.field(7).to_owned(),
        };
        Ok((identity, Token::new(token_value)))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &*self.read_state())
            .finish_non_exhaustive()
    }
}

/// Machine name sent with the auto-login parameter, matching what the
/// desktop client reports.
fn computer_name() -> String {
    std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| APP_ID.to_owned())
}

//! Account management: registration, credentials, settings, blacklist,
//! login history, two-factor administration, and mail event reporting.

use chrono::{DateTime, TimeZone, Utc};
use eltenlink_wire::status;

use crate::api::{Outcome, degrade, name_list, outcome};
use crate::engine::{DEFAULT_TIMEOUT, RequestEngine};
use crate::error::Result;
use crate::multipart::MultipartBody;
use crate::transport::param;

/// One remembered auto-login token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoLogin {
    /// When the token was issued.
    pub issued_at: Option<DateTime<Utc>>,
    /// Client IP address at issue time.
    pub ip: String,
    /// Token generation tag.
    pub generation: String,
}

/// One entry of the login history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRecord {
    /// When the login happened.
    pub at: Option<DateTime<Utc>>,
    /// Client IP address.
    pub ip: String,
}

/// State of the mail event reporting feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MailEventsState {
    /// Whether the address is verified.
    pub verified: bool,
    /// Whether reporting is enabled.
    pub enabled: bool,
}

/// Account facade.
#[derive(Debug)]
pub struct AccountApi<'a> {
    engine: &'a RequestEngine,
}

impl<'a> AccountApi<'a> {
    pub(crate) fn new(engine: &'a RequestEngine) -> Self {
        Self { engine }
    }

    /// Registers a new account. Does not require a session.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or wire failures; server rejections are reported
    /// inside the [`Outcome`].
    pub fn register(&self, username: &str, password: &str, email: &str) -> Result<Outcome> {
        let params = vec![
            param("register", "1"),
            param("name", username),
            param("password", password),
            param("mail", email),
        ];
        outcome(
            self.engine
                .get_public("register.php", &params, DEFAULT_TIMEOUT),
            "account created",
            &[(
                status::INVALID_CREDENTIALS,
                "username already exists or is invalid",
            )],
        )
    }

    /// Reads the account's e-mail address.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty string.
    pub fn email(&self) -> Result<String> {
        degrade(
            "account.php",
            self.engine
                .get("account.php", &[], DEFAULT_TIMEOUT)
                .map(|response| response.field(1).to_owned()),
        )
    }

    /// Changes the password. On success the session's cached credential is
    /// updated so later token refreshes keep working.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures; server rejections are
    /// reported inside the [`Outcome`].
    pub fn change_password(&self, old: &str, new: &str) -> Result<Outcome> {
        let params = vec![
            param("changepassword", "1"),
            param("oldpassword", old),
            param("password", new),
        ];
        let result = outcome(
            self.engine.get("account_mod.php", &params, DEFAULT_TIMEOUT),
            "password changed",
            &[(status::OLD_PASSWORD_INCORRECT, "incorrect old password")],
        )?;
        if result.success {
            self.engine.session().update_credential(new);
        }
        Ok(result)
    }

    /// Changes the account e-mail address.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures; server rejections are
    /// reported inside the [`Outcome`].
    pub fn change_email(&self, email: &str, password: &str) -> Result<Outcome> {
        let params = vec![
            param("changemail", "1"),
            param("oldpassword", password),
            param("mail", email),
        ];
        outcome(
            self.engine.get("account_mod.php", &params, DEFAULT_TIMEOUT),
            "email changed",
            &[
                (status::OLD_PASSWORD_INCORRECT, "incorrect password"),
                (status::EMAIL_CHANGE_DISALLOWED, "email change not allowed"),
            ],
        )
    }

    /// Archives the account.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures; server rejections are
    /// reported inside the [`Outcome`].
    pub fn archive(&self, password: &str) -> Result<Outcome> {
        let params = vec![param("oldpassword", password), param("archive", "1")];
        outcome(
            self.engine.get("account_mod.php", &params, DEFAULT_TIMEOUT),
            "account archived",
            &[(status::OLD_PASSWORD_INCORRECT, "incorrect password")],
        )
    }

    /// Fetches the server-stored settings document.
    ///
    /// # Errors
    ///
    /// Session, transport, wire, or JSON parse failures.
    pub fn settings(&self) -> Result<serde_json::Value> {
        let params = vec![param("ac", "get")];
        let response = self.engine.get("account.php", &params, DEFAULT_TIMEOUT)?;
        serde_json::from_str(response.field(1)).map_err(|e| {
            eltenlink_wire::WireError::MalformedResponse(format!("settings document: {e}")).into()
        })
    }

    /// Stores the settings document on the server.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn save_settings(&self, settings: &serde_json::Value) -> Result<()> {
        let params = vec![param("ac", "set")];
        let body = MultipartBody::new().field("js", settings.to_string());
        self.engine
            .post("account.php", &params, &body, DEFAULT_TIMEOUT)
            .map(|_| ())
    }

    /// Lists blacklisted users.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn blacklist(&self) -> Result<Vec<String>> {
        let params = vec![param("get", "1")];
        degrade(
            "blacklist.php",
            self.engine
                .get("blacklist.php", &params, DEFAULT_TIMEOUT)
                .map(|response| name_list(&response)),
        )
    }

    /// Adds `user` to the blacklist.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures; server rejections are
    /// reported inside the [`Outcome`].
    pub fn blacklist_add(&self, user: &str) -> Result<Outcome> {
        let params = vec![param("add", "1"), param("user", user)];
        outcome(
            self.engine.get("blacklist.php", &params, DEFAULT_TIMEOUT),
            "user added to blacklist",
            &[
                (
                    status::PERMISSION_DENIED,
                    "administrators cannot be blacklisted",
                ),
                (status::NOT_FOUND, "user is already on the blacklist"),
                (status::TWO_FACTOR_REQUIRED, "user not found"),
            ],
        )
    }

    /// Removes `user` from the blacklist.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures; server rejections are
    /// reported inside the [`Outcome`].
    pub fn blacklist_remove(&self, user: &str) -> Result<Outcome> {
        let params = vec![param("del", "1"), param("user", user)];
        outcome(
            self.engine.get("blacklist.php", &params, DEFAULT_TIMEOUT),
            "user removed from blacklist",
            &[],
        )
    }

    /// Lists remembered auto-login tokens. Requires the password again.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn auto_logins(&self, password: &str) -> Result<Vec<AutoLogin>> {
        degrade("autologins.php", self.try_auto_logins(password))
    }

    fn try_auto_logins(&self, password: &str) -> Result<Vec<AutoLogin>> {
        let params = vec![param("password", password)];
        let response = self.engine.get("autologins.php", &params, DEFAULT_TIMEOUT)?;
        // Triples of timestamp, ip, generation after the status line.
        Ok(response
            .lines_from(1)
            .chunks_exact(3)
            .map(|chunk| AutoLogin {
                issued_at: timestamp(chunk[0].trim()),
                ip: chunk[1].trim().to_owned(),
                generation: chunk[2].trim().to_owned(),
            })
            .collect())
    }

    /// Lists the recent login history. Requires the password again.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn last_logins(&self, password: &str) -> Result<Vec<LoginRecord>> {
        degrade("lastlogins.php", self.try_last_logins(password))
    }

    fn try_last_logins(&self, password: &str) -> Result<Vec<LoginRecord>> {
        let params = vec![param("password", password)];
        let response = self.engine.get("lastlogins.php", &params, DEFAULT_TIMEOUT)?;
        Ok(response
            .lines_from(1)
            .chunks_exact(2)
            .map(|chunk| LoginRecord {
                at: timestamp(chunk[0].trim()),
                ip: chunk[1].trim().to_owned(),
            })
            .collect())
    }

    /// Invalidates every session of the account.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn global_logout(&self, password: &str) -> Result<()> {
        let params = vec![param("global", "1"), param("password", password)];
        self.engine
            .get("logout.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }

    /// Whether two-factor authentication is enabled.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors.
    pub fn two_factor_enabled(&self) -> Result<bool> {
        let params = vec![param("state", "1")];
        let response = self
            .engine
            .get("authentication.php", &params, DEFAULT_TIMEOUT)?;
        Ok(response.int(1) > 0)
    }

    /// Enables two-factor authentication via SMS to `phone`.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures; server rejections are
    /// reported inside the [`Outcome`].
    pub fn enable_two_factor(&self, password: &str, phone: &str, lang: &str) -> Result<Outcome> {
        let params = vec![
            param("password", password),
            param("phone", phone),
            param("enable", "1"),
            param("lang", lang),
        ];
        outcome(
            self.engine
                .get("authentication.php", &params, DEFAULT_TIMEOUT),
            "two-factor authentication enabled",
            &[(status::INVALID_CREDENTIALS, "invalid password")],
        )
    }

    /// Disables two-factor authentication.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures; server rejections are
    /// reported inside the [`Outcome`].
    pub fn disable_two_factor(&self, password: &str) -> Result<Outcome> {
        let params = vec![param("password", password), param("disable", "1")];
        outcome(
            self.engine
                .get("authentication.php", &params, DEFAULT_TIMEOUT),
            "two-factor authentication disabled",
            &[(status::INVALID_CREDENTIALS, "invalid password")],
        )
    }

    /// Generates fresh two-factor backup codes.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn backup_codes(&self, password: &str) -> Result<Vec<String>> {
        let params = vec![param("password", password), param("generatebackup", "1")];
        let response = self
            .engine
            .get("authentication.php", &params, DEFAULT_TIMEOUT)?;
        Ok(name_list(&response))
    }

    /// Reads the mail event reporting state.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors.
    pub fn mail_events_state(&self, password: &str) -> Result<MailEventsState> {
        let params = vec![param("password", password), param("ac", "check")];
        let response = self.engine.get("mailevents.php", &params, DEFAULT_TIMEOUT)?;
        Ok(MailEventsState {
            verified: response.int(1) > 0,
            enabled: response.int(2) > 0,
        })
    }

    /// Requests a mail event verification code.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn request_mail_events_code(&self, password: &str) -> Result<()> {
        let params = vec![param("password", password), param("ac", "verify")];
        self.engine
            .get("mailevents.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }

    /// Submits a mail event verification code.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn verify_mail_events_code(&self, password: &str, code: &str) -> Result<()> {
        let params = vec![
            param("password", password),
            param("ac", "verify"),
            param("code", code),
        ];
        self.engine
            .get("mailevents.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }

    /// Enables or disables mail event reporting.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn set_mail_events(&self, password: &str, enable: bool, code: Option<&str>) -> Result<()> {
        let mut params = vec![
            param("password", password),
            param("ac", "events"),
            param("enable", if enable { "1" } else { "0" }),
        ];
        if let Some(code) = code {
            params.push(param("code", code));
        }
        self.engine
            .get("mailevents.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }
}

fn timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let seconds = eltenlink_wire::parse_int(raw);
    Utc.timestamp_opt(seconds, 0).single()
}

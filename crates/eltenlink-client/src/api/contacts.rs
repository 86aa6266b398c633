//! Contact list management.

use eltenlink_wire::status;

use crate::api::{Outcome, degrade, name_list, outcome};
use crate::engine::{DEFAULT_TIMEOUT, RequestEngine};
use crate::error::Result;
use crate::transport::param;

/// Contacts facade.
#[derive(Debug)]
pub struct ContactsApi<'a> {
    engine: &'a RequestEngine,
}

impl<'a> ContactsApi<'a> {
    pub(crate) fn new(engine: &'a RequestEngine) -> Self {
        Self { engine }
    }

    /// Lists contact usernames.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn list(&self) -> Result<Vec<String>> {
        degrade(
            "contacts.php",
            self.engine
                .get("contacts.php", &[], DEFAULT_TIMEOUT)
                .map(|response| name_list(&response)),
        )
    }

    /// Lists users who recently added this account to their contacts.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn added_me(&self) -> Result<Vec<String>> {
        let params = vec![param("new", "1")];
        degrade(
            "contacts_addedme.php",
            self.engine
                .get("contacts_addedme.php", &params, DEFAULT_TIMEOUT)
                .map(|response| name_list(&response)),
        )
    }

    /// Adds `username` to the contact list.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures; server rejections are
    /// reported inside the [`Outcome`].
    pub fn add(&self, username: &str) -> Result<Outcome> {
        let params = vec![param("insert", "1"), param("searchname", username)];
        outcome(
            self.engine.get("contacts_mod.php", &params, DEFAULT_TIMEOUT),
            "contact added",
            &[(status::PERMISSION_DENIED, "already in contacts")],
        )
    }

    /// Removes `username` from the contact list.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures; server rejections are
    /// reported inside the [`Outcome`].
    pub fn remove(&self, username: &str) -> Result<Outcome> {
        let params = vec![param("delete", "1"), param("searchname", username)];
        outcome(
            self.engine.get("contacts_mod.php", &params, DEFAULT_TIMEOUT),
            "contact removed",
            &[],
        )
    }
}

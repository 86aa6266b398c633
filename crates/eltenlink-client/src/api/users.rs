//! User lookup: profiles, presence, search, status lines, and the
//! notification counters.

use crate::api::contacts::ContactsApi;
use crate::api::messages::MessagesApi;
use crate::api::{degrade, name_list};
use crate::engine::{DEFAULT_TIMEOUT, RequestEngine};
use crate::error::Result;
use crate::transport::param;

/// Public profile of a user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Profile {
    /// Username the profile was requested for.
    pub username: String,
    /// Last-seen timestamp, as sent.
    pub last_seen: String,
    /// Whether the user has a blog.
    pub has_blog: bool,
    /// Number of contacts.
    pub contacts: i64,
    /// Number of users who list this user as a contact.
    pub known_by: i64,
    /// Client version the user last connected with.
    pub client_version: String,
    /// Registration date, as sent.
    pub registered: String,
    /// Number of forum posts.
    pub forum_posts: i64,
    /// Whether the user is in this account's contacts.
    pub in_contacts: bool,
    /// Whether the account is banned.
    pub banned: bool,
    /// Whether the account is a guest account.
    pub guest: bool,
}

/// Unread counters reported by the notification endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Notifications {
    /// Unread private messages.
    pub messages: i64,
    /// New posts in followed threads.
    pub followed_threads: i64,
    /// New posts in followed blogs.
    pub followed_blogs: i64,
    /// New comments on own blog.
    pub blog_comments: i64,
    /// New threads in followed forums.
    pub followed_forums: i64,
    /// New posts in followed forums.
    pub followed_forum_posts: i64,
    /// New contact requests.
    pub friends: i64,
    /// Contacts with a birthday today.
    pub birthdays: i64,
    /// New mentions.
    pub mentions: i64,
    /// New posts in followed blog posts.
    pub followed_blog_posts: i64,
    /// New blog followers.
    pub blog_followers: i64,
    /// New blog mentions.
    pub blog_mentions: i64,
    /// Pending group invitations.
    pub group_invitations: i64,
}

/// User facade.
#[derive(Debug)]
pub struct UsersApi<'a> {
    engine: &'a RequestEngine,
}

impl<'a> UsersApi<'a> {
    pub(crate) fn new(engine: &'a RequestEngine) -> Self {
        Self { engine }
    }

    /// Lists users currently online.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn online(&self) -> Result<Vec<String>> {
        degrade(
            "online.php",
            self.engine
                .get("online.php", &[], DEFAULT_TIMEOUT)
                .map(|response| name_list(&response)),
        )
    }

    /// Fetches the public profile of `username`.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield a default profile.
    pub fn profile(&self, username: &str) -> Result<Profile> {
        degrade("userinfo.php", self.try_profile(username))
    }

    fn try_profile(&self, username: &str) -> Result<Profile> {
        let params = vec![param("searchname", username)];
        let response = self.engine.get("userinfo.php", &params, DEFAULT_TIMEOUT)?;
        Ok(Profile {
            username: username.to_owned(),
            last_seen: response.field(1).to_owned(),
            has_blog: response.field(2) == "1",
            contacts: response.int(3),
            known_by: response.int(4),
            client_version: response.field(5).to_owned(),
            registered: response.field(6).to_owned(),
            forum_posts: response.int(8),
            in_contacts: response.field(9) == "1",
            banned: response.field(11) == "1",
            guest: response.field(13) == "1",
        })
    }

    /// Whether `username` exists.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors.
    pub fn exists(&self, username: &str) -> Result<bool> {
        let params = vec![param("searchname", username)];
        let response = self.engine.get("user_exist.php", &params, DEFAULT_TIMEOUT)?;
        Ok(response.field(1) == "1")
    }

    /// Searches usernames matching `query`.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn search(&self, query: &str) -> Result<Vec<String>> {
        degrade("user_search.php", self.try_search(query))
    }

    fn try_search(&self, query: &str) -> Result<Vec<String>> {
        let params = vec![param("search", query)];
        let response = self.engine.get("user_search.php", &params, DEFAULT_TIMEOUT)?;
        let count = usize::try_from(response.int(1)).unwrap_or(0);
        Ok(response
            .lines_from(2)
            .iter()
            .take(count)
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect())
    }

    /// Reads the status line of `username`.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty string.
    pub fn status(&self, username: &str) -> Result<String> {
        let params = vec![param("searchname", username)];
        degrade(
            "status.php",
            self.engine
                .get("status.php", &params, DEFAULT_TIMEOUT)
                .map(|response| response.field(1).to_owned()),
        )
    }

    /// Sets this account's status line.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn set_status(&self, text: &str) -> Result<()> {
        let params = vec![param("text", text)];
        self.engine
            .get("status_mod.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }

    /// Reads the unread-notification counters.
    ///
    /// When the summary endpoint fails, the message and contact-request
    /// counters are rebuilt from their own listings; the remaining counters
    /// stay zero until the summary recovers.
    ///
    /// # Errors
    ///
    /// Only authentication failures.
    pub fn notifications(&self) -> Result<Notifications> {
        match self.try_notifications() {
            Ok(counters) => Ok(counters),
            Err(err) if err.is_authentication() => Err(err),
            Err(err) => {
                tracing::debug!(
                    endpoint = "agent.php",
                    error = %err,
                    "counter summary failed, querying listings individually"
                );
                self.fallback_counters()
            }
        }
    }

    fn fallback_counters(&self) -> Result<Notifications> {
        let unread = MessagesApi::new(self.engine).unread()?;
        let added_me = ContactsApi::new(self.engine).added_me()?;
        Ok(Notifications {
            messages: i64::try_from(unread.len()).unwrap_or(0),
            friends: i64::try_from(added_me.len()).unwrap_or(0),
            ..Notifications::default()
        })
    }

    fn try_notifications(&self) -> Result<Notifications> {
        let params = vec![param("client", "1")];
        let response = self.engine.get("agent.php", &params, DEFAULT_TIMEOUT)?;
        // Lines 1..=7 carry timestamp, version and identity echoes; the
        // counters start at line 8.
        Ok(Notifications {
            messages: response.int(8),
            followed_threads: response.int(9),
            followed_blogs: response.int(10),
            blog_comments: response.int(11),
            followed_forums: response.int(12),
            followed_forum_posts: response.int(13),
            friends: response.int(14),
            birthdays: response.int(15),
            mentions: response.int(16),
            followed_blog_posts: response.int(17),
            blog_followers: response.int(18),
            blog_mentions: response.int(19),
            group_invitations: response.int(20),
        })
    }
}

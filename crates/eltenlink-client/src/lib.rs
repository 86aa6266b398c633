//! # eltenlink-client
//!
//! Session management, request engine, and typed endpoint API for the
//! `EltenLink` social network.
//!
//! The crate layers three concerns:
//!
//! - [`Session`]: owns the identity, credential, and short-lived token, and
//!   performs single-flight token refresh so concurrent callers never race
//!   to re-login
//! - [`RequestEngine`]: issues authenticated requests, decodes the status
//!   line, and on a rejected token refreshes the session and retries the
//!   request exactly once
//! - endpoint facades under [`api`]: typed wrappers over each functional
//!   area, decoding payloads with [`eltenlink_wire`]
//!
//! HTTP sits behind the [`Transport`] trait; tests substitute their own
//! implementation.
//!
//! ## Quick start
//!
//! ```no_run
//! use eltenlink_client::{Client, Result};
//!
//! fn main() -> Result<()> {
//!     let client = Client::new()?;
//!     client.session().login("alice", "secret")?;
//!     for conversation in client.messages().conversations()? {
//!         println!("{}: {}", conversation.user, conversation.subject);
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

pub mod api;
mod engine;
mod error;
mod multipart;
mod pagination;
mod session;
mod transport;

use std::sync::Arc;

pub use engine::{DEFAULT_TIMEOUT, RequestEngine, UPLOAD_TIMEOUT};
pub use error::{Error, Result, SessionError};
pub use multipart::MultipartBody;
pub use pagination::PaginationCursor;
pub use session::{APP_ID, Identity, Session, Token};
pub use transport::{APP_VERSION, BASE_URL, HttpTransport, Params, Transport, param};

use api::account::AccountApi;
use api::blog::BlogApi;
use api::contacts::ContactsApi;
use api::feed::FeedApi;
use api::forum::ForumApi;
use api::messages::MessagesApi;
use api::users::UsersApi;

/// A connected client: one session plus the endpoint facades.
#[derive(Debug)]
pub struct Client {
    session: Arc<Session>,
    engine: RequestEngine,
}

impl Client {
    /// Creates a client against the production server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new()?)))
    }

    /// Creates a client over a custom transport.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        let session = Arc::new(Session::new(Arc::clone(&transport)));
        let engine = RequestEngine::new(transport, Arc::clone(&session));
        Self { session, engine }
    }

    /// The session, for login, logout, and token management.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The request engine, for callers issuing raw endpoint requests.
    #[must_use]
    pub fn engine(&self) -> &RequestEngine {
        &self.engine
    }

    /// Private messages.
    #[must_use]
    pub fn messages(&self) -> MessagesApi<'_> {
        MessagesApi::new(&self.engine)
    }

    /// Contact list.
    #[must_use]
    pub fn contacts(&self) -> ContactsApi<'_> {
        ContactsApi::new(&self.engine)
    }

    /// User lookup and notifications.
    #[must_use]
    pub fn users(&self) -> UsersApi<'_> {
        UsersApi::new(&self.engine)
    }

    /// Discussion board.
    #[must_use]
    pub fn forum(&self) -> ForumApi<'_> {
        ForumApi::new(&self.engine)
    }

    /// Blogs.
    #[must_use]
    pub fn blog(&self) -> BlogApi<'_> {
        BlogApi::new(&self.engine)
    }

    /// The feed.
    #[must_use]
    pub fn feed(&self) -> FeedApi<'_> {
        FeedApi::new(&self.engine)
    }

    /// Account management.
    #[must_use]
    pub fn account(&self) -> AccountApi<'_> {
        AccountApi::new(&self.engine)
    }
}

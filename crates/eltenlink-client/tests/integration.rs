//! End-to-end tests over a scripted transport: login flows, token refresh,
//! retry behavior, and payload decoding.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use eltenlink_client::api::blog::BlogCategory;
use eltenlink_client::{
    Client, Error, Identity, MultipartBody, PaginationCursor, Result, SessionError, Token,
    Transport,
};

type Handler = Box<dyn Fn(&[(String, String)]) -> Result<String> + Send + Sync>;

/// Scripted transport: one handler per endpoint, plus a call log.
#[derive(Default)]
struct MockTransport {
    handlers: Mutex<HashMap<String, Handler>>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn on<F>(self: &Arc<Self>, endpoint: &str, handler: F)
    where
        F: Fn(&[(String, String)]) -> Result<String> + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap()
            .insert(endpoint.to_owned(), Box::new(handler));
    }

    fn calls_to(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.as_str() == endpoint)
            .count()
    }

    fn dispatch(&self, endpoint: &str, params: &[(String, String)]) -> Result<String> {
        self.calls.lock().unwrap().push(endpoint.to_owned());
        let handlers = self.handlers.lock().unwrap();
        match handlers.get(endpoint) {
            Some(handler) => handler(params),
            None => Err(Error::Transport(format!("unscripted endpoint {endpoint}"))),
        }
    }
}

impl Transport for MockTransport {
    fn get(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        _timeout: Duration,
    ) -> Result<String> {
        self.dispatch(endpoint, params)
    }

    fn post(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        _body: &MultipartBody,
        _timeout: Duration,
    ) -> Result<String> {
        self.dispatch(endpoint, params)
    }
}

fn wire(lines: &[&str]) -> Result<String> {
    Ok(lines.join("\r\n"))
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn login_ok(token: &str) -> Result<String> {
    wire(&[
        "0", "Alice", token, "0", "Alice W", "1", "pl,en", "welcome back",
    ])
}

/// A token whose last validity check is well outside the recheck window.
fn stale_token(value: &str) -> Token {
    let past = chrono::Utc::now() - chrono::Duration::minutes(10);
    Token {
        value: value.to_owned(),
        issued_at: past,
        checked_at: past,
    }
}

fn restored_identity() -> Identity {
    Identity {
        username: "Alice".to_owned(),
        moderator: false,
        full_name: "Alice W".to_owned(),
        gender: 1,
        languages: "pl,en".to_owned(),
        greeting: String::new(),
    }
}

/// A client whose login endpoint always succeeds with `tok1`.
fn logged_in_client() -> (Client, Arc<MockTransport>) {
    let transport = MockTransport::new();
    transport.on("login.php", |_| login_ok("tok1"));
    let client = Client::with_transport(transport.clone());
    client.session().login("alice", "secret").unwrap();
    (client, transport)
}

#[test]
fn test_login_parses_identity_block() {
    let (client, _) = logged_in_client();
    let identity = client.session().identity().unwrap();
    assert_eq!(identity.username, "Alice");
    assert!(!identity.moderator);
    assert_eq!(identity.full_name, "Alice W");
    assert_eq!(identity.gender, 1);
    assert_eq!(identity.languages, "pl,en");
    assert_eq!(identity.greeting, "welcome back");
    assert_eq!(client.session().token().unwrap().value, "tok1");
}

#[test]
fn test_login_failure_reports_meaning_and_stays_logged_out() {
    let transport = MockTransport::new();
    transport.on("login.php", |_| wire(&["-2"]));
    let client = Client::with_transport(transport);

    let err = client.session().login("alice", "wrong").unwrap_err();
    assert_eq!(
        err.to_string(),
        "server error -2: invalid username or password"
    );
    assert!(!client.session().is_logged_in());
}

#[test]
fn test_two_factor_login_completes_after_code() {
    let transport = MockTransport::new();
    let verified = Arc::new(AtomicUsize::new(0));
    let verified_login = verified.clone();
    transport.on("login.php", move |_| {
        if verified_login.load(Ordering::SeqCst) == 0 {
            wire(&["-5"])
        } else {
            login_ok("tok1")
        }
    });
    let verified_auth = verified.clone();
    transport.on("authentication.php", move |params| {
        assert_eq!(param(params, "code"), Some("123456"));
        verified_auth.store(1, Ordering::SeqCst);
        wire(&["0"])
    });
    let client = Client::with_transport(transport);

    let err = client.session().login("alice", "secret").unwrap_err();
    assert_eq!(err, Error::Session(SessionError::TwoFactorRequired));
    assert!(!client.session().is_logged_in());

    let identity = client.session().verify_code("123456").unwrap();
    assert_eq!(identity.username, "Alice");
    assert!(client.session().is_logged_in());
}

#[test]
fn test_rejected_token_is_refreshed_and_retried_once() {
    let transport = MockTransport::new();
    let logins = Arc::new(AtomicUsize::new(0));
    let logins_handler = logins.clone();
    transport.on("login.php", move |_| {
        let n = logins_handler.fetch_add(1, Ordering::SeqCst);
        login_ok(if n == 0 { "tok1" } else { "tok2" })
    });
    // The server accepts only the refreshed token.
    transport.on("contacts.php", |params| {
        if param(params, "token") == Some("tok2") {
            wire(&["0", "bob", "carol"])
        } else {
            wire(&["-2"])
        }
    });
    let client = Client::with_transport(transport.clone());
    client.session().login("alice", "secret").unwrap();

    let contacts = client.contacts().list().unwrap();
    assert_eq!(contacts, vec!["bob", "carol"]);
    assert_eq!(transport.calls_to("contacts.php"), 2);
    assert_eq!(transport.calls_to("login.php"), 2);
    assert_eq!(client.session().token().unwrap().value, "tok2");
}

#[test]
fn test_rejection_after_refresh_is_not_retried_again() {
    let (client, transport) = logged_in_client();
    transport.on("contacts.php", |_| wire(&["-2"]));

    let err = client.contacts().list().unwrap_err();
    assert!(err.is_authentication());
    // One original attempt, one retry, no third.
    assert_eq!(transport.calls_to("contacts.php"), 2);
    assert_eq!(transport.calls_to("login.php"), 2);
}

#[test]
fn test_stale_token_is_probed_before_request() {
    let transport = MockTransport::new();
    transport.on("header.php", |params| {
        assert_eq!(param(params, "token"), Some("tok1"));
        wire(&["0"])
    });
    transport.on("contacts.php", |_| wire(&["0", "bob"]));
    let client = Client::with_transport(transport.clone());
    client
        .session()
        .restore(restored_identity(), "secret", stale_token("tok1"));

    assert_eq!(client.contacts().list().unwrap(), vec!["bob"]);
    assert_eq!(transport.calls_to("header.php"), 1);
    assert_eq!(transport.calls_to("login.php"), 0);

    // The successful probe refreshes the check timestamp, so a second
    // request goes straight through.
    client.contacts().list().unwrap();
    assert_eq!(transport.calls_to("header.php"), 1);
    assert_eq!(transport.calls_to("contacts.php"), 2);
}

#[test]
fn test_failed_probe_refreshes_before_request() {
    let transport = MockTransport::new();
    transport.on("header.php", |_| wire(&["-2"]));
    transport.on("login.php", |_| login_ok("tok2"));
    transport.on("contacts.php", |params| {
        assert_eq!(param(params, "token"), Some("tok2"));
        wire(&["0", "carol"])
    });
    let client = Client::with_transport(transport.clone());
    client
        .session()
        .restore(restored_identity(), "secret", stale_token("tok1"));

    assert_eq!(client.contacts().list().unwrap(), vec!["carol"]);
    assert_eq!(transport.calls_to("login.php"), 1);
    // The stale token was replaced before the endpoint ever saw it.
    assert_eq!(transport.calls_to("contacts.php"), 1);
}

#[test]
fn test_garbled_probe_counts_as_invalid() {
    let transport = MockTransport::new();
    transport.on("header.php", |_| Ok("<html>Service restarting</html>".to_owned()));
    transport.on("login.php", |_| login_ok("tok2"));
    transport.on("contacts.php", |params| {
        assert_eq!(param(params, "token"), Some("tok2"));
        wire(&["0", "dave"])
    });
    let client = Client::with_transport(transport.clone());
    client
        .session()
        .restore(restored_identity(), "secret", stale_token("tok1"));

    assert_eq!(client.contacts().list().unwrap(), vec!["dave"]);
    assert_eq!(transport.calls_to("login.php"), 1);
}

#[test]
fn test_concurrent_refreshes_single_flight() {
    let (client, transport) = logged_in_client();
    // Re-script login with a delay so every thread observes the refresh
    // in progress rather than its result.
    transport.on("login.php", |_| {
        thread::sleep(Duration::from_millis(100));
        login_ok("tok2")
    });

    let workers = 8;
    let barrier = Arc::new(Barrier::new(workers));
    let mut handles = Vec::new();
    for _ in 0..workers {
        let session = Arc::clone(client.session());
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            session.refresh()
        }));
    }
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    // Initial login plus exactly one shared refresh.
    assert_eq!(transport.calls_to("login.php"), 2);
    assert_eq!(client.session().token().unwrap().value, "tok2");
}

#[test]
fn test_logout_drops_token_and_blocks_requests() {
    let (client, _) = logged_in_client();
    client.session().logout();
    assert!(client.session().token().is_none());

    let err = client.contacts().list().unwrap_err();
    assert_eq!(err, Error::Session(SessionError::NotAuthenticated));
}

#[test]
fn test_read_degrades_to_empty_on_server_error() {
    let (client, transport) = logged_in_client();
    transport.on("contacts.php", |_| wire(&["-1"]));
    assert_eq!(client.contacts().list().unwrap(), Vec::<String>::new());

    transport.on("online.php", |_| Err(Error::Timeout));
    assert_eq!(client.users().online().unwrap(), Vec::<String>::new());
}

#[test]
fn test_timeout_is_distinct_and_not_retried() {
    let (client, transport) = logged_in_client();
    transport.on("messages.php", |_| Err(Error::Timeout));

    let err = client.messages().delete(7).unwrap_err();
    assert_eq!(err, Error::Timeout);
    assert_eq!(transport.calls_to("messages.php"), 1);
}

#[test]
fn test_conversations_listing_decodes_fixed_records() {
    let (client, transport) = logged_in_client();
    transport.on("messages_conversations.php", |_| {
        wire(&[
            "0", "2", "0", // status, count, has_more
            "bob", "alice", "2026-01-05", "hello", "1", "101", "0", "Bob B", "carol", "carol",
            "2026-01-06", "plans", "0", "102", "1", "Carol C",
        ])
    });

    let conversations = client.messages().conversations().unwrap();
    assert_eq!(conversations.len(), 2);
    assert_eq!(conversations[0].user, "bob");
    assert!(conversations[0].read);
    assert_eq!(conversations[0].id, 101);
    assert!(!conversations[0].muted);
    assert_eq!(conversations[1].display_name, "Carol C");
    assert!(conversations[1].muted);
}

#[test]
fn test_thread_messages_decode_sentinel_blocks() {
    let (client, transport) = logged_in_client();
    transport.on("messages_conversations.php", |params| {
        assert_eq!(param(params, "subj"), Some("hello"));
        wire(&[
            "0",
            "1",
            "0",
            "1",
            "bob",
            "101",
            "bob",
            "hello",
            "2026-01-05",
            "1",
            "0",
            "",
            "0",
            "first line\u{4}LINE\u{4}second line",
            "and a third",
            "\u{4}END\u{4}",
        ])
    });

    let messages = client.messages().thread("bob", "hello").unwrap();
    assert_eq!(messages.len(), 1);
    let message = &messages[0];
    assert_eq!(message.id, 101);
    assert_eq!(message.sender, "bob");
    assert!(message.read);
    assert_eq!(message.text, "first line\nsecond line\nand a third");
}

#[test]
fn test_forum_structure_decodes_sections() {
    let (client, transport) = logged_in_client();
    let fingerprint = "f".repeat(40);
    transport.on("forum_struct.php", move |_| {
        let mut lines = vec!["0".to_owned(), fingerprint.clone()];
        for l in [
            "groups", "1", "10", "3", "Readers", "alice", "line one$line two", "pl", "0", "1",
            "2", "5", "40", // one group, ten fields
            "forums", "1", "5", "general_pl", "General", "std", "3", "Anything goes",
            "threads", "1", "9", "9", "hello", "bob", "general_pl", "4", "2", "", "2026-01-05",
            "0",
        ] {
            lines.push(l.to_owned());
        }
        Ok(lines.join("\r\n"))
    });

    let structure = client.forum().structure().unwrap();
    assert_eq!(structure.groups.len(), 1);
    let group = &structure.groups[0];
    assert_eq!(group.id, 3);
    assert_eq!(group.description, "line one\nline two");
    assert_eq!(group.posts, 40);

    assert_eq!(structure.forums[0].id, "general_pl");
    assert_eq!(structure.forums[0].group_id, 3);

    let threads = structure.threads_in("general_pl");
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].author, "bob");
}

#[test]
fn test_thread_posts_pair_content_and_metadata_blocks() {
    let (client, transport) = logged_in_client();
    transport.on("forum_thread.php", |_| {
        wire(&[
            "0",
            "1700000000",
            "2",
            "1",
            "0",
            "11",
            "alice",
            "body \u{4}AUDIO\u{4}clips/a.ogg\u{4}AUDIO\u{4} here",
            "\u{4}END\u{4}",
            "2026-01-05 10:00",
            "0",
            "",
            "1",
            "0",
            "-- alice",
            "\u{4}END\u{4}",
            "12",
            "bob",
            "plain reply",
            "\u{4}END\u{4}",
            "2026-01-05 11:00",
            "0",
            "",
            "0",
            "1",
            "\u{4}END\u{4}",
        ])
    });

    let posts = client.forum().thread_posts(9).unwrap();
    assert_eq!(posts.len(), 2);

    assert_eq!(posts[0].id, 11);
    assert_eq!(posts[0].content, "body  here");
    assert_eq!(
        posts[0].audio_url.as_deref(),
        Some("https://srvapi.elten.link/leg1/clips/a.ogg")
    );
    assert!(posts[0].liked);
    assert_eq!(posts[0].signature, "-- alice");

    assert_eq!(posts[1].author, "bob");
    assert!(posts[1].audio_url.is_none());
    assert!(posts[1].edited);
}

#[test]
fn test_blog_posts_record_pagination() {
    let (client, transport) = logged_in_client();
    transport.on("blog_posts.php", |params| {
        match param(params, "page") {
            Some("1") => wire(&[
                "0", "1", "1", // one post, more pages
                "21", "First", "1", "tech", "0", "2026-01-01", "http://b/1", "alice", "3", "1",
            ]),
            _ => wire(&["0", "0", "0"]),
        }
    });

    let mut cursor = PaginationCursor::new();
    let posts = client.blog().posts("tech", BlogCategory::All, &mut cursor).unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "First");
    assert!(posts[0].followed);
    assert!(cursor.has_more());

    assert_eq!(cursor.advance().unwrap(), 2);
    let posts = client.blog().posts("tech", BlogCategory::All, &mut cursor).unwrap();
    assert!(posts.is_empty());
    assert!(!cursor.has_more());
    assert_eq!(cursor.advance(), Err(Error::NoMorePages));
}

#[test]
fn test_blog_read_falls_back_to_excerpt() {
    let (client, transport) = logged_in_client();
    transport.on("blog_read.php", |_| {
        wire(&[
            "0", "1", "1", "4", "1", // header
            "31", "1", "alice", "2026-01-01", "", "", "short <b>excerpt</b>", "\u{4}END\u{4}",
            "\u{4}END\u{4}",
        ])
    });

    let page = client.blog().read(31, "tech").unwrap();
    assert_eq!(page.comments, 4);
    assert_eq!(page.entries.len(), 1);
    let entry = &page.entries[0];
    assert_eq!(entry.id, 31);
    assert_eq!(entry.excerpt, "short excerpt");
    // Empty content falls back to the excerpt.
    assert_eq!(entry.content, "short excerpt");
}

#[test]
fn test_feed_decodes_straddled_counters() {
    let (client, transport) = logged_in_client();
    transport.on("feeds.php", |_| {
        wire(&[
            "0",
            "2",
            "41",
            "alice",
            "2026-01-05 10:00",
            "first post",
            "\u{4}END\u{4}",
            "0",
            "1",
            "3",
            "1",
            "42",
            "bob",
            "2026-01-05 10:05",
            "a reply",
            "\u{4}END\u{4}",
            "41",
            "0",
            "0",
            "0",
        ])
    });

    let posts = client.feed().posts(None).unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].likes, 3);
    assert!(posts[0].liked);
    assert_eq!(posts[1].response_to, 41);
}

#[test]
fn test_send_message_maps_endpoint_specific_codes() {
    let (client, transport) = logged_in_client();
    transport.on("message_send.php", |_| wire(&["-4"]));

    let out = client.messages().send("ghost", "hi", "anyone there?").unwrap();
    assert!(!out.success);
    assert_eq!(out.message, "user not found");
}

#[test]
fn test_notifications_read_counter_lines() {
    let (client, transport) = logged_in_client();
    transport.on("agent.php", |_| {
        wire(&[
            "0",
            "1700000000",
            "2.5",
            "0",
            "0",
            "Alice W",
            "1",
            "0",
            "3", // messages
            "1",
            "0",
            "2",
            "0",
            "0",
            "1",
            "0",
            "4",
            "0",
            "0",
            "0",
            "0",
        ])
    });

    let counters = client.users().notifications().unwrap();
    assert_eq!(counters.messages, 3);
    assert_eq!(counters.followed_threads, 1);
    assert_eq!(counters.blog_comments, 2);
    assert_eq!(counters.friends, 1);
    assert_eq!(counters.mentions, 4);
}

#[test]
fn test_notifications_fall_back_to_endpoint_counters() {
    let (client, transport) = logged_in_client();
    transport.on("agent.php", |_| wire(&["-1"]));
    transport.on("messages_conversations.php", |params| {
        assert_eq!(param(params, "sp"), Some("new"));
        wire(&[
            "0", "2", "0", "1", "alice", // header
            "hello", "bob", "2026-01-05", "0", "101", "plans", "carol", "2026-01-06", "0", "102",
        ])
    });
    transport.on("contacts_addedme.php", |_| wire(&["0", "dora"]));

    let counters = client.users().notifications().unwrap();
    assert_eq!(counters.messages, 2);
    assert_eq!(counters.friends, 1);
    assert_eq!(counters.mentions, 0);
    assert_eq!(counters.followed_threads, 0);
}

#[test]
fn test_session_debug_names_user_but_not_secrets() {
    let (client, _) = logged_in_client();
    let rendered = format!("{:?}", client.session());
    assert!(rendered.contains("Alice"));
    assert!(!rendered.contains("secret"));
    assert!(!rendered.contains("tok1"));

    let transport = MockTransport::new();
    transport.on("login.php", |_| wire(&["-5"]));
    let pending = Client::with_transport(transport);
    let _ = pending.session().login("bob", "hunter2");
    let rendered = format!("{:?}", pending.session());
    assert!(rendered.contains("TwoFactorPending"));
    assert!(rendered.contains("bob"));
    assert!(!rendered.contains("hunter2"));
}

#[test]
fn test_change_password_updates_refresh_credential() {
    let transport = MockTransport::new();
    let logins = Arc::new(Mutex::new(Vec::new()));
    let logins_handler = logins.clone();
    transport.on("login.php", move |params| {
        logins_handler
            .lock()
            .unwrap()
            .push(param(params, "password").unwrap_or("").to_owned());
        login_ok("tok1")
    });
    transport.on("account_mod.php", |_| wire(&["0"]));
    let client = Client::with_transport(transport);
    client.session().login("alice", "old-secret").unwrap();

    let out = client.account().change_password("old-secret", "new-secret").unwrap();
    assert!(out.success);

    client.session().refresh().unwrap();
    let seen = logins.lock().unwrap();
    assert_eq!(seen.as_slice(), ["old-secret", "new-secret"]);
}

//! Private messages: conversation listings and message threads.

use eltenlink_wire::{read_records, split_blocks, status};

use crate::api::{Outcome, degrade, outcome};
use crate::engine::{DEFAULT_TIMEOUT, RequestEngine, UPLOAD_TIMEOUT};
use crate::error::Result;
use crate::multipart::MultipartBody;
use crate::transport::param;

/// One conversation in the top-level listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    /// The other participant.
    pub user: String,
    /// Who sent the latest message.
    pub last_sender: String,
    /// Date of the latest message, as sent.
    pub date: String,
    /// Subject of the latest message.
    pub subject: String,
    /// Whether the latest message has been read.
    pub read: bool,
    /// Server id of the latest message.
    pub id: i64,
    /// Whether the conversation is muted.
    pub muted: bool,
    /// Display name of the other participant.
    pub display_name: String,
}

/// One subject thread with a single user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSubject {
    /// Thread subject.
    pub subject: String,
    /// Who sent the latest message in the thread.
    pub last_sender: String,
    /// Date of the latest message, as sent.
    pub date: String,
    /// Whether the latest message has been read.
    pub read: bool,
    /// Server id of the latest message.
    pub id: i64,
}

/// One full message within a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Server id.
    pub id: i64,
    /// Sender username.
    pub sender: String,
    /// Subject line.
    pub subject: String,
    /// Date, as sent.
    pub date: String,
    /// Whether the message has been read.
    pub read: bool,
    /// Mark counter.
    pub marked: i64,
    /// Attachment descriptor, as sent.
    pub attachments: String,
    /// Whether the message is protected from deletion.
    pub protected: bool,
    /// Message body with embedded line breaks restored.
    pub text: String,
}

const ENDPOINT: &str = "messages_conversations.php";

/// Message facade.
#[derive(Debug)]
pub struct MessagesApi<'a> {
    engine: &'a RequestEngine,
}

impl<'a> MessagesApi<'a> {
    pub(crate) fn new(engine: &'a RequestEngine) -> Self {
        Self { engine }
    }

    /// Lists all conversations, newest first.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn conversations(&self) -> Result<Vec<Conversation>> {
        degrade(ENDPOINT, self.try_conversations())
    }

    fn try_conversations(&self) -> Result<Vec<Conversation>> {
        let params = vec![param("details", "3"), param("limit", "100")];
        let response = self.engine.get(ENDPOINT, &params, DEFAULT_TIMEOUT)?;
        let count = usize::try_from(response.int(1)).unwrap_or(0);
        // Header: status, count, has_more.
        Ok(read_records(response.lines(), 3, count, 8)
            .iter()
            .map(|r| Conversation {
                user: r.field(0).to_owned(),
                last_sender: r.field(1).to_owned(),
                date: r.field(2).to_owned(),
                subject: r.field(3).to_owned(),
                read: r.flag(4),
                id: r.int(5),
                muted: r.int(6) == 1,
                display_name: r.field(7).to_owned(),
            })
            .collect())
    }

    /// Lists the subject threads exchanged with `user`.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn subjects(&self, user: &str) -> Result<Vec<ConversationSubject>> {
        let params = vec![param("user", user), param("details", "1")];
        degrade(ENDPOINT, self.try_subjects(&params))
    }

    /// Lists unread messages across all conversations.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn unread(&self) -> Result<Vec<ConversationSubject>> {
        let params = vec![param("sp", "new"), param("details", "1")];
        degrade(ENDPOINT, self.try_subjects(&params))
    }

    fn try_subjects(&self, params: &[(String, String)]) -> Result<Vec<ConversationSubject>> {
        let response = self.engine.get(ENDPOINT, params, DEFAULT_TIMEOUT)?;
        let count = usize::try_from(response.int(1)).unwrap_or(0);
        // Header: status, count, has_more, user_exists, display name.
        Ok(read_records(response.lines(), 5, count, 5)
            .iter()
            .map(|r| ConversationSubject {
                subject: r.field(0).to_owned(),
                last_sender: r.field(1).to_owned(),
                date: r.field(2).to_owned(),
                read: r.flag(3),
                id: r.int(4),
            })
            .collect())
    }

    /// Reads the messages of one subject thread with `user`.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn thread(&self, user: &str, subject: &str) -> Result<Vec<Message>> {
        degrade(ENDPOINT, self.try_thread(user, param("subj", subject)))
    }

    /// Reads the thread containing message `id` from `user`.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn thread_by_id(&self, user: &str, id: i64) -> Result<Vec<Message>> {
        degrade(ENDPOINT, self.try_thread(user, param("id", id.to_string())))
    }

    fn try_thread(&self, user: &str, selector: (String, String)) -> Result<Vec<Message>> {
        let params = vec![param("user", user), param("details", "3"), selector];
        let response = self.engine.get(ENDPOINT, &params, DEFAULT_TIMEOUT)?;
        // Header: status, count, has_more, can_reply, conversation name.
        // Message blocks follow, terminator-delimited: eight scalar lines,
        // then the body.
        Ok(split_blocks(response.lines_from(5))
            .iter()
            .filter(|block| block.len() >= 5)
            .map(|block| Message {
                id: block.int(0),
                sender: block.line(1).to_owned(),
                subject: block.line(2).to_owned(),
                date: block.line(3).to_owned(),
                read: block.int(4) > 0,
                marked: block.int(5),
                attachments: block.line(6).to_owned(),
                protected: block.int(7) > 0,
                text: block.text_from(8),
            })
            .collect())
    }

    /// Sends a private message.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures. A server rejection is
    /// reported inside the [`Outcome`], not as an error.
    pub fn send(&self, to: &str, subject: &str, text: &str) -> Result<Outcome> {
        let params = vec![param("to", to), param("subject", subject)];
        let body = MultipartBody::new().field("text", text);
        outcome(
            self.engine
                .post("message_send.php", &params, &body, UPLOAD_TIMEOUT),
            "message sent",
            &[
                (status::PERMISSION_DENIED, "user has blocked you"),
                (status::NOT_FOUND, "user not found"),
            ],
        )
    }

    /// Deletes a single message.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn delete(&self, id: i64) -> Result<()> {
        let params = vec![param("delete", "1"), param("id", id.to_string())];
        self.engine
            .get("messages.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }

    /// Deletes one subject thread with `user`, or the whole conversation
    /// when `subject` is `None`.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn delete_conversation(&self, user: &str, subject: Option<&str>) -> Result<()> {
        let params = match subject {
            Some(subject) => vec![
                param("user", user),
                param("delete", "2"),
                param("subj", subject),
            ],
            None => vec![param("user", user), param("delete", "3")],
        };
        self.engine
            .get("messages.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }

    /// Marks messages as read, for one user or for everyone.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn mark_read(&self, user: Option<&str>) -> Result<()> {
        let params = match user {
            Some(user) => vec![param("user", user)],
            None => Vec::new(),
        };
        self.engine
            .get("message_allread.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }
}

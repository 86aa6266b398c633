//! Discussion board: structure dump, thread reading, search, and posting.

use eltenlink_wire::{Record, extract_audio, read_records, read_sections, split_blocks};

use crate::api::{Outcome, degrade, name_list, outcome};
use crate::engine::{DEFAULT_TIMEOUT, RequestEngine, UPLOAD_TIMEOUT};
use crate::error::Result;
use crate::multipart::MultipartBody;
use crate::transport::{BASE_URL, param};

/// One forum group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForumGroup {
    /// Numeric group id.
    pub id: i64,
    /// Group name.
    pub name: String,
    /// Founder username.
    pub founder: String,
    /// Group description.
    pub description: String,
    /// Language code.
    pub lang: String,
    /// Group flags bitfield.
    pub flags: i64,
    /// This account's role in the group.
    pub role: i64,
    /// Number of forums in the group.
    pub forums: i64,
    /// Number of threads in the group.
    pub threads: i64,
    /// Number of posts in the group.
    pub posts: i64,
}

/// One forum within a group. Forum ids are opaque strings, not numbers;
/// threads reference them verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forum {
    /// String forum identifier.
    pub id: String,
    /// Forum name.
    pub name: String,
    /// Forum type tag.
    pub kind: String,
    /// Owning group id.
    pub group_id: i64,
    /// Forum description.
    pub description: String,
}

/// One thread within a forum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForumThread {
    /// Numeric thread id.
    pub id: i64,
    /// Thread title.
    pub name: String,
    /// Author username.
    pub author: String,
    /// Identifier of the owning forum.
    pub forum_id: String,
    /// Total posts in the thread.
    pub posts: i64,
    /// Posts this account has read.
    pub read_posts: i64,
    /// Thread flags, as sent.
    pub flags: String,
    /// Last-update timestamp, as sent.
    pub last_update: String,
}

/// The complete structure dump.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ForumStructure {
    /// All visible groups.
    pub groups: Vec<ForumGroup>,
    /// All visible forums.
    pub forums: Vec<Forum>,
    /// All visible threads.
    pub threads: Vec<ForumThread>,
}

impl ForumStructure {
    /// Forums belonging to group `group_id`.
    #[must_use]
    pub fn forums_in(&self, group_id: i64) -> Vec<&Forum> {
        self.forums.iter().filter(|f| f.group_id == group_id).collect()
    }

    /// Threads belonging to forum `forum_id`.
    #[must_use]
    pub fn threads_in(&self, forum_id: &str) -> Vec<&ForumThread> {
        self.threads.iter().filter(|t| t.forum_id == forum_id).collect()
    }
}

/// One post within a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadPost {
    /// Numeric post id.
    pub id: i64,
    /// Author username.
    pub author: String,
    /// Post body with embedded line breaks restored.
    pub content: String,
    /// Absolute URL of an attached audio recording, if any.
    pub audio_url: Option<String>,
    /// Post date, as sent.
    pub date: String,
    /// Attachment descriptor, as sent.
    pub attachments: String,
    /// Whether this account liked the post.
    pub liked: bool,
    /// Whether the post was edited.
    pub edited: bool,
    /// Author signature.
    pub signature: String,
}

/// One forum search hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit {
    /// Thread containing the matches.
    pub thread_id: i64,
    /// Number of matching posts.
    pub post_count: i64,
}

/// Forum facade.
#[derive(Debug)]
pub struct ForumApi<'a> {
    engine: &'a RequestEngine,
}

impl<'a> ForumApi<'a> {
    pub(crate) fn new(engine: &'a RequestEngine) -> Self {
        Self { engine }
    }

    /// Fetches the complete structure dump: groups, forums, and threads in
    /// one payload.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty
    /// structure.
    pub fn structure(&self) -> Result<ForumStructure> {
        degrade("forum_struct.php", self.try_structure())
    }

    fn try_structure(&self) -> Result<ForumStructure> {
        let params = vec![param("useflags", "1")];
        let response = self.engine.get("forum_struct.php", &params, DEFAULT_TIMEOUT)?;
        let sections = read_sections(response.lines(), 1, &["groups", "forums", "threads"]);

        let mut structure = ForumStructure::default();
        for section in sections {
            match section.kind.as_str() {
                "groups" => structure
                    .groups
                    .extend(section.records.iter().map(decode_group)),
                "forums" => structure
                    .forums
                    .extend(section.records.iter().map(decode_forum)),
                "threads" => structure
                    .threads
                    .extend(section.records.iter().map(decode_thread)),
                _ => {}
            }
        }
        Ok(structure)
    }

    /// Reads the posts of thread `thread_id`.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn thread_posts(&self, thread_id: i64) -> Result<Vec<ThreadPost>> {
        degrade("forum_thread.php", self.try_thread_posts(thread_id))
    }

    fn try_thread_posts(&self, thread_id: i64) -> Result<Vec<ThreadPost>> {
        let params = vec![param("thread", thread_id.to_string()), param("details", "1")];
        let response = self.engine.get("forum_thread.php", &params, DEFAULT_TIMEOUT)?;

        // Header: status, timestamp, total posts, read posts, followed.
        // Each post takes two terminator-delimited blocks: the content block
        // (id, author, body) and the metadata block (date, polls,
        // attachments, liked, edited, signature).
        let blocks = split_blocks(response.lines_from(5));
        let mut posts = Vec::new();
        for pair in blocks.chunks_exact(2) {
            let content_block = &pair[0];
            let meta_block = &pair[1];
            if content_block.len() < 2 {
                continue;
            }

            let (content, audio) = extract_audio(&content_block.text_from(2));
            posts.push(ThreadPost {
                id: content_block.int(0),
                author: content_block.line(1).to_owned(),
                content,
                audio_url: audio.map(|path| absolute_audio_url(&path)),
                date: meta_block.line(0).to_owned(),
                attachments: meta_block.line(2).to_owned(),
                liked: meta_block.line(3) == "1",
                edited: meta_block.line(4) == "1",
                signature: meta_block.text_from(5),
            });
        }
        Ok(posts)
    }

    /// Searches the forum for `query`.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        degrade("forum_search.php", self.try_search(query))
    }

    fn try_search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let params = vec![param("query", query)];
        let response = self.engine.get("forum_search.php", &params, DEFAULT_TIMEOUT)?;
        let count = usize::try_from(response.int(1)).unwrap_or(0);
        Ok(read_records(response.lines(), 2, count, 2)
            .iter()
            .map(|r| SearchHit {
                thread_id: r.int(0),
                post_count: r.int(1),
            })
            .collect())
    }

    /// Lists members of group `group_id`.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn group_members(&self, group_id: i64) -> Result<Vec<String>> {
        let params = vec![param("ac", "members"), param("groupid", group_id.to_string())];
        degrade(
            "forum_groups.php",
            self.engine
                .get("forum_groups.php", &params, DEFAULT_TIMEOUT)
                .map(|response| name_list(&response)),
        )
    }

    /// Joins group `group_id`.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn join_group(&self, group_id: i64) -> Result<()> {
        let params = vec![param("ac", "join"), param("groupid", group_id.to_string())];
        self.engine
            .get("forum_groups.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }

    /// Leaves group `group_id`.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn leave_group(&self, group_id: i64) -> Result<()> {
        let params = vec![param("ac", "leave"), param("groupid", group_id.to_string())];
        self.engine
            .get("forum_groups.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }

    /// Posts a reply to thread `thread_id`.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures; server rejections are
    /// reported inside the [`Outcome`].
    pub fn reply(&self, thread_id: i64, text: &str) -> Result<Outcome> {
        let params = vec![
            param("threadid", thread_id.to_string()),
            param("format", "0"),
        ];
        let body = MultipartBody::new().field("post", text);
        outcome(
            self.engine
                .post("forum_edit.php", &params, &body, UPLOAD_TIMEOUT),
            "reply posted",
            &[],
        )
    }

    /// Creates a new thread in forum `forum_id` with an opening post.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures; server rejections are
    /// reported inside the [`Outcome`].
    pub fn create_thread(&self, forum_id: &str, title: &str, text: &str) -> Result<Outcome> {
        let params = vec![
            param("forumname", forum_id),
            param("threadname", title),
            param("format", "0"),
            param("follow", "1"),
            param("post", text),
        ];
        outcome(
            self.engine.get("forum_edit.php", &params, UPLOAD_TIMEOUT),
            "thread created",
            &[],
        )
    }

    /// Marks a group or a forum as read.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn mark_read(&self, group_id: Option<i64>, forum_id: Option<&str>) -> Result<()> {
        let mut params = Vec::new();
        if let Some(group_id) = group_id {
            params.push(param("groupid", group_id.to_string()));
        }
        if let Some(forum_id) = forum_id {
            params.push(param("forum", forum_id));
        }
        self.engine
            .get("forum_markasread.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }

    /// Follows thread `thread_id`.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn follow_thread(&self, thread_id: i64) -> Result<()> {
        let params = vec![param("follow", "1"), param("thread", thread_id.to_string())];
        self.engine
            .get("forum_followed.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }

    /// Unfollows thread `thread_id`.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn unfollow_thread(&self, thread_id: i64) -> Result<()> {
        let params = vec![param("unfollow", "1"), param("thread", thread_id.to_string())];
        self.engine
            .get("forum_followed.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }
}

fn decode_group(record: &Record) -> ForumGroup {
    ForumGroup {
        id: record.int(0),
        name: record.field(1).to_owned(),
        founder: record.field(2).to_owned(),
        // Group descriptions use '$' as their own line-break convention.
        description: record.field(3).replace('$', "\n"),
        lang: record.field(4).to_owned(),
        flags: record.int(5),
        role: record.int(6),
        forums: record.int(7),
        threads: record.int(8),
        posts: record.int(9),
    }
}

fn decode_forum(record: &Record) -> Forum {
    Forum {
        id: record.field(0).to_owned(),
        name: record.field(1).to_owned(),
        kind: record.field(2).to_owned(),
        group_id: record.int(3),
        description: record.field(4).to_owned(),
    }
}

fn decode_thread(record: &Record) -> ForumThread {
    ForumThread {
        id: record.int(0),
        name: record.field(1).to_owned(),
        author: record.field(2).to_owned(),
        forum_id: record.field(3).to_owned(),
        posts: record.int(4),
        read_posts: record.int(5),
        flags: record.field(6).to_owned(),
        last_update: record.field(7).to_owned(),
    }
}

/// Audio references arrive as server-relative paths; absolute URLs pass
/// through unchanged.
fn absolute_audio_url(path: &str) -> String {
    if path.starts_with("http") {
        path.to_owned()
    } else {
        format!("{BASE_URL}{}", path.trim_start_matches('/'))
    }
}

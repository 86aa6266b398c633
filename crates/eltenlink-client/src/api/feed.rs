//! The feed (short public posts): reading, publishing, and reactions.

use eltenlink_wire::{NEWLINE_SUBSTITUTE, split_blocks};

use crate::api::{Outcome, degrade, outcome};
use crate::engine::{DEFAULT_TIMEOUT, RequestEngine, UPLOAD_TIMEOUT};
use crate::error::Result;
use crate::multipart::MultipartBody;
use crate::transport::param;

/// Maximum length of a feed post, in characters.
pub const MAX_POST_LEN: usize = 300;

/// One feed post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPost {
    /// Numeric post id.
    pub id: i64,
    /// Author username.
    pub user: String,
    /// Timestamp, as sent.
    pub time: String,
    /// Post text with embedded line breaks restored.
    pub message: String,
    /// Id of the post this one responds to, 0 for top-level posts.
    pub response_to: i64,
    /// Number of responses.
    pub responses: i64,
    /// Number of likes.
    pub likes: i64,
    /// Whether this account liked the post.
    pub liked: bool,
}

/// Feed facade.
#[derive(Debug)]
pub struct FeedApi<'a> {
    engine: &'a RequestEngine,
}

impl<'a> FeedApi<'a> {
    pub(crate) fn new(engine: &'a RequestEngine) -> Self {
        Self { engine }
    }

    /// Reads the feed: posts of `user`, or of all followed users when
    /// `user` is `None`.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn posts(&self, user: Option<&str>) -> Result<Vec<FeedPost>> {
        degrade("feeds.php", self.try_posts(user))
    }

    fn try_posts(&self, user: Option<&str>) -> Result<Vec<FeedPost>> {
        let params = match user {
            Some(user) => vec![
                param("ac", "show"),
                param("user", user),
                param("details", "2"),
            ],
            None => vec![param("ac", "showfollowed"), param("details", "2")],
        };
        let response = self.engine.get("feeds.php", &params, DEFAULT_TIMEOUT)?;
        if response.int(1) == 0 {
            return Ok(Vec::new());
        }
        Ok(decode_feed(response.lines_from(2)))
    }

    /// Reads the responses to post `feed_id`.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn responses(&self, feed_id: i64) -> Result<Vec<FeedPost>> {
        degrade("feeds.php", self.try_responses(feed_id))
    }

    fn try_responses(&self, feed_id: i64) -> Result<Vec<FeedPost>> {
        let params = vec![
            param("ac", "showresponses"),
            param("id", feed_id.to_string()),
            param("details", "2"),
        ];
        let response = self.engine.get("feeds.php", &params, DEFAULT_TIMEOUT)?;
        // Responses come without the trailing reaction counters.
        Ok(split_blocks(response.lines_from(2))
            .iter()
            .filter(|block| block.len() >= 3)
            .map(|block| FeedPost {
                id: block.int(0),
                user: block.line(1).to_owned(),
                time: block.line(2).to_owned(),
                message: block.text_from(3),
                response_to: feed_id,
                responses: 0,
                likes: 0,
                liked: false,
            })
            .collect())
    }

    /// Publishes a post, truncated to [`MAX_POST_LEN`] characters.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures; server rejections are
    /// reported inside the [`Outcome`].
    pub fn publish(&self, message: &str, response_to: i64) -> Result<Outcome> {
        let params = vec![
            param("ac", "publish"),
            param("response", response_to.to_string()),
        ];
        let truncated: String = message.chars().take(MAX_POST_LEN).collect();
        let body = MultipartBody::new().field("text", truncated);
        outcome(
            self.engine.post("feeds.php", &params, &body, UPLOAD_TIMEOUT),
            "post published",
            &[],
        )
    }

    /// Deletes post `feed_id`.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn delete(&self, feed_id: i64) -> Result<()> {
        let params = vec![param("ac", "delete"), param("id", feed_id.to_string())];
        self.engine
            .get("feeds.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }

    /// Likes or unlikes post `feed_id`.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn like(&self, feed_id: i64, like: bool) -> Result<()> {
        let params = vec![
            param("ac", "liking"),
            param("message", feed_id.to_string()),
            param("like", if like { "1" } else { "0" }),
        ];
        self.engine
            .get("feeds.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }

    /// Follows the feed of `username`.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn follow(&self, username: &str) -> Result<()> {
        let params = vec![param("ac", "follow"), param("user", username)];
        self.engine
            .get("feeds.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }

    /// Unfollows the feed of `username`.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn unfollow(&self, username: &str) -> Result<()> {
        let params = vec![param("ac", "unfollow"), param("user", username)];
        self.engine
            .get("feeds.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }
}

/// Decodes the feed layout: each post is a terminator-delimited block of
/// id, author, timestamp, and message lines, but its four reaction counters
/// (response id, responses, likes, liked) land at the *start of the next
/// block*, ahead of the next post's own lines. The decoder peels those four
/// lines off the following block before treating its remainder as the next
/// post.
fn decode_feed(lines: &[String]) -> Vec<FeedPost> {
    let mut blocks: Vec<Vec<String>> = split_blocks(lines)
        .into_iter()
        .map(eltenlink_wire::TextBlock::into_lines)
        .collect();

    let mut posts = Vec::new();
    let mut i = 0;
    while i < blocks.len() {
        if blocks[i].len() < 3 {
            i += 1;
            continue;
        }

        let post_lines = std::mem::take(&mut blocks[i]);
        let id = eltenlink_wire::parse_int(post_lines[0].trim());
        let user = post_lines[1].trim().to_owned();
        let time = post_lines[2].trim().to_owned();
        let message = post_lines[3..]
            .join("\n")
            .replace(NEWLINE_SUBSTITUTE, "\n")
            .trim()
            .to_owned();

        let mut response_to = 0;
        let mut responses = 0;
        let mut likes = 0;
        let mut liked = false;
        if let Some(next) = blocks.get_mut(i + 1) {
            if next.len() >= 4 {
                response_to = eltenlink_wire::parse_int(next[0].trim());
                responses = eltenlink_wire::parse_int(next[1].trim());
                likes = eltenlink_wire::parse_int(next[2].trim());
                liked = next[3].trim() == "1";
                if next.len() > 4 {
                    next.drain(..4);
                } else {
                    // Counters were the whole block; skip it entirely.
                    i += 1;
                }
            }
        }

        posts.push(FeedPost {
            id,
            user,
            time,
            message,
            response_to,
            responses,
            likes,
            liked,
        });
        i += 1;
    }
    posts
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|&l| l.to_owned()).collect()
    }

    #[test]
    fn test_decode_feed_with_straddling_counters() {
        let input = lines(&[
            "11",
            "alice",
            "2026-01-01 10:00",
            "first\u{4}LINE\u{4}post",
            "\u{4}END\u{4}",
            "0",
            "2",
            "5",
            "1",
            "12",
            "bob",
            "2026-01-01 11:00",
            "reply",
            "\u{4}END\u{4}",
            "11",
            "0",
            "0",
            "0",
        ]);
        let posts = decode_feed(&input);
        assert_eq!(posts.len(), 2);

        assert_eq!(posts[0].id, 11);
        assert_eq!(posts[0].message, "first\npost");
        assert_eq!(posts[0].responses, 2);
        assert_eq!(posts[0].likes, 5);
        assert!(posts[0].liked);

        assert_eq!(posts[1].id, 12);
        assert_eq!(posts[1].user, "bob");
        assert_eq!(posts[1].response_to, 11);
        assert!(!posts[1].liked);
    }

    #[test]
    fn test_decode_feed_single_post() {
        let input = lines(&[
            "7",
            "carol",
            "2026-02-02 09:30",
            "solo",
            "\u{4}END\u{4}",
            "0",
            "0",
            "3",
            "0",
        ]);
        let posts = decode_feed(&input);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].likes, 3);
        assert!(!posts[0].liked);
    }

    #[test]
    fn test_decode_feed_ignores_short_blocks() {
        let input = lines(&["junk", "\u{4}END\u{4}"]);
        assert!(decode_feed(&input).is_empty());
    }
}

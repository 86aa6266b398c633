//! Blogs: directory, posts, categories, full-post reading, and publishing.

use rand::Rng;

use eltenlink_wire::{CompositeEntry, decode_entries, read_records};

use crate::api::{Outcome, degrade, outcome};
use crate::engine::{DEFAULT_TIMEOUT, RequestEngine, UPLOAD_TIMEOUT};
use crate::error::Result;
use crate::multipart::MultipartBody;
use crate::pagination::PaginationCursor;
use crate::transport::param;

/// One blog in the directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blog {
    /// Blog domain, used as the search name in other calls.
    pub domain: String,
    /// Blog title.
    pub name: String,
    /// Number of posts.
    pub posts: i64,
    /// Number of comments.
    pub comments: i64,
    /// Public URL.
    pub url: String,
    /// Date of the latest post, as sent.
    pub last_post: String,
    /// Blog description.
    pub description: String,
    /// Whether this account follows the blog.
    pub followed: bool,
    /// Language code.
    pub lang: String,
}

/// Sort order of the blog directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlogOrder {
    /// Most recently posted first.
    #[default]
    Recent,
    /// Most active first.
    Active,
    /// Most discussed first.
    Discussed,
    /// Followed blogs only.
    Followed,
    /// Blogs owned by this account.
    Mine,
}

impl BlogOrder {
    const fn as_param(self) -> &'static str {
        match self {
            Self::Recent => "0",
            Self::Active => "1",
            Self::Discussed => "2",
            Self::Followed => "3",
            Self::Mine => "5",
        }
    }
}

/// Category selector for a post listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlogCategory {
    /// All posts.
    #[default]
    All,
    /// One numeric category.
    Id(i64),
    /// Posts in followed blogs.
    Followed,
    /// Posts mentioning this account.
    Mentioned,
}

impl BlogCategory {
    fn as_param(self) -> String {
        match self {
            Self::All => "0".to_owned(),
            Self::Id(id) => id.to_string(),
            Self::Followed => "FOLLOWED".to_owned(),
            Self::Mentioned => "MENTIONED".to_owned(),
        }
    }
}

/// One post in a blog's listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogPost {
    /// Numeric post id.
    pub id: i64,
    /// Post title.
    pub title: String,
    /// Whether the post is unread.
    pub unread: bool,
    /// Owning blog domain.
    pub blog: String,
    /// Whether the post is an audio post.
    pub audio: bool,
    /// Post date, as sent.
    pub date: String,
    /// Public URL.
    pub url: String,
    /// Author username.
    pub author: String,
    /// Number of comments.
    pub comments: i64,
    /// Whether this account follows the post.
    pub followed: bool,
}

/// One blog category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Numeric category id.
    pub id: i64,
    /// Category name.
    pub name: String,
    /// Parent category id, 0 at top level.
    pub parent_id: i64,
    /// Number of posts in the category.
    pub posts: i64,
    /// Public URL.
    pub url: String,
}

/// A full blog post with its comment entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PostPage {
    /// The post itself followed by its comments, in server order.
    pub entries: Vec<CompositeEntry>,
    /// Comment count the header declared.
    pub comments: i64,
}

/// Blog facade.
#[derive(Debug)]
pub struct BlogApi<'a> {
    engine: &'a RequestEngine,
}

impl<'a> BlogApi<'a> {
    pub(crate) fn new(engine: &'a RequestEngine) -> Self {
        Self { engine }
    }

    /// Lists blogs in the directory.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn list(&self, order: BlogOrder) -> Result<Vec<Blog>> {
        degrade("blog_list.php", self.try_list(order))
    }

    fn try_list(&self, order: BlogOrder) -> Result<Vec<Blog>> {
        let params = vec![param("orderby", order.as_param()), param("details", "2")];
        let response = self.engine.get("blog_list.php", &params, DEFAULT_TIMEOUT)?;
        let count = usize::try_from(response.int(1)).unwrap_or(0);
        Ok(read_records(response.lines(), 2, count, 9)
            .iter()
            .map(|r| Blog {
                domain: r.field(0).to_owned(),
                name: r.field(1).to_owned(),
                posts: r.int(2),
                comments: r.int(3),
                url: r.field(4).to_owned(),
                last_post: r.field(5).to_owned(),
                description: r.field(6).to_owned(),
                followed: r.int(7) > 0,
                lang: r.field(8).to_owned(),
            })
            .collect())
    }

    /// Lists the posts of `blog` at the cursor's page and records whether
    /// further pages exist.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn posts(
        &self,
        blog: &str,
        category: BlogCategory,
        cursor: &mut PaginationCursor,
    ) -> Result<Vec<BlogPost>> {
        degrade("blog_posts.php", self.try_posts(blog, category, cursor))
    }

    fn try_posts(
        &self,
        blog: &str,
        category: BlogCategory,
        cursor: &mut PaginationCursor,
    ) -> Result<Vec<BlogPost>> {
        let params = vec![
            param("searchname", blog),
            param("details", "3"),
            param("categoryid", category.as_param()),
            param("paginate", "1"),
            param("page", cursor.page().to_string()),
        ];
        let response = self.engine.get("blog_posts.php", &params, DEFAULT_TIMEOUT)?;
        let count = usize::try_from(response.int(1)).unwrap_or(0);
        cursor.record(response.int(2) > 0);
        Ok(read_records(response.lines(), 3, count, 10)
            .iter()
            .map(|r| BlogPost {
                id: r.int(0),
                title: r.field(1).to_owned(),
                unread: r.int(2) > 0,
                blog: r.field(3).to_owned(),
                audio: r.int(4) > 0,
                date: r.field(5).to_owned(),
                url: r.field(6).to_owned(),
                author: r.field(7).to_owned(),
                comments: r.int(8),
                followed: r.field(9) == "1",
            })
            .collect())
    }

    /// Lists the categories of `blog`.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty list.
    pub fn categories(&self, blog: &str) -> Result<Vec<Category>> {
        degrade("blog_categories.php", self.try_categories(blog))
    }

    fn try_categories(&self, blog: &str) -> Result<Vec<Category>> {
        let params = vec![param("searchname", blog), param("details", "1")];
        let response = self
            .engine
            .get("blog_categories.php", &params, DEFAULT_TIMEOUT)?;
        // Header: status, blog title, count.
        let count = usize::try_from(response.int(2)).unwrap_or(0);
        Ok(read_records(response.lines(), 3, count, 5)
            .iter()
            .map(|r| Category {
                id: r.int(0),
                name: r.field(1).to_owned(),
                parent_id: r.int(2),
                posts: r.int(3),
                url: r.field(4).to_owned(),
            })
            .collect())
    }

    /// Reads post `post_id` of `blog` in full, with its comments.
    ///
    /// # Errors
    ///
    /// Only authentication failures; other failures yield an empty page.
    pub fn read(&self, post_id: i64, blog: &str) -> Result<PostPage> {
        degrade("blog_read.php", self.try_read(post_id, blog))
    }

    fn try_read(&self, post_id: i64, blog: &str) -> Result<PostPage> {
        let params = vec![
            param("postid", post_id.to_string()),
            param("searchname", blog),
            param("details", "8"),
            param("html", "1"),
        ];
        let response = self.engine.get("blog_read.php", &params, DEFAULT_TIMEOUT)?;
        // Header: status, entry count, known posts, comment count, native
        // blog flag; entries start at line 5.
        let count = usize::try_from(response.int(1)).unwrap_or(0);
        Ok(PostPage {
            entries: decode_entries(response.lines(), 5, count),
            comments: response.int(3),
        })
    }

    /// Whether `username` has a blog.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors.
    pub fn exists(&self, username: &str) -> Result<bool> {
        let params = vec![param("searchname", username)];
        let response = self.engine.get("blog_exist.php", &params, DEFAULT_TIMEOUT)?;
        Ok(response.field(1) == "1")
    }

    /// Publishes a comment on post `post_id` of `blog`.
    ///
    /// The body travels through the upload buffer: one request stores the
    /// text under a random buffer id, a second submits the comment
    /// referencing it.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures; server rejections are
    /// reported inside the [`Outcome`].
    pub fn comment(&self, post_id: i64, blog: &str, text: &str) -> Result<Outcome> {
        let buffer = self.upload_buffer(text)?;
        let params = vec![
            param("searchname", blog),
            param("postid", post_id.to_string()),
            param("buffer", buffer),
        ];
        outcome(
            self.engine
                .get("blog_posts_comment.php", &params, DEFAULT_TIMEOUT),
            "comment posted",
            &[],
        )
    }

    /// Publishes a new post on `blog`.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures; server rejections are
    /// reported inside the [`Outcome`].
    pub fn create_post(
        &self,
        blog: &str,
        title: &str,
        content: &str,
        category: Option<i64>,
    ) -> Result<Outcome> {
        let buffer = self.upload_buffer(content)?;
        let mut params = vec![
            param("add", "1"),
            param("postname", title),
            param("searchname", blog),
            param("buffer", buffer),
        ];
        if let Some(category) = category {
            params.push(param("categoryid", category.to_string()));
        }
        outcome(
            self.engine
                .get("blog_posts_mod.php", &params, DEFAULT_TIMEOUT),
            "blog post created",
            &[],
        )
    }

    fn upload_buffer(&self, data: &str) -> Result<String> {
        let id = rand::thread_rng().gen_range(100_000..1_000_000_u32).to_string();
        let params = vec![param("id", id.as_str())];
        let body = MultipartBody::new().field("data", data);
        self.engine
            .post("buffer_post.php", &params, &body, UPLOAD_TIMEOUT)?;
        Ok(id)
    }

    /// Creates a category on `blog`.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures; server rejections are
    /// reported inside the [`Outcome`].
    pub fn create_category(&self, blog: &str, name: &str) -> Result<Outcome> {
        let params = vec![
            param("add", "1"),
            param("searchname", blog),
            param("categoryname", name),
        ];
        outcome(
            self.engine
                .get("blog_categories_mod.php", &params, DEFAULT_TIMEOUT),
            "category created",
            &[],
        )
    }

    /// Renames category `category_id` on `blog`.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures; server rejections are
    /// reported inside the [`Outcome`].
    pub fn rename_category(&self, blog: &str, category_id: i64, name: &str) -> Result<Outcome> {
        let params = vec![
            param("rename", "1"),
            param("searchname", blog),
            param("categoryid", category_id.to_string()),
            param("categoryname", name),
        ];
        outcome(
            self.engine
                .get("blog_categories_mod.php", &params, DEFAULT_TIMEOUT),
            "category renamed",
            &[],
        )
    }

    /// Deletes category `category_id` on `blog`.
    ///
    /// # Errors
    ///
    /// Transport, timeout, or session failures; server rejections are
    /// reported inside the [`Outcome`].
    pub fn delete_category(&self, blog: &str, category_id: i64) -> Result<Outcome> {
        let params = vec![
            param("del", "1"),
            param("searchname", blog),
            param("categoryid", category_id.to_string()),
        ];
        outcome(
            self.engine
                .get("blog_categories_mod.php", &params, DEFAULT_TIMEOUT),
            "category deleted",
            &[],
        )
    }

    /// Follows blog `blog`.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn follow(&self, blog: &str) -> Result<()> {
        let params = vec![param("add", "1"), param("searchname", blog)];
        self.engine
            .get("blog_fb.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }

    /// Unfollows blog `blog`.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn unfollow(&self, blog: &str) -> Result<()> {
        let params = vec![param("remove", "1"), param("searchname", blog)];
        self.engine
            .get("blog_fb.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }

    /// Follows post `post_id`.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn follow_post(&self, post_id: i64) -> Result<()> {
        let params = vec![param("add", "1"), param("postid", post_id.to_string())];
        self.engine
            .get("blog_fb.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }

    /// Unfollows post `post_id`.
    ///
    /// # Errors
    ///
    /// Session, transport, or wire errors, including the mapped status code.
    pub fn unfollow_post(&self, post_id: i64) -> Result<()> {
        let params = vec![param("remove", "1"), param("postid", post_id.to_string())];
        self.engine
            .get("blog_fb.php", &params, DEFAULT_TIMEOUT)
            .map(|_| ())
    }
}

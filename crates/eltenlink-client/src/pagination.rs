//! Pagination cursor for endpoints that page with a `page` parameter and a
//! trailing has-more flag.

use crate::error::{Error, Result};

/// Tracks the current page of a paged listing.
///
/// Pages are one-based. The cursor starts pessimistic: until a response has
/// reported more pages via [`PaginationCursor::record`], advancing is an
/// error, so a caller looping on `advance()` stops exactly when the server
/// says the listing ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    page: u32,
    has_more: bool,
}

impl PaginationCursor {
    /// Creates a cursor at page 1 with no further pages known.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            page: 1,
            has_more: false,
        }
    }

    /// The current one-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Whether the last recorded response reported further pages.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.has_more
    }

    /// Records what the last response said about further pages.
    pub const fn record(&mut self, has_more: bool) {
        self.has_more = has_more;
    }

    /// Moves to the next page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoMorePages`] without changing the page when the
    /// last response reported no further pages.
    pub const fn advance(&mut self) -> Result<u32> {
        if !self.has_more {
            return Err(Error::NoMorePages);
        }
        self.page += 1;
        self.has_more = false;
        Ok(self.page)
    }

    /// Resets to page 1, forgetting any recorded has-more flag.
    pub const fn reset(&mut self) {
        self.page = 1;
        self.has_more = false;
    }
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self::new()
    }
}

//! Page-number pagination shared by list endpoints.

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// Default and maximum page sizes for one kind of listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    /// Page size used when the client does not ask for one.
    pub default_size: u64,
    /// Upper bound a client-requested page size is clamped to.
    pub max_size: u64,
}

impl PageSpec {
    /// Posts listing.
    pub const POSTS: Self = Self::new(10, 50);
    /// Comments under a post.
    pub const COMMENTS: Self = Self::new(5, 20);
    /// Users who liked a post or comment.
    pub const LIKES: Self = Self::new(10, 50);

    /// Create a page spec.
    #[must_use]
    pub const fn new(default_size: u64, max_size: u64) -> Self {
        Self {
            default_size,
            max_size,
        }
    }
}

/// Query parameters accepted by paginated endpoints.
///
/// Both values are kept as raw strings so that malformed input reaches
/// [`PageParams::resolve`] instead of failing query extraction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    /// 1-based page number.
    pub page: Option<String>,
    /// Requested page size.
    pub page_size: Option<String>,
}

/// A resolved page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u64,
    /// Number of items per page.
    pub per_page: u64,
}

impl PageParams {
    /// Resolve the raw parameters against a spec.
    ///
    /// A missing, non-positive or non-numeric `page_size` falls back to the
    /// default, larger values are clamped to the maximum. A page that is not a
    /// positive integer is rejected as an invalid page.
    pub fn resolve(&self, spec: PageSpec) -> AppResult<PageRequest> {
        let page = match self.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(raw) => match raw.parse::<i64>() {
                Ok(page) if page > 0 => page as u64,
                _ => return Err(AppError::NotFound("Invalid page".to_string())),
            },
        };

        let per_page = match self.page_size.as_deref().map(|raw| raw.trim().parse::<i64>()) {
            Some(Ok(size)) if size > 0 => (size as u64).min(spec.max_size),
            _ => spec.default_size,
        };

        Ok(PageRequest { page, per_page })
    }
}

impl PageRequest {
    /// Number of rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page - 1) * self.per_page
    }

    /// Total number of pages for `count` rows. An empty set still has one page.
    #[must_use]
    pub const fn num_pages(&self, count: u64) -> u64 {
        if count == 0 {
            1
        } else {
            count.div_ceil(self.per_page)
        }
    }

    /// Fail with `NotFound` when the page lies past the end of `count` rows.
    pub fn ensure_in_range(&self, count: u64) -> AppResult<()> {
        if self.page > self.num_pages(count) {
            return Err(AppError::NotFound("Invalid page".to_string()));
        }
        Ok(())
    }
}

/// A page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Total number of items across all pages.
    pub count: u64,
    /// Next page number, if any.
    pub next: Option<u64>,
    /// Previous page number, if any.
    pub previous: Option<u64>,
    /// Items on this page.
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Build a page from one slice of results and the total count.
    #[must_use]
    pub fn new(results: Vec<T>, count: u64, request: PageRequest) -> Self {
        let next = if request.page < request.num_pages(count) {
            Some(request.page + 1)
        } else {
            None
        };
        let previous = if request.page > 1 {
            Some(request.page - 1)
        } else {
            None
        };

        Self {
            count,
            next,
            previous,
            results,
        }
    }

    /// Convert every item on the page.
    #[must_use]
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

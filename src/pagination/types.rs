//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by all strategies.

use super::strategies::{CursorLinkPaginator, NoPaginator, PageCountPaginator, ShortPagePaginator};
use crate::error::Result;
use crate::http::ApiResponse;
use serde::{Deserialize, Serialize};

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Fetch another page with this token as `page`
    Continue(String),
    /// This seed is complete
    Done,
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Check if this is a continue result
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }
}

/// Tracks pagination of one seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    /// 1-based index of the current request within the seed
    pub page: u32,
    /// Token sent as the `page` query parameter
    pub token: String,
    /// Requested page size (`pagelen`)
    pub page_size: u32,
    /// Total pages, once known from the first response
    pub total_pages: Option<u32>,
    /// Records fetched so far for this seed
    pub total_fetched: u64,
}

impl PageContext {
    /// Create the context of a seed's first request
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            token: "1".to_string(),
            page_size,
            total_pages: None,
            total_fetched: 0,
        }
    }

    /// Move to the next request with the given token
    pub fn advance(&mut self, token: impl Into<String>) {
        self.page += 1;
        self.token = token.into();
    }

    /// Add to total fetched
    pub fn add_fetched(&mut self, count: usize) {
        self.total_fetched += count as u64;
    }
}

/// Core trait for pagination strategies
pub trait Paginator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Decide the next page from the last successful response.
    ///
    /// `records` is the number of records decoded from `response`. The
    /// strategy may cache what it learns (e.g. total pages) in `page`, but
    /// must not advance it; the engine does that.
    fn next_page(
        &self,
        page: &mut PageContext,
        response: &ApiResponse,
        records: usize,
    ) -> Result<NextPage>;
}

/// Pagination strategy selected by collector configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationMode {
    /// Total pages computed from the envelope's `size`
    #[default]
    PageCount,
    /// Page token taken from the envelope's `next` link
    CursorLink,
    /// Continue while pages come back full
    ShortPage,
    /// One request per seed
    Single,
}

impl PaginationMode {
    /// Build the strategy for this mode
    pub fn paginator(self) -> Box<dyn Paginator> {
        match self {
            Self::PageCount => Box::new(PageCountPaginator),
            Self::CursorLink => Box::new(CursorLinkPaginator),
            Self::ShortPage => Box::new(ShortPagePaginator),
            Self::Single => Box::new(NoPaginator),
        }
    }
}

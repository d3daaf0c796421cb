//! Decoder types
//!
//! Wire shapes and decode outcomes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pagination envelope wrapping a page of results.
///
/// Only `values` is required; APIs fill in different subsets of the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginationEnvelope {
    /// Records of this page
    pub values: Vec<Value>,
    /// Page size the server applied
    #[serde(default)]
    pub limit: u32,
    /// Total number of records across all pages
    #[serde(default)]
    pub size: u64,
    /// Current page number
    #[serde(default)]
    pub page: u32,
    /// Offset of the first record of this page
    #[serde(default)]
    pub start: u32,
    /// Link to the next page, absent or empty on the last page
    #[serde(default)]
    pub next: Option<String>,
    /// Whether this is the last page
    #[serde(default, rename = "isLastPage")]
    pub is_last_page: bool,
}

impl PaginationEnvelope {
    /// The `next` link, with empty treated as absent
    pub fn next_link(&self) -> Option<&str> {
        self.next.as_deref().filter(|s| !s.is_empty())
    }
}

/// Outcome of decoding the `next` link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextLink {
    /// Token to send as the `page` parameter of the next request
    Page(String),
    /// No next link: this seed is fully collected
    End,
}

impl NextLink {
    /// Check if this is the end-of-collection signal
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}

/// Classification of a response status that is not an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx: decode the body
    Success,
    /// 404: the resource is absent for this seed, move on to the next one
    IgnoreAndContinue,
}

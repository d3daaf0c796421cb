//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{NextPage, PageContext, Paginator};
use crate::decode::{decode_envelope, decode_next_link, total_pages, NextLink};
use crate::error::Result;
use crate::http::ApiResponse;
use tracing::warn;

// ============================================================================
// Page Count Pagination
// ============================================================================

/// Page count pagination
///
/// The first response reports the total record count as `size`; the number
/// of pages is `size / page_size` rounded up, and pages `1..=total` are
/// requested in order. `size = 0` ends the seed after its first request.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageCountPaginator;

impl Paginator for PageCountPaginator {
    fn name(&self) -> &'static str {
        "page_count"
    }

    fn next_page(
        &self,
        page: &mut PageContext,
        response: &ApiResponse,
        _records: usize,
    ) -> Result<NextPage> {
        let total = match page.total_pages {
            Some(total) => total,
            None => {
                let envelope = decode_envelope(response)?;
                let total = total_pages(envelope.size, page.page_size);
                page.total_pages = Some(total);
                total
            }
        };

        if page.page >= total {
            Ok(NextPage::Done)
        } else {
            Ok(NextPage::Continue((page.page + 1).to_string()))
        }
    }
}

// ============================================================================
// Cursor Link Pagination
// ============================================================================

/// Cursor link pagination
///
/// Follows the `page` parameter of the response's `next` link. An empty link
/// ends the seed. Tokens are opaque and may jump around.
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorLinkPaginator;

impl Paginator for CursorLinkPaginator {
    fn name(&self) -> &'static str {
        "cursor_link"
    }

    fn next_page(
        &self,
        page: &mut PageContext,
        response: &ApiResponse,
        _records: usize,
    ) -> Result<NextPage> {
        match decode_next_link(response)? {
            NextLink::End => Ok(NextPage::Done),
            NextLink::Page(token) if token == page.token => {
                // A link back to the current page would never terminate.
                warn!(
                    url = %response.url,
                    token = %token,
                    "next link points at the current page, stopping"
                );
                Ok(NextPage::Done)
            }
            NextLink::Page(token) => Ok(NextPage::Continue(token)),
        }
    }
}

// ============================================================================
// Short Page Pagination
// ============================================================================

/// Short page pagination
///
/// For endpoints that report neither a total nor a next link: keeps
/// requesting sequential pages until one comes back with fewer records than
/// the page size.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortPagePaginator;

impl Paginator for ShortPagePaginator {
    fn name(&self) -> &'static str {
        "short_page"
    }

    fn next_page(
        &self,
        page: &mut PageContext,
        _response: &ApiResponse,
        records: usize,
    ) -> Result<NextPage> {
        if records == 0 || records < page.page_size as usize {
            Ok(NextPage::Done)
        } else {
            Ok(NextPage::Continue((page.page + 1).to_string()))
        }
    }
}

// ============================================================================
// No Pagination
// ============================================================================

/// No pagination - single request
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPaginator;

impl Paginator for NoPaginator {
    fn name(&self) -> &'static str {
        "single"
    }

    fn next_page(
        &self,
        _page: &mut PageContext,
        _response: &ApiResponse,
        _records: usize,
    ) -> Result<NextPage> {
        Ok(NextPage::Done)
    }
}

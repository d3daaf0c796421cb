//! Pagination module
//!
//! Supports: Page Count, Cursor Link, Short Page, Single Request
//!
//! # Overview
//!
//! Every strategy answers one question: given the current page context and
//! the last response, what is the next page token, or is this seed done?
//! The collector engine never branches on the strategy itself.

mod strategies;
mod types;

pub use strategies::{CursorLinkPaginator, NoPaginator, PageCountPaginator, ShortPagePaginator};
pub use types::{NextPage, PageContext, PaginationMode, Paginator};

// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # scm-ingest
//!
//! A stateful, paginated, incremental raw-data collection engine for
//! Bitbucket-Server-style REST APIs.
//!
//! ## Features
//!
//! - **Seeded Collection**: one request sequence per branch, commit or pull request
//! - **Transparent Pagination**: page-count and cursor-link responses alike
//! - **Incremental Sync**: watermark committed only after a successful run
//! - **Partial Failure Tolerance**: 404 skips a seed, nothing else is lost
//! - **Raw Storage**: documents kept verbatim in DuckDB, idempotent per page
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scm_ingest::collector::StatefulCollector;
//! use scm_ingest::collectors::get_builtin;
//! use scm_ingest::http::{HttpClient, HttpClientConfig};
//! use scm_ingest::storage::DuckDbStore;
//! use scm_ingest::{CollectionParams, Result};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = DuckDbStore::open("scm.duckdb")?;
//!     let client = HttpClient::with_config(
//!         HttpClientConfig::builder()
//!             .endpoint("https://bitbucket.example.com")
//!             .bearer_token("...")
//!             .build(),
//!     )?;
//!
//!     let mut collector = StatefulCollector::new(
//!         CollectionParams::new(1, "PROJ/repos/app"),
//!         Arc::new(client),
//!         Arc::new(store.clone()),
//!         Arc::new(store.clone()),
//!     );
//!
//!     let commits = get_builtin("commits").unwrap().args(&store, 100);
//!     let summary = collector.collect(&commits).await?;
//!     println!("{} records", summary.records);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      StatefulCollector                          │
//! │   Init → Running → {Completed, Failed}    per seed, per page    │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │  Input   │   Query   │     HTTP      │  Decode   │  Paginate   │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Branches │ state/page│ Retry         │ Status    │ Page Count  │
//! │ Commits  │ fields    │ Rate Limit    │ Envelope  │ Cursor Link │
//! │ PRs      │ q/sort    │ Auth          │ Raw JSON  │ Short Page  │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//!                                │
//!                  DuckDB: raw tables, state, seeds
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// HTTP client with retry and rate limiting
pub mod http;

/// URL template binding
pub mod template;

/// Per-request query parameters
pub mod query;

/// Response status classification and decoding
pub mod decode;

/// Pagination strategies
pub mod pagination;

/// Watermark state and its persistence
pub mod state;

/// DuckDB raw, state and seed storage
pub mod storage;

/// Seed input sources
pub mod input;

/// Stateful collector engine
pub mod collector;

/// Built-in resource collectors
pub mod collectors;

/// Run configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use collector::{CollectSummary, CollectorArgs, RunPhase, StatefulCollector};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

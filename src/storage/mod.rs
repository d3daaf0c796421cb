//! Local storage module
//!
//! A single DuckDB database holds everything a collection run touches on
//! the local side:
//!
//! - `_raw_<name>` tables with the collected documents
//! - `_collector_latest_state` with each collector's stored watermark
//! - `_tool_bitbucket_server_*` tables the seed inputs are read from

mod engine;
mod types;

pub use engine::DuckDbStore;
pub(crate) use engine::sql_timestamp;
pub use types::{raw_table_name, RawStore, StoredRawRow};

#[cfg(test)]
mod tests;

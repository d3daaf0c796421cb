//! Storage traits and row types

use crate::error::Result;
use crate::types::RawRecord;
use async_trait::async_trait;

/// Persists raw records
#[async_trait]
pub trait RawStore: Send + Sync {
    /// Save one page of records into the raw table of collector `name`.
    ///
    /// Rows are keyed by params, input, page and position within the page,
    /// so saving the same page twice replaces it. Returns the row count.
    async fn save(&self, name: &str, records: &[RawRecord]) -> Result<usize>;
}

/// A raw row read back from storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRawRow {
    /// Params JSON
    pub params: String,
    /// Seed JSON, `null` for unseeded collectors
    pub input: String,
    /// Request index within the seed
    pub page: u32,
    /// Position within the page
    pub position: u32,
    /// Request URL
    pub url: String,
    /// The document
    pub data: String,
}

/// Physical table holding a collector's raw rows
pub fn raw_table_name(name: &str) -> String {
    format!("_raw_{name}")
}

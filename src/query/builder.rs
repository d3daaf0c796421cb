//! Query builder implementation

use crate::pagination::PageContext;
use crate::state::CollectorState;
use crate::types::QueryParams;
use chrono::SecondsFormat;

/// Builds per-request query parameters.
///
/// A pure function of the page descriptor and the collector state; it never
/// fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryBuilder {
    /// Field projection sent as `fields`
    fields: Option<String>,
    /// Whether to add `sort` and the `q` watermark filter
    incremental: bool,
}

impl QueryBuilder {
    /// Plain paging query: `state`, `page`, `pagelen`
    pub fn basic() -> Self {
        Self::default()
    }

    /// Paging query with a field projection
    pub fn with_fields(fields: impl Into<String>) -> Self {
        Self {
            fields: Some(fields.into()),
            incremental: false,
        }
    }

    /// Paging query sorted by creation time and filtered by the watermark
    pub fn incremental() -> Self {
        Self {
            fields: None,
            incremental: true,
        }
    }

    /// Add a field projection
    #[must_use]
    pub fn fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }

    /// Whether this builder adds the watermark filter
    pub fn is_incremental(&self) -> bool {
        self.incremental
    }

    /// Build the query for one page request
    pub fn build(&self, page: &PageContext, state: &CollectorState) -> QueryParams {
        let mut query = QueryParams::new();
        query.insert("state".to_string(), "all".to_string());
        query.insert("page".to_string(), page.token.clone());
        query.insert("pagelen".to_string(), page.page_size.to_string());

        if let Some(fields) = &self.fields {
            query.insert("fields".to_string(), fields.clone());
        }

        if self.incremental {
            query.insert("sort".to_string(), "created_on".to_string());
            if let (true, Some(since)) = (state.is_incremental, state.since) {
                query.insert(
                    "q".to_string(),
                    format!(
                        "updated_on>={}",
                        since.to_rfc3339_opts(SecondsFormat::Secs, true)
                    ),
                );
            }
        }

        query
    }
}

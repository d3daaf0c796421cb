//! Collector types
//!
//! Run phases, per-collector arguments and the run summary.

use crate::error::{Error, Result};
use crate::input::InputSource;
use crate::pagination::{PaginationMode, Paginator};
use crate::query::QueryBuilder;
use crate::template;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Lifecycle of one collection run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Loading state, opening inputs
    #[default]
    Init,
    /// Fetching pages
    Running,
    /// Every seed finished and the watermark was saved
    Completed,
    /// The run aborted; stored state is untouched
    Failed,
}

impl RunPhase {
    /// Whether the run has ended
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What one collector fetches and how
pub struct CollectorArgs {
    /// Raw table name, also the state key
    pub name: String,
    /// URL template relative to the endpoint
    pub url_template: String,
    /// Records per page (`pagelen`)
    pub page_size: u32,
    /// Per-request query parameters
    pub query: QueryBuilder,
    /// Next-page strategy
    pub paginator: Box<dyn Paginator>,
    /// Seeds, for collectors paginated once per seed
    pub input: Option<Arc<dyn InputSource>>,
}

impl CollectorArgs {
    /// Unseeded, page-count paginated collector with a basic query
    pub fn new(name: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
            page_size: 100,
            query: QueryBuilder::basic(),
            paginator: PaginationMode::PageCount.paginator(),
            input: None,
        }
    }

    /// Set the page size
    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the query builder
    #[must_use]
    pub fn query(mut self, query: QueryBuilder) -> Self {
        self.query = query;
        self
    }

    /// Set the pagination strategy
    #[must_use]
    pub fn pagination(mut self, mode: PaginationMode) -> Self {
        self.paginator = mode.paginator();
        self
    }

    /// Drive the collector with seeds from `source`
    #[must_use]
    pub fn input(mut self, source: Arc<dyn InputSource>) -> Self {
        self.input = Some(source);
        self
    }

    /// Check the arguments before a run touches anything
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::missing_field("name"));
        }
        if self.page_size == 0 {
            return Err(Error::invalid_value("page_size", "must be greater than zero"));
        }

        let uses_input = template::uses_input(&self.url_template);
        match (uses_input, self.input.is_some()) {
            (true, false) => Err(Error::config(format!(
                "collector '{}' binds .Input in its URL but has no input source",
                self.name
            ))),
            (false, true) => Err(Error::config(format!(
                "collector '{}' has an input source but its URL never binds .Input",
                self.name
            ))),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for CollectorArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectorArgs")
            .field("name", &self.name)
            .field("url_template", &self.url_template)
            .field("page_size", &self.page_size)
            .field("query", &self.query)
            .field("paginator", &self.paginator.name())
            .field("seeded", &self.input.is_some())
            .finish()
    }
}

/// Totals of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectSummary {
    /// Seeds processed (one for unseeded collectors)
    pub seeds: usize,
    /// Seeds that answered 404
    pub skipped_seeds: usize,
    /// Successful page requests
    pub pages: usize,
    /// Raw records saved
    pub records: usize,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

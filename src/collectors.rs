//! Built-in resource collectors
//!
//! Each resource is a thin configuration over the collector engine: a raw
//! table, a URL template, a query builder, a pagination strategy and, for
//! seeded resources, the tool table its seeds come from.

use crate::collector::CollectorArgs;
use crate::input::{SeedQuery, SeedSource};
use crate::pagination::PaginationMode;
use crate::query::QueryBuilder;
use crate::storage::DuckDbStore;
use crate::types::SeedKind;
use std::sync::Arc;

/// Query flavor of a built-in resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// `state`, `page`, `pagelen`
    Basic,
    /// Basic plus a `fields` projection
    Fields(&'static str),
    /// Fields plus `sort` and the watermark filter
    Incremental(&'static str),
}

impl QueryKind {
    fn builder(self) -> QueryBuilder {
        match self {
            Self::Basic => QueryBuilder::basic(),
            Self::Fields(fields) => QueryBuilder::with_fields(fields),
            Self::Incremental(fields) => QueryBuilder::incremental().fields(fields),
        }
    }
}

/// A built-in resource collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDef {
    /// Name used on the command line
    pub name: &'static str,
    /// Raw table name (without the `_raw_` prefix)
    pub raw_table: &'static str,
    /// URL template relative to the endpoint
    pub url_template: &'static str,
    /// Seed variant, `None` for unseeded resources
    pub seed: Option<SeedKind>,
    /// Pagination strategy
    pub pagination: PaginationMode,
    /// Query flavor
    pub query: QueryKind,
}

impl ResourceDef {
    /// Collector arguments for this resource
    pub fn args(&self, store: &DuckDbStore, page_size: u32) -> CollectorArgs {
        let mut args = CollectorArgs::new(self.raw_table, self.url_template)
            .page_size(page_size)
            .query(self.query.builder())
            .pagination(self.pagination);

        if let Some(kind) = self.seed {
            args = args.input(Arc::new(SeedSource::new(
                store.clone(),
                SeedQuery::for_kind(kind),
            )));
        }
        args
    }
}

const PR_FIELDS: &str = "id,title,state,createdDate,updatedDate,author,fromRef,toRef";
const ACTIVITY_FIELDS: &str = "id,action,createdDate,user,comment,commentAction";
const PR_COMMIT_FIELDS: &str = "id,displayId,author,authorTimestamp,message";

/// Every built-in resource, in dependency order
pub static BUILTIN_RESOURCES: &[ResourceDef] = &[
    ResourceDef {
        name: "branches",
        raw_table: "bitbucket_server_api_branches",
        url_template: "rest/api/1.0/projects/{{ .Params.FullName }}/branches",
        seed: None,
        pagination: PaginationMode::PageCount,
        query: QueryKind::Basic,
    },
    ResourceDef {
        name: "commits",
        raw_table: "bitbucket_server_api_commits",
        url_template:
            "rest/api/1.0/projects/{{ .Params.FullName }}/commits?until={{ .Input.Branch }}",
        seed: Some(SeedKind::Branch),
        pagination: PaginationMode::PageCount,
        query: QueryKind::Basic,
    },
    ResourceDef {
        name: "pull_requests",
        raw_table: "bitbucket_server_api_pull_requests",
        url_template: "rest/api/1.0/projects/{{ .Params.FullName }}/pull-requests",
        seed: None,
        pagination: PaginationMode::CursorLink,
        query: QueryKind::Incremental(PR_FIELDS),
    },
    ResourceDef {
        name: "pull_request_comments",
        raw_table: "bitbucket_server_api_pull_request_comments",
        url_template: "rest/api/1.0/projects/{{ .Params.FullName }}/pull-requests/{{ .Input.BitbucketId }}/activities",
        seed: Some(SeedKind::BitbucketId),
        pagination: PaginationMode::CursorLink,
        query: QueryKind::Incremental(ACTIVITY_FIELDS),
    },
    ResourceDef {
        name: "pull_request_commits",
        raw_table: "bitbucket_server_api_pull_request_commits",
        url_template: "rest/api/1.0/projects/{{ .Params.FullName }}/pull-requests/{{ .Input.BitbucketId }}/commits",
        seed: Some(SeedKind::BitbucketId),
        pagination: PaginationMode::CursorLink,
        query: QueryKind::Fields(PR_COMMIT_FIELDS),
    },
    ResourceDef {
        name: "commit_changes",
        raw_table: "bitbucket_server_api_commit_changes",
        url_template:
            "rest/api/1.0/projects/{{ .Params.FullName }}/commits/{{ .Input.CommitSha }}/changes",
        seed: Some(SeedKind::CommitSha),
        pagination: PaginationMode::CursorLink,
        query: QueryKind::Basic,
    },
];

/// Get a built-in resource by name
pub fn get_builtin(name: &str) -> Option<&'static ResourceDef> {
    BUILTIN_RESOURCES.iter().find(|r| r.name == name)
}

/// Check if a name is a built-in resource
pub fn is_builtin(name: &str) -> bool {
    get_builtin(name).is_some()
}

/// List all built-in resource names
pub fn list_builtin() -> Vec<&'static str> {
    BUILTIN_RESOURCES.iter().map(|r| r.name).collect()
}

//! Common types used throughout scm-ingest
//!
//! This module contains shared type definitions, type aliases,
//! and the data model every collector run is built on.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Query parameters of a single request
pub type QueryParams = HashMap<String, String>;

// ============================================================================
// Collection Params
// ============================================================================

/// Scope of a collection run: one connection, one repository.
///
/// Serialized with PascalCase keys so templates read `{{ .Params.FullName }}`
/// and raw rows are tagged `{"ConnectionId":1,"FullName":"PROJ/repos/app"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CollectionParams {
    /// Connection identifier
    pub connection_id: u64,
    /// Repository full name (e.g. `PROJ/repos/app`)
    pub full_name: String,
}

impl CollectionParams {
    /// Create new collection params
    pub fn new(connection_id: u64, full_name: impl Into<String>) -> Self {
        Self {
            connection_id,
            full_name: full_name.into(),
        }
    }

    /// Stable JSON encoding used to tag raw rows and key stored state
    pub fn to_json(&self) -> String {
        // Two plain fields never fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for CollectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.full_name, self.connection_id)
    }
}

// ============================================================================
// Seed Inputs
// ============================================================================

/// One unit of per-resource pagination context.
///
/// Externally tagged, so a branch seed serializes as `{"Branch":"main"}` and
/// binds `{{ .Input.Branch }}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeedInput {
    /// Pull request id
    BitbucketId(i64),
    /// Branch name
    Branch(String),
    /// Commit hash
    CommitSha(String),
}

impl SeedInput {
    /// Variant of this seed
    pub fn kind(&self) -> SeedKind {
        match self {
            Self::BitbucketId(_) => SeedKind::BitbucketId,
            Self::Branch(_) => SeedKind::Branch,
            Self::CommitSha(_) => SeedKind::CommitSha,
        }
    }

    /// JSON form used as template context and for tagging raw rows
    pub fn to_value(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl fmt::Display for SeedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BitbucketId(id) => write!(f, "pull request {id}"),
            Self::Branch(branch) => write!(f, "branch {branch}"),
            Self::CommitSha(sha) => write!(f, "commit {sha}"),
        }
    }
}

/// Which seed variant a collector is driven by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedKind {
    /// Seeds are pull request ids
    BitbucketId,
    /// Seeds are branch names
    Branch,
    /// Seeds are commit hashes
    CommitSha,
}

impl SeedKind {
    /// Column projected from the seed table
    pub fn column(self) -> &'static str {
        match self {
            Self::BitbucketId => "bitbucket_id",
            Self::Branch => "branch",
            Self::CommitSha => "commit_sha",
        }
    }

    /// Tool table the seeds are read from
    pub fn tool_table(self) -> &'static str {
        match self {
            Self::BitbucketId => "_tool_bitbucket_server_pull_requests",
            Self::Branch => "_tool_bitbucket_server_branches",
            Self::CommitSha => "_tool_bitbucket_server_commits",
        }
    }
}

// ============================================================================
// Raw Records
// ============================================================================

/// One collected JSON document, kept byte-for-byte as the API returned it
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// Scope of the run that collected this record
    pub params: CollectionParams,
    /// Seed the request was built from, if the collector is seeded
    pub input: Option<SeedInput>,
    /// 1-based index of the request within its seed
    pub page: u32,
    /// Request URL the record came from
    pub url: String,
    /// The document itself
    pub data: Box<RawValue>,
}

impl RawRecord {
    /// JSON encoding of the seed, `null` for unseeded collectors
    pub fn input_json(&self) -> String {
        serde_json::to_string(&self.input).unwrap_or_else(|_| "null".to_string())
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

//! State types for tracking collection progress
//!
//! These types are serialized to JSON and persisted between runs.

use crate::error::Result;
use crate::types::CollectionParams;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Persisted outcome of the last successful run of one collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredState {
    /// When the last successful run started
    pub latest_success_start: DateTime<Utc>,
    /// Lower time bound that run was configured with
    #[serde(default)]
    pub time_after: Option<DateTime<Utc>>,
}

/// How the caller wants this run to treat stored state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPolicy {
    /// Ignore stored state and collect everything
    #[serde(default)]
    pub full_sync: bool,
    /// Only collect data updated after this time
    #[serde(default)]
    pub time_after: Option<DateTime<Utc>>,
}

/// The watermark view of a run, fixed at start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorState {
    /// Watermark, if any
    pub since: Option<DateTime<Utc>>,
    /// Whether this run only fetches what changed after `since`
    pub is_incremental: bool,
}

impl CollectorState {
    /// A full collection with no watermark
    pub fn full() -> Self {
        Self::default()
    }

    /// An incremental collection from `since`
    pub fn incremental(since: DateTime<Utc>) -> Self {
        Self {
            since: Some(since),
            is_incremental: true,
        }
    }

    /// Resolve the run's state from what was stored and the run policy.
    ///
    /// The run is incremental only when a previous success exists, no full
    /// sync was requested and the time bound has not changed since.
    pub fn resolve(stored: Option<&StoredState>, policy: &SyncPolicy) -> Self {
        match stored {
            Some(stored) if !policy.full_sync && stored.time_after == policy.time_after => {
                Self::incremental(stored.latest_success_start)
            }
            _ => Self {
                since: policy.time_after,
                is_incremental: false,
            },
        }
    }
}

/// Identifies one collector's state: raw table plus collection params
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    /// Raw table name of the collector
    pub raw_table: String,
    /// Params JSON, as tagged on raw rows
    pub params: String,
}

impl StateKey {
    /// Create a key for a collector and scope
    pub fn new(raw_table: impl Into<String>, params: &CollectionParams) -> Self {
        Self {
            raw_table: raw_table.into(),
            params: params.to_json(),
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.raw_table, self.params)
    }
}

/// Loads and saves collector state
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the stored state, `None` when no run has succeeded yet
    async fn load(&self, key: &StateKey) -> Result<Option<StoredState>>;

    /// Replace the stored state
    async fn save(&self, key: &StateKey, state: &StoredState) -> Result<()>;
}

/// Complete state document of the file store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Stored state keyed by `raw_table:params`
    #[serde(default)]
    pub collectors: HashMap<String, StoredState>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a collector
    pub fn get(&self, key: &StateKey) -> Option<&StoredState> {
        self.collectors.get(&key.to_string())
    }

    /// Set state for a collector
    pub fn set(&mut self, key: &StateKey, state: StoredState) {
        self.collectors.insert(key.to_string(), state);
    }
}

//! State management module
//!
//! Handles watermark tracking between collection runs so a run can fetch only
//! what changed since the last successful one.
//!
//! # Overview
//!
//! The state module provides:
//! - `StoredState` - what is persisted after a successful run
//! - `SyncPolicy` - how the caller wants this run to behave
//! - `CollectorState` - the run's resolved watermark view
//! - `StateStore` - persistence seam, with `StateManager` as a JSON file store

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{CollectorState, State, StateKey, StateStore, StoredState, SyncPolicy};

#[cfg(test)]
mod manager_tests;

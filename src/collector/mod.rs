//! Stateful collector engine
//!
//! Drives seeds through a paginated resource and persists every page as raw
//! records.
//!
//! # Overview
//!
//! A run moves through `Init -> Running -> {Completed, Failed}`:
//!
//! 1. **Init**: load stored state, resolve it against the sync policy, note
//!    the run start time and open the input source
//! 2. **Running**: for each seed, render the URL and walk its pages until the
//!    paginator reports completion or the resource answers 404
//! 3. **Completed**: save the run start as the new watermark
//! 4. **Failed**: any other error aborts the remaining seeds and leaves the
//!    stored state as it was

mod types;

pub use types::{CollectSummary, CollectorArgs, RunPhase};

use crate::decode::{classify_status, decode_raw_records, StatusClass};
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::input::InputIterator;
use crate::pagination::{NextPage, PageContext};
use crate::state::{CollectorState, StateKey, StateStore, StoredState, SyncPolicy};
use crate::storage::RawStore;
use crate::template::{self, TemplateContext};
use crate::types::{CollectionParams, RawRecord, SeedInput};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs collectors for one connection and repository
pub struct StatefulCollector {
    /// Scope of every run
    params: CollectionParams,
    /// Request capability
    client: Arc<dyn ApiClient>,
    /// Raw record sink
    raw_store: Arc<dyn RawStore>,
    /// Watermark persistence
    state_store: Arc<dyn StateStore>,
    /// Full or incremental behavior
    policy: SyncPolicy,
    /// Cooperative cancellation
    cancel: CancellationToken,
    /// Phase of the current or last run
    phase: RunPhase,
}

impl StatefulCollector {
    /// Create a new collector
    pub fn new(
        params: CollectionParams,
        client: Arc<dyn ApiClient>,
        raw_store: Arc<dyn RawStore>,
        state_store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            params,
            client,
            raw_store,
            state_store,
            policy: SyncPolicy::default(),
            cancel: CancellationToken::new(),
            phase: RunPhase::Init,
        }
    }

    /// Set the sync policy
    #[must_use]
    pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a caller-owned cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Scope of this collector
    pub fn params(&self) -> &CollectionParams {
        &self.params
    }

    /// Phase of the current or last run
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Run one collector to completion
    pub async fn collect(&mut self, args: &CollectorArgs) -> Result<CollectSummary> {
        let started = Instant::now();
        self.phase = RunPhase::Init;

        match self.run(args).await {
            Ok(mut summary) => {
                summary.duration_ms = started.elapsed().as_millis() as u64;
                self.phase = RunPhase::Completed;
                info!(
                    collector = %args.name,
                    params = %self.params,
                    seeds = summary.seeds,
                    skipped = summary.skipped_seeds,
                    pages = summary.pages,
                    records = summary.records,
                    duration_ms = summary.duration_ms,
                    "collection completed"
                );
                Ok(summary)
            }
            Err(e) => {
                self.phase = RunPhase::Failed;
                warn!(collector = %args.name, params = %self.params, error = %e, "collection failed");
                Err(e)
            }
        }
    }

    async fn run(&mut self, args: &CollectorArgs) -> Result<CollectSummary> {
        args.validate()?;

        let key = StateKey::new(&args.name, &self.params);
        let stored = self.state_store.load(&key).await?;
        let state = CollectorState::resolve(stored.as_ref(), &self.policy);
        let run_start = Utc::now();

        info!(
            collector = %args.name,
            params = %self.params,
            incremental = state.is_incremental,
            since = ?state.since,
            paginator = args.paginator.name(),
            "starting collection"
        );

        self.phase = RunPhase::Running;
        let mut summary = CollectSummary::default();

        match &args.input {
            None => self.collect_seed(args, &state, None, &mut summary).await?,
            Some(source) => {
                let mut inputs = source.open(&self.params, &state).await?;
                let result = self
                    .collect_seeds(args, &state, inputs.as_mut(), &mut summary)
                    .await;
                inputs.close();
                result?;
            }
        }

        self.state_store
            .save(
                &key,
                &StoredState {
                    latest_success_start: run_start,
                    time_after: self.policy.time_after,
                },
            )
            .await?;

        Ok(summary)
    }

    async fn collect_seeds(
        &self,
        args: &CollectorArgs,
        state: &CollectorState,
        inputs: &mut dyn InputIterator,
        summary: &mut CollectSummary,
    ) -> Result<()> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let Some(seed) = inputs.next_input().await? else {
                return Ok(());
            };
            self.collect_seed(args, state, Some(&seed), summary).await?;
        }
    }

    async fn collect_seed(
        &self,
        args: &CollectorArgs,
        state: &CollectorState,
        seed: Option<&SeedInput>,
        summary: &mut CollectSummary,
    ) -> Result<()> {
        let ctx = TemplateContext::for_seed(&self.params, seed)?;
        let path = template::render(&args.url_template, &ctx)?;
        let mut page = PageContext::new(args.page_size);
        summary.seeds += 1;

        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let query = args.query.build(&page, state);
            let response = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(Error::Cancelled),
                response = self.client.get(&path, &query) => response?,
            };

            if classify_status(&response)? == StatusClass::IgnoreAndContinue {
                info!(
                    collector = %args.name,
                    url = %response.url,
                    "resource not found, skipping seed"
                );
                summary.skipped_seeds += 1;
                return Ok(());
            }

            let values = decode_raw_records(&response)?;
            let count = values.len();
            let records: Vec<RawRecord> = values
                .into_iter()
                .map(|data| RawRecord {
                    params: self.params.clone(),
                    input: seed.cloned(),
                    page: page.page,
                    url: response.url.clone(),
                    data,
                })
                .collect();
            self.raw_store.save(&args.name, &records).await?;

            summary.pages += 1;
            summary.records += count;
            page.add_fetched(count);
            debug!(
                collector = %args.name,
                page = page.page,
                token = %page.token,
                records = count,
                "page saved"
            );

            match args.paginator.next_page(&mut page, &response, count)? {
                NextPage::Continue(token) => page.advance(token),
                NextPage::Done => return Ok(()),
            }
        }
    }
}

impl std::fmt::Debug for StatefulCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatefulCollector")
            .field("params", &self.params)
            .field("policy", &self.policy)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;

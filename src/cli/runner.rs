//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::collector::StatefulCollector;
use crate::collectors::{get_builtin, ResourceDef, BUILTIN_RESOURCES};
use crate::config::CollectorConfig;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::state::{StateKey, StateManager, StateStore};
use crate::storage::DuckDbStore;
use crate::types::SeedInput;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
    cancel: CancellationToken,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancel collection through this token
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Collect {
                resources,
                token,
                full_sync,
            } => self.collect(resources, token.as_deref(), *full_sync).await,
            Commands::State { resource } => self.state(resource).await,
            Commands::Resources => {
                self.list_resources();
                Ok(())
            }
            Commands::Seed {
                branches,
                commits,
                pull_requests,
            } => self.seed(branches, commits, pull_requests),
        }
    }

    /// Load and validate the configuration file
    fn load_config(&self) -> Result<CollectorConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -c flag)"))?;
        let config = CollectorConfig::from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn state_store(config: &CollectorConfig, store: &DuckDbStore) -> Result<Arc<dyn StateStore>> {
        Ok(match &config.storage.state_file {
            Some(path) => Arc::new(StateManager::from_file(path)?),
            None => Arc::new(store.clone()),
        })
    }

    /// Run collectors in order, stopping at the first failure
    async fn collect(&self, resources: &[String], token: Option<&str>, full_sync: bool) -> Result<()> {
        let config = self.load_config()?;
        let selected = select_resources(resources)?;

        let store = DuckDbStore::open(&config.storage.database)?;
        let state_store = Self::state_store(&config, &store)?;
        let client = Arc::new(HttpClient::with_config(config.http_client_config(token))?);

        let mut policy = config.sync.clone();
        policy.full_sync |= full_sync;

        let mut collector = StatefulCollector::new(
            config.params(),
            client,
            Arc::new(store.clone()),
            state_store,
        )
        .with_policy(policy)
        .with_cancellation(self.cancel.clone());

        for resource in selected {
            info!(resource = resource.name, "collecting");
            let args = resource.args(&store, config.page_size);
            let summary = collector.collect(&args).await?;
            println!(
                "{}",
                json!({
                    "type": "SUMMARY",
                    "resource": resource.name,
                    "phase": collector.phase(),
                    "summary": summary,
                })
            );
        }

        Ok(())
    }

    /// Print the stored state of one resource
    async fn state(&self, resource: &str) -> Result<()> {
        let config = self.load_config()?;
        let def = get_builtin(resource)
            .ok_or_else(|| Error::config(format!("Unknown resource: {resource}")))?;

        let store = DuckDbStore::open(&config.storage.database)?;
        let state_store = Self::state_store(&config, &store)?;
        let key = StateKey::new(def.raw_table, &config.params());
        let state = state_store.load(&key).await?;

        println!(
            "{}",
            json!({
                "type": "STATE",
                "resource": def.name,
                "params": config.params(),
                "state": state,
            })
        );
        Ok(())
    }

    /// List built-in resources
    fn list_resources(&self) {
        for resource in BUILTIN_RESOURCES {
            println!(
                "{}",
                json!({
                    "name": resource.name,
                    "raw_table": resource.raw_table,
                    "seed": resource.seed,
                    "pagination": resource.pagination,
                })
            );
        }
    }

    /// Insert seed rows for the configured scope
    fn seed(&self, branches: &[String], commits: &[String], pull_requests: &[i64]) -> Result<()> {
        let config = self.load_config()?;
        let store = DuckDbStore::open(&config.storage.database)?;
        let params = config.params();

        let seeds = branches
            .iter()
            .cloned()
            .map(SeedInput::Branch)
            .chain(commits.iter().cloned().map(SeedInput::CommitSha))
            .chain(pull_requests.iter().copied().map(SeedInput::BitbucketId));

        let mut count = 0;
        for seed in seeds {
            store.upsert_seed(&params, &seed, None)?;
            count += 1;
        }

        println!("{}", json!({"type": "SEED", "params": params, "inserted": count}));
        Ok(())
    }
}

/// Resolve resource names, all built-ins when none are given
fn select_resources(names: &[String]) -> Result<Vec<&'static ResourceDef>> {
    if names.is_empty() {
        return Ok(BUILTIN_RESOURCES.iter().collect());
    }

    names
        .iter()
        .map(|name| {
            get_builtin(name.trim()).ok_or_else(|| {
                Error::invalid_value("resources", format!("unknown resource '{name}'"))
            })
        })
        .collect()
}

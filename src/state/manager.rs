//! JSON-file state store
//!
//! Keeps every collector's [`StoredState`] in one in-memory map and writes
//! the whole map back after each save. Writes go to a sibling `.tmp` file
//! which is then renamed over the target, so a crash never leaves a torn
//! state file behind. Writes are serialized across clones, since they all
//! share the one `.tmp` path.

use super::types::{State, StateKey, StateStore, StoredState};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// State store backed by an optional JSON file. Clones share one map.
#[derive(Debug, Clone)]
pub struct StateManager {
    file: Option<PathBuf>,
    state: Arc<RwLock<State>>,
    persist: Arc<Mutex<()>>,
}

impl StateManager {
    /// Store persisting to `path`, starting empty
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_state(Some(path.as_ref().to_path_buf()), State::new())
    }

    /// Store that never touches the filesystem
    pub fn in_memory() -> Self {
        Self::with_state(None, State::new())
    }

    /// Store persisting to `path`, seeded from the file when it exists
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            decode(&std::fs::read_to_string(&path).map_err(|e| io_error("read", &e))?)?
        } else {
            State::new()
        };
        Ok(Self::with_state(Some(path), state))
    }

    fn with_state(file: Option<PathBuf>, state: State) -> Self {
        Self {
            file,
            state: Arc::new(RwLock::new(state)),
            persist: Arc::new(Mutex::new(())),
        }
    }

    /// Replace the cached map with what is on disk
    pub async fn load_file(&self) -> Result<()> {
        let Some(path) = self.file.as_ref().filter(|p| p.exists()) else {
            return Ok(());
        };
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| io_error("read", &e))?;
        *self.state.write().await = decode(&contents)?;
        Ok(())
    }

    /// Write the cached map to disk
    pub async fn save_file(&self) -> Result<()> {
        let Some(path) = &self.file else {
            return Ok(());
        };

        // Held until the rename lands; the map is serialized after taking it.
        let _persist = self.persist.lock().await;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, self.to_json_pretty().await?)
            .await
            .map_err(|e| io_error("write", &e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| io_error("replace", &e))?;

        debug!(path = %path.display(), "state file written");
        Ok(())
    }

    pub async fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&*self.state.read().await)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))
    }

    pub async fn snapshot(&self) -> State {
        self.state.read().await.clone()
    }

    /// Backing file, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn is_in_memory(&self) -> bool {
        self.file.is_none()
    }
}

#[async_trait]
impl StateStore for StateManager {
    async fn load(&self, key: &StateKey) -> Result<Option<StoredState>> {
        Ok(self.state.read().await.get(key).cloned())
    }

    async fn save(&self, key: &StateKey, state: &StoredState) -> Result<()> {
        self.state.write().await.set(key, state.clone());
        self.save_file().await
    }
}

fn decode(contents: &str) -> Result<State> {
    serde_json::from_str(contents)
        .map_err(|e| Error::state(format!("Failed to parse state file: {e}")))
}

fn io_error(action: &str, e: &std::io::Error) -> Error {
    Error::state(format!("Failed to {action} state file: {e}"))
}

//! Last-seen headline persistence.
//!
//! A single JSON object in a single file. Every save rewrites the whole file;
//! there is no history and no locking, so only one watcher should point at a
//! given path.

use crate::error::StateError;
use crate::models::{NewsItem, PersistedState};
use crate::utils::{ensure_parent_dir, now_iso8601};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// How the current top item relates to what we saw last time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// No stored state to compare against.
    FirstRun,
    /// The headline or its link differs from the stored one.
    Changed,
    Unchanged,
}

impl Change {
    pub fn detect(previous: Option<&PersistedState>, current: &NewsItem) -> Self {
        match previous {
            None => Change::FirstRun,
            Some(state) if state.matches(current) => Change::Unchanged,
            Some(_) => Change::Changed,
        }
    }

    pub fn is_new(self) -> bool {
        !matches!(self, Change::Unchanged)
    }
}

/// File-backed store for the last successfully enriched headline.
///
/// The file holds one pretty-printed [`PersistedState`]. Its parent
/// directory is created on first save.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored headline.
    ///
    /// A missing file is `Ok(None)`. A file that exists but does not parse is
    /// [`StateError::Corrupt`]; callers treat that the same as no state.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Option<PersistedState>, StateError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No previous state file found");
                return Ok(None);
            }
            Err(source) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let state: PersistedState =
            serde_json::from_str(&raw).map_err(|source| StateError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        info!(
            title = %state.title,
            last_checked = %state.last_checked,
            "Loaded last saved headline"
        );
        Ok(Some(state))
    }

    /// Overwrite the state file with `item`, stamped with the current time.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn save(&self, item: &NewsItem) -> Result<PersistedState, StateError> {
        let state = PersistedState {
            title: item.title.clone(),
            url: item.url.clone(),
            last_checked: now_iso8601(),
        };
        let json = serde_json::to_string_pretty(&state)?;

        let io_err = |source: std::io::Error| StateError::Io {
            path: self.path.clone(),
            source,
        };
        ensure_parent_dir(&self.path).await.map_err(io_err)?;
        fs::write(&self.path, json).await.map_err(io_err)?;

        info!(title = %state.title, "Saved current headline");
        Ok(state)
    }
}

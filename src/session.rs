//! Resume state persistence
//!
//! A run that dies half-way through a long repository list should not redo
//! the entries it already finished. The session file records the index of the
//! last fully committed entry (1-based, 0 meaning "nothing done"); it is read
//! on start and overwritten after each entry completes.
//!
//! The file lives in the XDG data dir (`~/.local/share/forksync/session.json`)
//! and is plain JSON so a stuck session can be inspected or deleted by hand.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Progress marker persisted across invocations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunState {
    /// Index of the last fully processed repository entry (1-based)
    pub last_completed_index: usize,
    /// When this state was written
    pub updated_at: DateTime<Utc>,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            last_completed_index: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Reads and writes the session file
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store at the default XDG data location
    pub fn open_default() -> Result<Self> {
        Ok(Self::at(Self::default_path()?))
    }

    /// Store at a specific path (used by tests)
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().context("Failed to get user data directory")?;
        Ok(data_dir.join("forksync").join("session.json"))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load the persisted state, or a fresh one if no session file exists
    pub fn load(&self) -> Result<RunState> {
        if !self.path.exists() {
            debug!("No session file at {}, starting fresh", self.path.display());
            return Ok(RunState::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file: {}", self.path.display()))?;

        let state: RunState = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", self.path.display()))?;

        debug!(
            "Resuming after entry {} (session from {})",
            state.last_completed_index, state.updated_at
        );
        Ok(state)
    }

    /// Record that the entry at `index` (1-based) is fully committed
    pub fn save(&self, index: usize) -> Result<()> {
        let state = RunState {
            last_completed_index: index,
            updated_at: Utc::now(),
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create session directory: {}", parent.display())
            })?;
        }

        let content =
            serde_json::to_string_pretty(&state).context("Failed to serialize session state")?;

        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write session file: {}", self.path.display()))?;

        debug!("Session saved: last completed entry = {}", index);
        Ok(())
    }

    /// Discard any recorded progress
    pub fn reset(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).with_context(|| {
                format!("Failed to remove session file: {}", self.path.display())
            })?;
            info!("Session state discarded");
        }
        Ok(())
    }
}

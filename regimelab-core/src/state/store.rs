//! Crash-safe persistence for [`TradingState`].
//!
//! Layout: a single JSON file holding `{schema_version, saved_at, state}`.
//!
//! - Writes are atomic: write a sibling `.tmp`, fsync, rename into place.
//! - Loads are parse-or-default: a missing, corrupt or foreign-version file
//!   yields a fresh state and a warning, never a partial one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use super::TradingState;

/// Version written by this build. Files carrying any other version are ignored.
pub const STATE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state file I/O failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("state file {} is not valid JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("state serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("state schema version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEnvelope {
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    pub state: TradingState,
}

/// A trading state file on disk.
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

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Read and validate the envelope. Any problem is an error.
    pub fn read(&self) -> Result<StateEnvelope, StateError> {
        let content = fs::read_to_string(&self.path).map_err(|source| StateError::Io {
            path: self.path.clone(),
            source,
        })?;
        let envelope: StateEnvelope =
            serde_json::from_str(&content).map_err(|source| StateError::Parse {
                path: self.path.clone(),
                source,
            })?;
        if envelope.schema_version != STATE_SCHEMA_VERSION {
            return Err(StateError::UnsupportedVersion {
                found: envelope.schema_version,
                expected: STATE_SCHEMA_VERSION,
            });
        }
        Ok(envelope)
    }

    /// Load the persisted state, falling back to a fresh one.
    pub fn load(&self) -> TradingState {
        match self.read() {
            Ok(envelope) => {
                debug!(path = %self.path.display(), saved_at = %envelope.saved_at, "state loaded");
                envelope.state
            }
            Err(StateError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "no state file, starting fresh");
                TradingState::default()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unusable state file, starting fresh");
                TradingState::default()
            }
        }
    }

    /// Persist `state` atomically. Either the whole new record lands or the
    /// previous file is left untouched.
    pub fn save(&self, state: &TradingState) -> Result<(), StateError> {
        let envelope = StateEnvelope {
            schema_version: STATE_SCHEMA_VERSION,
            saved_at: Utc::now(),
            state: state.clone(),
        };
        let json = serde_json::to_vec_pretty(&envelope)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| StateError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let tmp_path = self.tmp_path();
        let written = File::create(&tmp_path).and_then(|mut file| {
            file.write_all(&json)?;
            file.sync_all()
        });
        if let Err(source) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(StateError::Io {
                path: tmp_path,
                source,
            });
        }

        fs::rename(&tmp_path, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            StateError::Io {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Overwrite the file with a fresh state.
    pub fn reset(&self) -> Result<TradingState, StateError> {
        let state = TradingState::default();
        self.save(&state)?;
        Ok(state)
    }
}

//! File-backed published-state store
//!
//! The state lives in a single JSON file. Writes go to a temporary file
//! next to the target and are renamed into place, so a crash mid-write
//! never leaves a truncated file behind. Loading is best effort: a
//! missing or unparseable file simply means there is no prior state.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{PublishedState, StateStore};
use crate::error::{Error, Result};

/// Persists the published state as a single JSON file.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Creates a store backed by `path`. The file is not touched until the
    /// first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Option<PublishedState> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) => {
                debug!(path = %self.path.display(),
                    "no usable state file: {}", err);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(err) => {
                debug!(path = %self.path.display(),
                    "discarding unparseable state file: {}", err);
                None
            }
        }
    }

    async fn save(&self, state: &PublishedState) -> Result<()> {
        let json = serde_json::to_string(state)?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.flush().await.map_err(|e| {
                Error::state_store(format!(
                    "failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })
    }

    async fn clear(&self) {
        if let Err(err) = fs::remove_file(&self.path).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                debug!(path = %self.path.display(),
                    "failed to remove state file: {}", err);
            }
        }
    }
}

//! In-memory published-state store, mainly for tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{PublishedState, StateStore};
use crate::error::Result;

/// Holds the published state in memory only.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<Option<PublishedState>>,
}

impl MemoryStateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `state`.
    pub fn with_state(state: PublishedState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Option<PublishedState> {
        self.state.lock().await.clone()
    }

    async fn save(&self, state: &PublishedState) -> Result<()> {
        *self.state.lock().await = Some(state.clone());
        Ok(())
    }

    async fn clear(&self) {
        *self.state.lock().await = None;
    }
}

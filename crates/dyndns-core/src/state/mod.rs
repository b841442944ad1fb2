//! Published-state persistence
//!
//! After a successful update the engine remembers what it published, so the
//! next run can skip the nameserver entirely when nothing changed. The
//! store is an optimization: losing it costs one redundant update, never
//! correctness.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collect::AddressSet;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::platform::Platform;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;

/// What was last published: the hostname (no trailing dot) and the full
/// per-family address sets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedState {
    /// The fully qualified hostname the records were published under
    pub hostname: String,
    /// The published addresses, grouped by family
    pub addresses: AddressSet,
}

/// Persistence for the last successfully published state.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the last published state.
    ///
    /// A missing, unreadable, or unparseable record yields `None`; the
    /// caller then proceeds as if nothing had ever been published.
    async fn load(&self) -> Option<PublishedState>;

    /// Replaces the stored state with `state`.
    async fn save(&self, state: &PublishedState) -> Result<()>;

    /// Removes any stored state. Best effort.
    async fn clear(&self);
}

/// Builds the store selected by the configuration, or `None` when the
/// persisted state is disabled.
pub fn store_from_config(cache: &CacheConfig, platform: Platform) -> Option<Box<dyn StateStore>> {
    let path = match cache {
        CacheConfig::Enabled(false) => return None,
        CacheConfig::Enabled(true) => platform.default_cache_path(),
        CacheConfig::Path(path) => path.clone(),
    };
    debug!(path = %path.display(), "using state file");
    Some(Box::new(FileStateStore::new(path)))
}

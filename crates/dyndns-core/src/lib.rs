//! Core engine of the dyndns dynamic DNS updater.
//!
//! The crate implements one update cycle: enumerate the machine's network
//! addresses, filter them down to the publishable set, compare against the
//! last published state, and deliver a DNS UPDATE (RFC 2136) to the zone's
//! primary nameserver when something changed. TSIG signing (RFC 2845) and
//! a persisted state cache are optional.
//!
//! The seams are traits: [`collect::AddressSource`] abstracts interface
//! enumeration, [`state::StateStore`] the persisted state, and
//! [`update::ZoneResolver`] / [`update::UpdateTransport`] the nameserver
//! side, so the whole pipeline runs against mocks in tests.

pub mod collect;
pub mod config;
pub mod detect;
pub mod engine;
pub mod error;
pub mod family;
pub mod platform;
pub mod state;
pub mod update;

pub use collect::{AddressCollector, AddressSet, AddressSource};
pub use config::{CacheConfig, Config, TsigConfig};
pub use detect::{decide, Decision};
pub use engine::{Engine, UpdateOutcome};
pub use error::{Error, Result};
pub use family::{Family, FamilyName};
pub use platform::Platform;
pub use state::{store_from_config, FileStateStore, MemoryStateStore, PublishedState, StateStore};
pub use update::{
    StubZoneResolver, TcpTransport, UpdateDispatcher, UpdateTransport, ZoneResolver,
};

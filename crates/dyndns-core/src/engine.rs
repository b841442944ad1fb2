//! The update engine
//!
//! One engine run is the whole job: collect the machine's addresses,
//! compare them against what was last published, and deliver a DNS UPDATE
//! when they differ. A run that changes nothing is the common case and
//! ends without touching the network.

use std::str::FromStr;

use domain::base::name::Dname;
use tracing::{debug, info, warn};

use crate::collect::{AddressCollector, AddressSource};
use crate::config::Config;
use crate::detect::{decide, Decision};
use crate::error::{Error, Result};
use crate::family::Family;
use crate::platform::Platform;
use crate::state::{PublishedState, StateStore};
use crate::update::UpdateDispatcher;

/// How a run ended.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// The published records already match, nothing was sent
    Skipped,
    /// An update was delivered and accepted
    Published,
    /// The run failed
    Failed(Error),
}

/// Drives one update run from collection to delivery.
pub struct Engine {
    hostname: String,
    fqdn: Dname<Vec<u8>>,
    zone: Dname<Vec<u8>>,
    families: Vec<Family>,
    collector: AddressCollector,
    store: Option<Box<dyn StateStore>>,
    dispatcher: UpdateDispatcher,
}

impl Engine {
    /// Wires up an engine from the configuration.
    ///
    /// Fails when no address family is enabled or when the hostname has no
    /// domain part to derive the zone from.
    pub fn new(
        config: &Config,
        platform: Platform,
        source: Box<dyn AddressSource>,
        store: Option<Box<dyn StateStore>>,
        dispatcher: UpdateDispatcher,
    ) -> Result<Self> {
        let families = Family::enabled(config, platform);
        let collector = AddressCollector::new(source, families.clone())?;

        let hostname = resolve_hostname(config)?;
        let zone_text = match hostname.split_once('.') {
            Some((host, zone)) if !host.is_empty() && !zone.is_empty() => zone,
            _ => {
                return Err(Error::config(format!(
                    "hostname {:?} has no domain part to derive the zone from",
                    hostname
                )))
            }
        };
        let fqdn = Dname::from_str(&hostname)
            .map_err(|e| Error::config(format!("invalid hostname {:?}: {}", hostname, e)))?;
        let zone = Dname::from_str(zone_text)
            .map_err(|e| Error::config(format!("invalid zone {:?}: {}", zone_text, e)))?;

        Ok(Self {
            hostname,
            fqdn,
            zone,
            families,
            collector,
            store,
            dispatcher,
        })
    }

    /// The fully qualified name the engine publishes under.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Runs one update cycle.
    ///
    /// `interfaces` restricts collection to the named interfaces; an empty
    /// list means all of them. `force` discards the remembered state before
    /// deciding, so the update is sent even when nothing changed. The wipe
    /// happens up front: if the forced delivery then fails, the next
    /// regular run still sees no prior state and retries.
    pub async fn run(&self, interfaces: &[String], force: bool) -> UpdateOutcome {
        match self.try_run(interfaces, force).await {
            Ok(outcome) => outcome,
            Err(err) => UpdateOutcome::Failed(err),
        }
    }

    async fn try_run(&self, interfaces: &[String], force: bool) -> Result<UpdateOutcome> {
        if force {
            if let Some(store) = &self.store {
                debug!("forced update, discarding remembered state");
                store.clear().await;
            }
        }
        let last = match &self.store {
            Some(store) => store.load().await,
            None => None,
        };

        let current = PublishedState {
            hostname: self.hostname.clone(),
            addresses: self.collector.collect(interfaces)?,
        };

        if decide(&current, last.as_ref()) == Decision::Skip {
            info!(hostname = %self.hostname, "addresses unchanged, nothing to do");
            return Ok(UpdateOutcome::Skipped);
        }

        self.dispatcher
            .dispatch(&self.fqdn, &self.zone, &self.families, &current.addresses)
            .await?;

        if let Some(store) = &self.store {
            // The nameserver already accepted the update at this point.
            if let Err(err) = store.save(&current).await {
                warn!(
                    hostname = %self.hostname,
                    "update accepted, but saving the published state failed: {}", err
                );
                return Err(match err {
                    Error::StateStore(_) => err,
                    other => Error::state_store(other.to_string()),
                });
            }
        }
        Ok(UpdateOutcome::Published)
    }
}

/// The name to publish: the configured override, or the system hostname.
fn resolve_hostname(config: &Config) -> Result<String> {
    match &config.hostname {
        Some(name) => Ok(name.trim_end_matches('.').to_string()),
        None => gethostname::gethostname()
            .into_string()
            .map_err(|_| Error::config("system hostname is not valid UTF-8")),
    }
}

//! Address collection
//!
//! The collector walks the selected network interfaces, asks the address
//! source for each interface's raw addresses per enabled family, and folds
//! the accepted addresses into an [`AddressSet`]. The set is the value
//! that change detection compares and that ends up in the persisted state.

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::family::{Family, FamilyName};

/// The addresses to publish, grouped by family.
///
/// Every enabled family has an entry, even when no address survived
/// filtering. The per-family lists are kept sorted so that two collections
/// of the same addresses compare equal regardless of discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressSet {
    families: BTreeMap<FamilyName, Vec<IpAddr>>,
}

impl AddressSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures an entry for `family` exists.
    pub fn insert_family(&mut self, family: FamilyName) {
        self.families.entry(family).or_default();
    }

    /// Appends addresses to a family's list. Duplicates are kept; an
    /// address reachable through two interfaces appears twice.
    pub fn extend(&mut self, family: FamilyName, addresses: impl IntoIterator<Item = IpAddr>) {
        self.families.entry(family).or_default().extend(addresses);
    }

    /// Sorts every family's list in place.
    pub fn sort(&mut self) {
        for addresses in self.families.values_mut() {
            addresses.sort();
        }
    }

    /// The addresses collected for one family, if the family is present.
    pub fn get(&self, family: FamilyName) -> Option<&[IpAddr]> {
        self.families.get(&family).map(Vec::as_slice)
    }

    /// Iterates over families and their address lists.
    pub fn iter(&self) -> impl Iterator<Item = (FamilyName, &[IpAddr])> {
        self.families
            .iter()
            .map(|(family, addresses)| (*family, addresses.as_slice()))
    }

    /// Returns whether no family holds any address.
    pub fn is_empty(&self) -> bool {
        self.families.values().all(Vec::is_empty)
    }
}

/// Access to the machine's network interfaces.
///
/// Implementations enumerate interface names and report the raw, unfiltered
/// addresses assigned to one interface, preserving the operating system's
/// enumeration order. The order matters: the IPv6 permanent-address
/// reduction depends on it.
pub trait AddressSource: Send + Sync {
    /// Names of all interfaces on the machine.
    fn interfaces(&self) -> Result<Vec<String>>;

    /// Raw addresses of `interface` for one family, in enumeration order.
    fn addresses(&self, interface: &str, family: FamilyName) -> Result<Vec<IpAddr>>;
}

/// Collects the publishable addresses of a set of interfaces.
pub struct AddressCollector {
    source: Box<dyn AddressSource>,
    families: Vec<Family>,
}

impl AddressCollector {
    /// Creates a collector for the given enabled families.
    ///
    /// An empty family set is a configuration error: a run that can never
    /// publish anything is a misconfiguration, not a no-op.
    pub fn new(source: Box<dyn AddressSource>, families: Vec<Family>) -> Result<Self> {
        if families.is_empty() {
            return Err(Error::config("no address families are enabled"));
        }
        Ok(Self { source, families })
    }

    /// Collects addresses from `interfaces`, or from every interface on the
    /// machine when the list is empty.
    ///
    /// An interface whose addresses cannot be read contributes nothing; the
    /// failure is logged and the run continues with the other interfaces.
    pub fn collect(&self, interfaces: &[String]) -> Result<AddressSet> {
        let all;
        let selected: &[String] = if interfaces.is_empty() {
            all = self.source.interfaces()?;
            &all
        } else {
            interfaces
        };

        let mut set = AddressSet::new();
        for family in &self.families {
            set.insert_family(family.name());
        }
        for interface in selected {
            for family in &self.families {
                match self.source.addresses(interface, family.name()) {
                    Ok(raw) => set.extend(family.name(), family.filter(&raw)),
                    Err(err) => {
                        debug!(interface = %interface, family = %family.name(),
                            "skipping unreadable interface: {}", err);
                    }
                }
            }
        }
        set.sort();
        Ok(set)
    }
}

//! Address family policy
//!
//! Each enabled address family decides which raw addresses are worth
//! publishing and knows how to turn an accepted address into the matching
//! resource record. The family set is closed: IPv4 and IPv6.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use domain::base::iana::Class;
use domain::base::message_builder::AuthorityBuilder;
use domain::base::name::Dname;
use domain::base::record::Ttl;
use domain::base::wire::Composer;
use domain::rdata::{A, Aaaa};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::platform::Platform;

/// Stable name of an address family.
///
/// Used as the key in the persisted-state file and as the discriminator
/// when fetching raw addresses from an interface.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FamilyName {
    Ipv4,
    Ipv6,
}

impl fmt::Display for FamilyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FamilyName::Ipv4 => f.write_str("ipv4"),
            FamilyName::Ipv6 => f.write_str("ipv6"),
        }
    }
}

/// An enabled address family together with its filtering policy.
#[derive(Clone, Copy, Debug)]
pub enum Family {
    /// IPv4; no platform dependency
    V4,
    /// IPv6; needs the platform convention for permanent-address reduction
    /// and the Teredo acceptance flag
    V6 { platform: Platform, teredo: bool },
}

impl Family {
    /// Builds the enabled family set from the configuration.
    pub fn enabled(config: &Config, platform: Platform) -> Vec<Family> {
        let mut families = Vec::new();
        if config.ipv4 {
            families.push(Family::V4);
        }
        if config.ipv6.enable {
            families.push(Family::V6 {
                platform,
                teredo: config.ipv6.teredo,
            });
        }
        families
    }

    /// The family's stable name.
    pub fn name(&self) -> FamilyName {
        match self {
            Family::V4 => FamilyName::Ipv4,
            Family::V6 { .. } => FamilyName::Ipv6,
        }
    }

    /// Filters one interface's raw addresses down to the publishable ones.
    ///
    /// Addresses of the wrong family are dropped. For IPv6 the surviving
    /// candidates are additionally reduced to the platform's permanent
    /// subset, so that privacy-extension addresses do not make the record
    /// flap on every rotation.
    pub fn filter(&self, raw: &[IpAddr]) -> Vec<IpAddr> {
        match *self {
            Family::V4 => raw
                .iter()
                .filter_map(|addr| match addr {
                    IpAddr::V4(v4) if eligible_v4(*v4) => Some(IpAddr::V4(*v4)),
                    _ => None,
                })
                .collect(),
            Family::V6 { platform, teredo } => {
                let eligible: Vec<Ipv6Addr> = raw
                    .iter()
                    .filter_map(|addr| match addr {
                        IpAddr::V6(v6) if eligible_v6(*v6, teredo) => Some(*v6),
                        _ => None,
                    })
                    .collect();
                platform
                    .permanent_ipv6_addresses(eligible)
                    .into_iter()
                    .map(IpAddr::V6)
                    .collect()
            }
        }
    }

    /// Appends the resource record for one accepted address to the update
    /// section of an update transaction.
    pub fn push_record<Target: Composer>(
        &self,
        update: &mut AuthorityBuilder<Target>,
        name: &Dname<Vec<u8>>,
        ttl: Ttl,
        address: IpAddr,
    ) -> Result<()> {
        match (self, address) {
            (Family::V4, IpAddr::V4(v4)) => update
                .push((name, Class::In, ttl, A::new(v4)))
                .map_err(|e| Error::protocol(format!("failed to add A record: {}", e))),
            (Family::V6 { .. }, IpAddr::V6(v6)) => update
                .push((name, Class::In, ttl, Aaaa::new(v6)))
                .map_err(|e| Error::protocol(format!("failed to add AAAA record: {}", e))),
            _ => Err(Error::protocol(format!(
                "address {} does not belong to family {}",
                address,
                self.name()
            ))),
        }
    }
}

/// IPv4 eligibility.
///
/// Most NICs have a single IPv4 address and there is no clear rule for
/// handling several, so every acceptable address is kept: private and
/// globally routable ranges alike. Loopback, link-local, multicast, and
/// the reserved block (leading octet 240 and up) are rejected.
fn eligible_v4(addr: Ipv4Addr) -> bool {
    !(addr.is_loopback() || addr.is_link_local() || addr.octets()[0] >= 224)
}

/// IPv6 eligibility, first matching rule wins.
fn eligible_v6(addr: Ipv6Addr, teredo: bool) -> bool {
    let groups = addr.segments();
    if groups[0] == 0x0000 {
        // Unspecified, loopback, and IPv4-mapped addresses.
        return false;
    }
    if groups[0] == 0x0100 {
        // Discard-only prefix (RFC 6666).
        return false;
    }
    if groups[0] & 0xfe00 == 0xfc00 {
        // Unique-local.
        return false;
    }
    if groups[0] & 0xffc0 == 0xfe80 {
        // Link-local.
        return false;
    }
    if groups[0] & 0xff00 == 0xff00 {
        // Multicast.
        return false;
    }
    if groups[0] == 0x2001 && groups[1] == 0x0000 {
        // Teredo tunnel addresses are usually not worth publishing, but
        // they can be enabled explicitly.
        return teredo;
    }
    true
}

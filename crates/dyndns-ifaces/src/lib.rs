//! System address source backed by `getifaddrs`.
//!
//! Enumeration order is passed through untouched: the IPv6 permanent
//! address reduction in the core crate relies on the order the operating
//! system reports addresses in.

use std::net::IpAddr;

use dyndns_core::{AddressSource, FamilyName, Result};

/// Reads interface names and addresses from the operating system.
#[derive(Debug, Default)]
pub struct SystemAddressSource;

impl SystemAddressSource {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl AddressSource for SystemAddressSource {
    fn interfaces(&self) -> Result<Vec<String>> {
        let entries = nix::ifaddrs::getifaddrs()
            .map_err(|e| dyndns_core::Error::source(format!("getifaddrs failed: {}", e)))?;
        let mut names: Vec<String> = Vec::new();
        for entry in entries {
            if !names.contains(&entry.interface_name) {
                names.push(entry.interface_name);
            }
        }
        Ok(names)
    }

    fn addresses(&self, interface: &str, family: FamilyName) -> Result<Vec<IpAddr>> {
        let entries = nix::ifaddrs::getifaddrs()
            .map_err(|e| dyndns_core::Error::source(format!("getifaddrs failed: {}", e)))?;
        let mut addresses = Vec::new();
        for entry in entries {
            if entry.interface_name != interface {
                continue;
            }
            let Some(address) = entry.address else {
                continue;
            };
            match family {
                FamilyName::Ipv4 => {
                    if let Some(sin) = address.as_sockaddr_in() {
                        addresses.push(IpAddr::V4(sin.ip()));
                    }
                }
                FamilyName::Ipv6 => {
                    if let Some(sin6) = address.as_sockaddr_in6() {
                        addresses.push(IpAddr::V6(sin6.ip()));
                    }
                }
            }
        }
        Ok(addresses)
    }
}

#[cfg(not(unix))]
impl AddressSource for SystemAddressSource {
    fn interfaces(&self) -> Result<Vec<String>> {
        Err(dyndns_core::Error::source(
            "interface enumeration is not supported on this platform",
        ))
    }

    fn addresses(&self, _interface: &str, _family: FamilyName) -> Result<Vec<IpAddr>> {
        Err(dyndns_core::Error::source(
            "interface enumeration is not supported on this platform",
        ))
    }
}

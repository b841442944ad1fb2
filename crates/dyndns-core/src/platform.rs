//! Operating-system specific conventions
//!
//! Interface enumeration returns IPv6 addresses without any metadata that
//! would distinguish a permanent address from the temporary ones generated
//! by RFC 4941 privacy extensions. The addresses themselves are
//! indistinguishable, but operating systems enumerate them in a consistent
//! order, so the reduction to the permanent address is a per-platform
//! convention on the enumeration order.
//!
//! The set of platforms is closed; there is no open extension point.

use std::env;
use std::net::Ipv6Addr;
use std::path::PathBuf;

/// A specific operating system's conventions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    /// POSIX systems (Linux and friends)
    Posix,
    /// Windows
    Windows,
    /// Anything else
    Unknown,
}

impl Platform {
    /// Returns the platform the program was built for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(unix) {
            Platform::Posix
        } else {
            Platform::Unknown
        }
    }

    /// Reduces an interface's eligible IPv6 addresses to the permanent ones.
    ///
    /// The input is the enumeration-ordered list for a single interface.
    /// An empty input stays empty. On platforms with a known ordering
    /// convention exactly one address is returned; on unknown platforms the
    /// full list is returned and multiple ephemeral addresses may end up
    /// being published.
    pub fn permanent_ipv6_addresses(self, addresses: Vec<Ipv6Addr>) -> Vec<Ipv6Addr> {
        if addresses.is_empty() {
            return addresses;
        }
        match self {
            // Linux enumerates temporary addresses first, permanent last.
            Platform::Posix => vec![*addresses.last().unwrap()],
            // Windows enumerates the permanent address first.
            Platform::Windows => vec![addresses[0]],
            // No known convention, keep everything.
            Platform::Unknown => addresses,
        }
    }

    /// Default location of the configuration file.
    pub fn default_config_path(self) -> PathBuf {
        match self {
            Platform::Posix => PathBuf::from("/etc/dyndns.conf"),
            Platform::Windows => env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|dir| dir.join("dyndns.conf")))
                .unwrap_or_else(|| PathBuf::from("dyndns.conf")),
            Platform::Unknown => PathBuf::from("dyndns.conf"),
        }
    }

    /// Default location of the persisted-state file.
    pub fn default_cache_path(self) -> PathBuf {
        match self {
            Platform::Posix => PathBuf::from("/run/dyndns.cache"),
            Platform::Windows => windows_local_app_data()
                .join("Temp")
                .join("dyndns.cache"),
            Platform::Unknown => PathBuf::from("dyndns.cache"),
        }
    }
}

/// `%LOCALAPPDATA%`, falling back to the conventional location under the
/// user profile when the variable is unset.
fn windows_local_app_data() -> PathBuf {
    match env::var_os("LOCALAPPDATA") {
        Some(dir) => PathBuf::from(dir),
        None => match env::var_os("USERPROFILE") {
            Some(home) => PathBuf::from(home).join("AppData").join("Local"),
            None => PathBuf::from("."),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(text: &str) -> Ipv6Addr {
        text.parse().unwrap()
    }

    #[test]
    fn empty_input_stays_empty_under_every_convention() {
        for platform in [Platform::Posix, Platform::Windows, Platform::Unknown] {
            assert!(platform.permanent_ipv6_addresses(Vec::new()).is_empty());
        }
    }

    #[test]
    fn single_element_survives_under_every_convention() {
        let only = addr("2001:db8::1");
        for platform in [Platform::Posix, Platform::Windows, Platform::Unknown] {
            assert_eq!(platform.permanent_ipv6_addresses(vec![only]), vec![only]);
        }
    }

    #[test]
    fn posix_keeps_the_last_discovered_address() {
        let temporary = addr("2001:db8::aaaa");
        let permanent = addr("2001:db8::1");
        assert_eq!(
            Platform::Posix.permanent_ipv6_addresses(vec![temporary, permanent]),
            vec![permanent]
        );
    }

    #[test]
    fn windows_keeps_the_first_discovered_address() {
        let permanent = addr("2001:db8::1");
        let temporary = addr("2001:db8::aaaa");
        assert_eq!(
            Platform::Windows.permanent_ipv6_addresses(vec![permanent, temporary]),
            vec![permanent]
        );
    }

    #[test]
    fn unknown_platform_keeps_everything() {
        let addresses = vec![addr("2001:db8::1"), addr("2001:db8::2")];
        assert_eq!(
            Platform::Unknown.permanent_ipv6_addresses(addresses.clone()),
            addresses
        );
    }
}

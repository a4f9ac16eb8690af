//! CIDR subnets used to scope an inventory to a network.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::InventoryError;

/// An IPv4 or IPv6 network in CIDR notation.
///
/// A bare address parses as a host route (`/32` or `/128`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subnet {
    network: IpAddr,
    prefix_len: u8,
}

impl Subnet {
    /// Creates a subnet, masking host bits out of `network`.
    ///
    /// # Errors
    ///
    /// Returns an error if `prefix_len` exceeds the address width.
    pub fn new(network: IpAddr, prefix_len: u8) -> Result<Self, InventoryError> {
        if prefix_len > max_prefix(&network) {
            return Err(InventoryError::InvalidSubnet {
                spec: format!("{network}/{prefix_len}"),
            });
        }
        let network = match network {
            IpAddr::V4(addr) => IpAddr::V4((u32::from(addr) & v4_mask(prefix_len)).into()),
            IpAddr::V6(addr) => IpAddr::V6((u128::from(addr) & v6_mask(prefix_len)).into()),
        };
        Ok(Self {
            network,
            prefix_len,
        })
    }

    /// Returns the network address.
    #[must_use]
    pub const fn network(&self) -> IpAddr {
        self.network
    }

    /// Returns the prefix length.
    #[must_use]
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Returns true if `addr` lies inside this subnet.
    ///
    /// Addresses of the other family are never contained.
    #[must_use]
    pub fn contains(&self, addr: &IpAddr) -> bool {
        match (self.network, addr) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                u32::from(*ip) & v4_mask(self.prefix_len) == u32::from(net)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                u128::from(*ip) & v6_mask(self.prefix_len) == u128::from(net)
            }
            _ => false,
        }
    }

    /// Returns true if `host` is an IP address inside this subnet.
    ///
    /// Hostnames are not resolved and are never contained.
    #[must_use]
    pub fn contains_host(&self, host: &str) -> bool {
        host.parse::<IpAddr>()
            .is_ok_and(|addr| self.contains(&addr))
    }
}

impl FromStr for Subnet {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InventoryError::InvalidSubnet {
            spec: s.to_string(),
        };

        let (addr, prefix) = match s.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s, None),
        };
        let network: IpAddr = addr.trim().parse().map_err(|_| invalid())?;
        let prefix_len = match prefix {
            Some(p) => p.trim().parse::<u8>().map_err(|_| invalid())?,
            None => max_prefix(&network),
        };

        Self::new(network, prefix_len).map_err(|_| invalid())
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

const fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn v4_mask(prefix_len: u8) -> u32 {
    u32::MAX
        .checked_shl(32 - u32::from(prefix_len))
        .unwrap_or(0)
}

fn v6_mask(prefix_len: u8) -> u128 {
    u128::MAX
        .checked_shl(128 - u32::from(prefix_len))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cidr() {
        let subnet: Subnet = "10.0.0.17/24".parse().unwrap();
        assert_eq!(subnet.to_string(), "10.0.0.0/24");
        assert_eq!(subnet.prefix_len(), 24);
    }

    #[test]
    fn test_bare_address_is_host_route() {
        let subnet: Subnet = "192.168.1.5".parse().unwrap();
        assert_eq!(subnet.prefix_len(), 32);
        assert!(subnet.contains_host("192.168.1.5"));
        assert!(!subnet.contains_host("192.168.1.6"));
    }

    #[test]
    fn test_contains() {
        let subnet: Subnet = "10.1.0.0/16".parse().unwrap();
        assert!(subnet.contains_host("10.1.200.3"));
        assert!(!subnet.contains_host("10.2.0.1"));
        assert!(!subnet.contains_host("node1.example.com"));
        assert!(!subnet.contains_host("::1"));
    }

    #[test]
    fn test_zero_prefix_contains_everything() {
        let subnet: Subnet = "0.0.0.0/0".parse().unwrap();
        assert!(subnet.contains_host("8.8.8.8"));
    }

    #[test]
    fn test_ipv6() {
        let subnet: Subnet = "fd00::/8".parse().unwrap();
        assert!(subnet.contains_host("fd12:3456::1"));
        assert!(!subnet.contains_host("fe80::1"));
    }

    #[test]
    fn test_invalid() {
        assert!("10.0.0.0/33".parse::<Subnet>().is_err());
        assert!("not-an-ip/24".parse::<Subnet>().is_err());
        assert!("10.0.0.0/x".parse::<Subnet>().is_err());
    }
}

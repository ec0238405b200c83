//! The `ip` extension type: a CIDR-normalized address range.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// An IP range normalized to its first and last address. Single addresses
/// parse as `/32` (IPv4) or `/128` (IPv6) ranges, so every value compares
/// by its canonical range bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IpRange {
    first: IpAddr,
    last: IpAddr,
}

impl IpRange {
    /// Parse `"10.0.0.1"`, `"10.0.0.0/8"`, or the IPv6 equivalents.
    pub fn parse(s: &str) -> Result<IpRange, String> {
        let (addr_text, prefix_text) = match s.split_once('/') {
            Some((a, p)) => (a, Some(p)),
            None => (s, None),
        };
        let addr: IpAddr = addr_text.parse().map_err(|_| "invalid ip".to_string())?;
        let bits = match addr {
            IpAddr::V4(_) => 32u32,
            IpAddr::V6(_) => 128u32,
        };
        let prefix: u32 = match prefix_text {
            Some(p) => p.parse().map_err(|_| "invalid ip".to_string())?,
            None => bits,
        };
        if prefix > bits {
            return Err("invalid ip".into());
        }

        match addr {
            IpAddr::V4(v4) => {
                let value = u32::from(v4);
                let mask = if prefix == 0 {
                    0
                } else {
                    u32::MAX << (32 - prefix)
                };
                Ok(IpRange {
                    first: IpAddr::V4(Ipv4Addr::from(value & mask)),
                    last: IpAddr::V4(Ipv4Addr::from(value | !mask)),
                })
            }
            IpAddr::V6(v6) => {
                let value = u128::from(v6);
                let mask = if prefix == 0 {
                    0
                } else {
                    u128::MAX << (128 - prefix)
                };
                Ok(IpRange {
                    first: IpAddr::V6(Ipv6Addr::from(value & mask)),
                    last: IpAddr::V6(Ipv6Addr::from(value | !mask)),
                })
            }
        }
    }

    pub fn is_ipv4(&self) -> bool {
        self.first.is_ipv4()
    }

    pub fn is_ipv6(&self) -> bool {
        self.first.is_ipv6()
    }

    /// Classification holds only when both ends of the range qualify.
    pub fn is_loopback(&self) -> bool {
        self.first.is_loopback() && self.last.is_loopback()
    }

    pub fn is_multicast(&self) -> bool {
        self.first.is_multicast() && self.last.is_multicast()
    }

    /// True when `other` lies entirely within this range. Ranges of mixed
    /// address families never contain each other.
    pub fn contains_range(&self, other: &IpRange) -> bool {
        match (self.first, self.last, other.first, other.last) {
            (IpAddr::V4(sf), IpAddr::V4(sl), IpAddr::V4(of), IpAddr::V4(ol)) => {
                u32::from(sf) <= u32::from(of) && u32::from(ol) <= u32::from(sl)
            }
            (IpAddr::V6(sf), IpAddr::V6(sl), IpAddr::V6(of), IpAddr::V6(ol)) => {
                u128::from(sf) <= u128::from(of) && u128::from(ol) <= u128::from(sl)
            }
            _ => false,
        }
    }
}

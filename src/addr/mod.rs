//! IP address model and CIDR/range conversion.
//!
//! This module unifies IPv4 and IPv6 into a single ordered-integer
//! representation with version tagging. Every higher-level component
//! (interval algebra, allocation engine, free-space search, splitter)
//! builds on the types defined here.

pub mod parse;

pub use parse::{parse_entry, parse_lines, Entry, ParseError};

use std::cmp::Ordering;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// IP protocol version tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// Address width in bits: 32 for IPv4, 128 for IPv6.
    pub fn bits(&self) -> u8 {
        match self {
            IpVersion::V4 => 32,
            IpVersion::V6 => 128,
        }
    }

    /// Highest representable address magnitude for this version.
    pub fn max_value(&self) -> u128 {
        match self {
            IpVersion::V4 => u32::MAX as u128,
            IpVersion::V6 => u128::MAX,
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IpVersion::V4 => write!(f, "IPv4"),
            IpVersion::V6 => write!(f, "IPv6"),
        }
    }
}

/// Render a raw magnitude as address text for the given version.
pub(crate) fn format_value(version: IpVersion, value: u128) -> String {
    match version {
        IpVersion::V4 => Ipv4Addr::from(value as u32).to_string(),
        IpVersion::V6 => Ipv6Addr::from(value).to_string(),
    }
}

/// A (version, magnitude) pair. Immutable once constructed.
///
/// Ordering is total by magnitude within a version; comparing across
/// versions yields `None` from `partial_cmp` rather than an arbitrary
/// answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    version: IpVersion,
    value: u128,
}

impl Address {
    /// Construct an address, rejecting magnitudes that exceed the
    /// version's bit width.
    pub fn new(version: IpVersion, value: u128) -> Result<Self, ParseError> {
        if value > version.max_value() {
            return Err(ParseError::Overflow(version));
        }
        Ok(Address { version, value })
    }

    pub fn version(&self) -> IpVersion {
        self.version
    }

    pub fn value(&self) -> u128 {
        self.value
    }

    /// Add an offset, rejecting results outside the version's space.
    pub fn checked_add(&self, offset: u128) -> Result<Self, ParseError> {
        let value = self
            .value
            .checked_add(offset)
            .ok_or(ParseError::Overflow(self.version))?;
        Address::new(self.version, value)
    }

    /// Subtract an offset, rejecting results below zero.
    pub fn checked_sub(&self, offset: u128) -> Result<Self, ParseError> {
        let value = self
            .value
            .checked_sub(offset)
            .ok_or(ParseError::Overflow(self.version))?;
        Ok(Address {
            version: self.version,
            value,
        })
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.version != other.version {
            return None;
        }
        self.value.partial_cmp(&other.value)
    }
}

impl From<Ipv4Addr> for Address {
    fn from(addr: Ipv4Addr) -> Self {
        Address {
            version: IpVersion::V4,
            value: u32::from(addr) as u128,
        }
    }
}

impl From<Ipv6Addr> for Address {
    fn from(addr: Ipv6Addr) -> Self {
        Address {
            version: IpVersion::V6,
            value: u128::from(addr),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format_value(self.version, self.value))
    }
}

/// A closed interval [start, end] of same-version addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    version: IpVersion,
    start: u128,
    end: u128,
}

impl Range {
    /// Construct a range from two addresses. Both ends must share a
    /// version and satisfy `start <= end`.
    pub fn new(start: Address, end: Address) -> Result<Self, ParseError> {
        if start.version != end.version {
            return Err(ParseError::MixedVersion);
        }
        if start.value > end.value {
            return Err(ParseError::InvalidRangeOrder);
        }
        Ok(Range {
            version: start.version,
            start: start.value,
            end: end.value,
        })
    }

    /// Construct from raw bounds already known to be ordered and in
    /// range for the version. Internal use only.
    pub(crate) fn from_bounds(version: IpVersion, start: u128, end: u128) -> Self {
        debug_assert!(start <= end);
        debug_assert!(end <= version.max_value());
        Range {
            version,
            start,
            end,
        }
    }

    pub fn version(&self) -> IpVersion {
        self.version
    }

    pub fn start(&self) -> u128 {
        self.start
    }

    pub fn end(&self) -> u128 {
        self.end
    }

    pub fn start_addr(&self) -> Address {
        Address {
            version: self.version,
            value: self.start,
        }
    }

    pub fn end_addr(&self) -> Address {
        Address {
            version: self.version,
            value: self.end,
        }
    }

    /// Number of addresses in the range. `None` stands for the full
    /// 2^128 IPv6 space, whose inclusive length does not fit in u128.
    pub fn len(&self) -> Option<u128> {
        (self.end - self.start).checked_add(1)
    }

    pub fn contains_value(&self, value: u128) -> bool {
        value >= self.start && value <= self.end
    }

    /// True when the two ranges share a version and at least one address.
    pub fn overlaps(&self, other: &Range) -> bool {
        self.version == other.version && self.start <= other.end && other.start <= self.end
    }

    /// True when `other` lies entirely inside this range.
    pub fn contains_range(&self, other: &Range) -> bool {
        self.version == other.version && self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            format_value(self.version, self.start),
            format_value(self.version, self.end)
        )
    }
}

/// A CIDR block: a power-of-two sized, boundary-aligned range carrying
/// its prefix length. The network address is always floored to the
/// prefix boundary on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CidrBlock {
    version: IpVersion,
    network: u128,
    prefix: u8,
}

impl CidrBlock {
    /// Construct a block from any address within it. Non-aligned
    /// addresses are normalized down to the containing network, so
    /// `192.168.1.15/24` becomes `192.168.1.0/24`.
    pub fn new(addr: Address, prefix: u8) -> Result<Self, ParseError> {
        let bits = addr.version.bits();
        if prefix > bits {
            return Err(ParseError::InvalidPrefix(format!(
                "/{} is out of range for {}",
                prefix,
                addr.version()
            )));
        }
        let network = addr.value & prefix_mask(addr.version, prefix);
        Ok(CidrBlock {
            version: addr.version,
            prefix,
            network,
        })
    }

    /// Construct from parts already known to be aligned. Internal use.
    pub(crate) fn from_parts(version: IpVersion, network: u128, prefix: u8) -> Self {
        debug_assert!(prefix <= version.bits());
        debug_assert_eq!(network & prefix_mask(version, prefix), network);
        CidrBlock {
            version,
            prefix,
            network,
        }
    }

    pub fn version(&self) -> IpVersion {
        self.version
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn network(&self) -> u128 {
        self.network
    }

    pub fn network_addr(&self) -> Address {
        Address {
            version: self.version,
            value: self.network,
        }
    }

    /// Number of host bits (address bits minus prefix length).
    pub fn host_bits(&self) -> u8 {
        self.version.bits() - self.prefix
    }

    /// Block size, always an exact power of two. `None` stands for the
    /// full 2^128 IPv6 space (prefix 0).
    pub fn size(&self) -> Option<u128> {
        block_len(self.version, self.prefix)
    }

    /// Highest address in the block (the broadcast address for IPv4).
    pub fn last(&self) -> u128 {
        self.network | host_mask(self.version, self.prefix)
    }

    pub fn last_addr(&self) -> Address {
        Address {
            version: self.version,
            value: self.last(),
        }
    }

    pub fn range(&self) -> Range {
        Range {
            version: self.version,
            start: self.network,
            end: self.last(),
        }
    }

    /// Usable host count per the point-to-point convention: IPv4 blocks
    /// of 4+ addresses reserve network and broadcast; /31 and /32 do
    /// not. IPv6 reserves at most the network address, and only when
    /// the caller asks for the first-host convention.
    pub fn usable_hosts(&self, first_host_convention: bool) -> Option<u128> {
        match self.version {
            IpVersion::V4 => {
                let size = self.size().expect("IPv4 sizes always fit in u128");
                if size >= 4 {
                    Some(size - 2)
                } else {
                    Some(size)
                }
            }
            IpVersion::V6 => match self.size() {
                None => None,
                Some(size) if first_host_convention && size > 1 => Some(size - 1),
                Some(size) => Some(size),
            },
        }
    }

    /// First assignable address per the usable-host rules above.
    pub fn first_usable(&self, first_host_convention: bool) -> Address {
        let offset = match self.version {
            IpVersion::V4 if self.host_bits() >= 2 => 1,
            IpVersion::V4 => 0,
            IpVersion::V6 if first_host_convention && self.host_bits() >= 1 => 1,
            IpVersion::V6 => 0,
        };
        Address {
            version: self.version,
            value: self.network + offset,
        }
    }

    /// Last assignable address per the usable-host rules above.
    pub fn last_usable(&self) -> Address {
        let offset = match self.version {
            IpVersion::V4 if self.host_bits() >= 2 => 1,
            _ => 0,
        };
        Address {
            version: self.version,
            value: self.last() - offset,
        }
    }

    /// True when `other` is fully contained in this block.
    pub fn contains_block(&self, other: &CidrBlock) -> bool {
        self.version == other.version
            && self.prefix <= other.prefix
            && (other.network & prefix_mask(self.version, self.prefix)) == self.network
    }
}

impl fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            format_value(self.version, self.network),
            self.prefix
        )
    }
}

/// Network mask for a prefix length, as a magnitude.
pub(crate) fn prefix_mask(version: IpVersion, prefix: u8) -> u128 {
    let bits = version.bits();
    debug_assert!(prefix <= bits);
    if prefix == 0 {
        0
    } else {
        (u128::MAX << (128 - prefix as u32)) >> (128 - bits as u32)
    }
}

/// Host mask (inverse of the network mask within the version's width).
pub(crate) fn host_mask(version: IpVersion, prefix: u8) -> u128 {
    version.max_value() & !prefix_mask(version, prefix)
}

/// Number of addresses in a block at the given prefix. `None` stands
/// for the full 2^128 IPv6 space.
pub fn block_len(version: IpVersion, prefix: u8) -> Option<u128> {
    let host_bits = (version.bits() - prefix) as u32;
    if host_bits >= 128 {
        None
    } else {
        Some(1u128 << host_bits)
    }
}

/// Smallest prefix length whose block satisfies the requested host
/// count.
///
/// With `usable` set, IPv4 follows the point-to-point convention from
/// [`CidrBlock::usable_hosts`]: 1 host maps to /32, 2 hosts to /31,
/// and 3+ hosts require two extra addresses for network and broadcast.
/// IPv6 reserves one address for the network under the same flag.
pub fn prefix_for_hosts(version: IpVersion, hosts: u128, usable: bool) -> Result<u8, String> {
    if hosts == 0 {
        return Err("requested host count must be greater than zero".to_string());
    }
    let needed = if usable {
        match version {
            IpVersion::V4 if hosts <= 2 => hosts,
            IpVersion::V4 => hosts
                .checked_add(2)
                .ok_or_else(|| format!("host count {} exceeds the {} space", hosts, version))?,
            IpVersion::V6 if hosts == 1 => 1,
            IpVersion::V6 => hosts
                .checked_add(1)
                .ok_or_else(|| format!("host count {} exceeds the {} space", hosts, version))?,
        }
    } else {
        hosts
    };
    let size = needed
        .checked_next_power_of_two()
        .ok_or_else(|| format!("host count {} exceeds the {} space", hosts, version))?;
    let host_bits = size.trailing_zeros() as u8;
    if host_bits > version.bits() {
        return Err(format!(
            "host count {} exceeds the {} space",
            hosts, version
        ));
    }
    Ok(version.bits() - host_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(text: &str) -> Address {
        Address::from(text.parse::<Ipv4Addr>().unwrap())
    }

    #[test]
    fn test_address_ordering_within_version() {
        let a = v4("10.0.0.1");
        let b = v4("10.0.0.2");
        assert!(a < b);
    }

    #[test]
    fn test_address_ordering_across_versions_is_undefined() {
        let a = v4("10.0.0.1");
        let b = Address::from("::1".parse::<Ipv6Addr>().unwrap());
        assert_eq!(a.partial_cmp(&b), None);
    }

    #[test]
    fn test_address_overflow_rejected() {
        assert!(Address::new(IpVersion::V4, u32::MAX as u128).is_ok());
        assert!(matches!(
            Address::new(IpVersion::V4, u32::MAX as u128 + 1),
            Err(ParseError::Overflow(IpVersion::V4))
        ));
        let top = v4("255.255.255.255");
        assert!(top.checked_add(1).is_err());
    }

    #[test]
    fn test_range_rejects_reversed_bounds() {
        let result = Range::new(v4("10.0.0.9"), v4("10.0.0.1"));
        assert!(matches!(result, Err(ParseError::InvalidRangeOrder)));
    }

    #[test]
    fn test_range_rejects_mixed_versions() {
        let b = Address::from("::1".parse::<Ipv6Addr>().unwrap());
        let result = Range::new(v4("10.0.0.1"), b);
        assert!(matches!(result, Err(ParseError::MixedVersion)));
    }

    #[test]
    fn test_cidr_normalizes_to_network_boundary() {
        let block = CidrBlock::new(v4("192.168.1.15"), 24).unwrap();
        assert_eq!(block.to_string(), "192.168.1.0/24");
        assert_eq!(block.last_addr().to_string(), "192.168.1.255");
        assert_eq!(block.size(), Some(256));
    }

    #[test]
    fn test_cidr_rejects_out_of_range_prefix() {
        let result = CidrBlock::new(v4("10.0.0.0"), 33);
        assert!(matches!(result, Err(ParseError::InvalidPrefix(_))));
    }

    #[test]
    fn test_cidr_range_round_trip() {
        let block = CidrBlock::new(v4("10.1.2.0"), 23).unwrap();
        let range = block.range();
        assert_eq!(range.start(), block.network());
        assert_eq!(range.end(), block.last());
        assert_eq!(range.len(), Some(512));
    }

    #[test]
    fn test_usable_hosts_v4_conventions() {
        let slash24 = CidrBlock::new(v4("10.0.0.0"), 24).unwrap();
        assert_eq!(slash24.usable_hosts(true), Some(254));
        assert_eq!(slash24.first_usable(true).to_string(), "10.0.0.1");
        assert_eq!(slash24.last_usable().to_string(), "10.0.0.254");

        // Point-to-point /31 and host /32 have no reservation
        let slash31 = CidrBlock::new(v4("10.0.0.0"), 31).unwrap();
        assert_eq!(slash31.usable_hosts(true), Some(2));
        assert_eq!(slash31.first_usable(true).to_string(), "10.0.0.0");
        assert_eq!(slash31.last_usable().to_string(), "10.0.0.1");

        let slash32 = CidrBlock::new(v4("10.0.0.5"), 32).unwrap();
        assert_eq!(slash32.usable_hosts(true), Some(1));
    }

    #[test]
    fn test_usable_hosts_v6_no_broadcast() {
        let addr = Address::from("2001:db8::".parse::<Ipv6Addr>().unwrap());
        let block = CidrBlock::new(addr, 126).unwrap();
        assert_eq!(block.usable_hosts(false), Some(4));
        assert_eq!(block.usable_hosts(true), Some(3));
        assert_eq!(block.last_usable().to_string(), "2001:db8::3");
    }

    #[test]
    fn test_full_ipv6_space_has_no_finite_size() {
        let addr = Address::from("::".parse::<Ipv6Addr>().unwrap());
        let block = CidrBlock::new(addr, 0).unwrap();
        assert_eq!(block.size(), None);
        assert_eq!(block.range().len(), None);
    }

    #[test]
    fn test_prefix_for_hosts_usable_mapping() {
        assert_eq!(prefix_for_hosts(IpVersion::V4, 1, true), Ok(32));
        assert_eq!(prefix_for_hosts(IpVersion::V4, 2, true), Ok(31));
        assert_eq!(prefix_for_hosts(IpVersion::V4, 10, true), Ok(28));
        assert_eq!(prefix_for_hosts(IpVersion::V4, 50, true), Ok(26));
        assert_eq!(prefix_for_hosts(IpVersion::V4, 100, true), Ok(25));
        assert_eq!(prefix_for_hosts(IpVersion::V4, 254, true), Ok(24));
    }

    #[test]
    fn test_prefix_for_hosts_raw_mapping() {
        assert_eq!(prefix_for_hosts(IpVersion::V4, 256, false), Ok(24));
        assert_eq!(prefix_for_hosts(IpVersion::V4, 257, false), Ok(23));
        assert_eq!(prefix_for_hosts(IpVersion::V6, 1 << 64, false), Ok(64));
    }

    #[test]
    fn test_prefix_for_hosts_rejects_impossible_requests() {
        assert!(prefix_for_hosts(IpVersion::V4, 0, true).is_err());
        assert!(prefix_for_hosts(IpVersion::V4, u32::MAX as u128 + 1, false).is_err());
    }
}

//! Textual input parsing.
//!
//! This file converts raw text into the address model: single
//! addresses, CIDR notation, and explicit `start-end` ranges for both
//! IPv4 and IPv6. Batch helpers accept newline-separated lists and
//! accumulate per-line failures instead of aborting.

use std::fmt;
use std::net::IpAddr;

use super::{Address, CidrBlock, IpVersion, Range};

/// Typed parse and semantic failures for address model input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid IP address '{0}'")]
    InvalidAddress(String),
    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),
    #[error("start IP is greater than end IP")]
    InvalidRangeOrder,
    #[error("start and end must be the same version")]
    MixedVersion,
    #[error("address arithmetic overflowed the {0} space")]
    Overflow(IpVersion),
}

/// Discriminated parse result: a bare address, a CIDR block, or an
/// explicit start-end range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Address(Address),
    Cidr(CidrBlock),
    Range(Range),
}

impl Entry {
    pub fn version(&self) -> IpVersion {
        match self {
            Entry::Address(a) => a.version(),
            Entry::Cidr(c) => c.version(),
            Entry::Range(r) => r.version(),
        }
    }

    /// The span of addresses the entry occupies. A bare address spans
    /// exactly itself (the /32 or /128 host view).
    pub fn span(&self) -> Range {
        match self {
            Entry::Address(a) => Range::from_bounds(a.version(), a.value(), a.value()),
            Entry::Cidr(c) => c.range(),
            Entry::Range(r) => *r,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Entry::Address(a) => write!(f, "{}", a),
            Entry::Cidr(c) => write!(f, "{}", c),
            Entry::Range(r) => write!(f, "{}", r),
        }
    }
}

/// Parse a single bare address. The standard library parsers enforce
/// the strict forms: four octets 0-255 without leading zeros for IPv4,
/// full or compressed notation with at most one `::` for IPv6.
pub fn parse_address(text: &str) -> Result<Address, ParseError> {
    match text.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => Ok(Address::from(v4)),
        Ok(IpAddr::V6(v6)) => Ok(Address::from(v6)),
        Err(_) => Err(ParseError::InvalidAddress(text.to_string())),
    }
}

/// Parse one input line into an [`Entry`].
///
/// Accepted forms: `10.0.0.1`, `10.0.0.0/24`, `10.0.0.1-10.0.0.9`, and
/// the IPv6 equivalents. Leading and trailing whitespace is trimmed.
/// Non-aligned CIDR input is normalized down to the containing network.
pub fn parse_entry(text: &str) -> Result<Entry, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::InvalidAddress(text.to_string()));
    }

    if let Some((addr_part, prefix_part)) = text.split_once('/') {
        let addr = parse_address(addr_part.trim())?;
        let prefix: u8 = prefix_part
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidPrefix(format!("'{}'", prefix_part.trim())))?;
        return Ok(Entry::Cidr(CidrBlock::new(addr, prefix)?));
    }

    // IPv6 text never contains '-', so a dash always marks a range.
    if let Some((start_part, end_part)) = text.split_once('-') {
        let start = parse_address(start_part.trim())?;
        let end = parse_address(end_part.trim())?;
        return Ok(Entry::Range(Range::new(start, end)?));
    }

    Ok(Entry::Address(parse_address(text)?))
}

/// Parse a newline-separated list of mixed entries.
///
/// Blank and whitespace-only lines are ignored. Failures are collected
/// as human-readable messages carrying the 1-based line number, and do
/// not prevent other lines from parsing.
pub fn parse_lines(text: &str) -> (Vec<Entry>, Vec<String>) {
    let mut entries = Vec::new();
    let mut errors = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_entry(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => errors.push(format!("line {}: {}", idx + 1, e)),
        }
    }
    (entries, errors)
}

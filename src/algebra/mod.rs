//! Interval algebra over address ranges.
//!
//! This module provides the set operations every calculator builds on:
//! coalescing unordered ranges into gap-free spans, covering a span
//! with its minimal CIDR set, and subtracting one collection of ranges
//! from another. The public operations (summarize, compare, alignment
//! checking) live in their own files.

pub mod align;
pub mod compare;
pub mod summarize;

pub use align::{check_alignment, AlignmentCheck, AlignmentReport, Suggestion};
pub use compare::{compare, CompareResult};
pub use summarize::{summarize, SummarizeResult};

use crate::addr::{CidrBlock, Entry, IpVersion, Range};

/// Coalesce same-version ranges into a minimal sorted set of disjoint,
/// non-adjacent spans.
pub fn coalesce_ranges(mut ranges: Vec<Range>) -> Vec<Range> {
    ranges.sort_by_key(|r| r.start());
    let mut out: Vec<Range> = Vec::new();
    for range in ranges {
        match out.last() {
            Some(last) if touches(last, &range) => {
                let merged = Range::from_bounds(
                    last.version(),
                    last.start(),
                    last.end().max(range.end()),
                );
                *out.last_mut().expect("just matched") = merged;
            }
            _ => out.push(range),
        }
    }
    out
}

/// True when `next` overlaps `prev` or starts immediately after it,
/// assuming `prev.start() <= next.start()`.
fn touches(prev: &Range, next: &Range) -> bool {
    debug_assert_eq!(prev.version(), next.version());
    match prev.end().checked_add(1) {
        Some(bound) => next.start() <= bound,
        // prev runs to the top of the space; everything after touches.
        None => true,
    }
}

/// Cover a span with the minimal set of CIDR blocks whose union equals
/// it exactly.
///
/// Greedy left-to-right: at each position emit the largest aligned
/// block that fits in the remaining span, which is the standard CIDR
/// aggregation tie-break (smaller prefix length wins).
pub fn cover_range(range: &Range) -> Vec<CidrBlock> {
    let version = range.version();
    let bits = version.bits() as u32;

    // The full IPv6 space is the one span whose inclusive length does
    // not fit in u128.
    if version == IpVersion::V6 && range.start() == 0 && range.end() == u128::MAX {
        return vec![CidrBlock::from_parts(version, 0, 0)];
    }

    let mut out = Vec::new();
    let mut cur = range.start();
    loop {
        let remaining = range.end() - cur + 1;
        let align_bits = if cur == 0 { bits } else { cur.trailing_zeros() };
        let len_bits = 127 - remaining.leading_zeros();
        let block_bits = align_bits.min(len_bits).min(bits);
        let prefix = (bits - block_bits) as u8;
        out.push(CidrBlock::from_parts(version, cur, prefix));
        let step = 1u128 << block_bits;
        if remaining == step {
            break;
        }
        cur += step;
    }
    out
}

/// Subtract `minus` from `base`, returning the parts of `base` not
/// covered by any range in `minus`. All ranges must share a version;
/// `base` is expected coalesced and sorted.
pub fn subtract_ranges(base: &[Range], minus: &[Range]) -> Vec<Range> {
    let minus = coalesce_ranges(minus.to_vec());
    let mut out = Vec::new();
    for b in base {
        let version = b.version();
        let mut cur = b.start();
        let mut exhausted = false;
        for m in &minus {
            if m.end() < cur {
                continue;
            }
            if m.start() > b.end() {
                break;
            }
            if m.start() > cur {
                out.push(Range::from_bounds(version, cur, m.start() - 1));
            }
            if m.end() >= b.end() {
                exhausted = true;
                break;
            }
            cur = m.end() + 1;
        }
        if !exhausted && cur <= b.end() {
            out.push(Range::from_bounds(version, cur, b.end()));
        }
    }
    out
}

/// Split mixed-version entries into their IPv4 and IPv6 spans.
pub fn spans_by_version(entries: &[Entry]) -> (Vec<Range>, Vec<Range>) {
    let mut v4 = Vec::new();
    let mut v6 = Vec::new();
    for entry in entries {
        match entry.version() {
            IpVersion::V4 => v4.push(entry.span()),
            IpVersion::V6 => v6.push(entry.span()),
        }
    }
    (v4, v6)
}

/// Summarize a collection of same-version ranges into the minimal
/// CIDR set covering their union.
pub fn summarize_ranges(ranges: Vec<Range>) -> Vec<CidrBlock> {
    coalesce_ranges(ranges)
        .iter()
        .flat_map(cover_range)
        .collect()
}

/// Normalize entries to a canonical, deduplicated, sorted CIDR set
/// without merging across entries. Each entry is covered on its own,
/// so distinct blocks stay distinct for comparison purposes.
pub fn canonical_blocks(entries: &[Entry]) -> Vec<CidrBlock> {
    let mut blocks: Vec<CidrBlock> = entries
        .iter()
        .flat_map(|entry| match entry {
            Entry::Cidr(block) => vec![*block],
            other => cover_range(&other.span()),
        })
        .collect();
    blocks.sort();
    blocks.dedup();
    blocks
}

/// Total address count across disjoint ranges. `None` stands for the
/// full 2^128 IPv6 space.
pub fn total_addresses(ranges: &[Range]) -> Option<u128> {
    let mut sum = 0u128;
    for range in ranges {
        sum = sum.checked_add(range.len()?)?;
    }
    Some(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::parse_entry;

    fn span(text: &str) -> Range {
        parse_entry(text).unwrap().span()
    }

    fn blocks_to_strings(blocks: &[CidrBlock]) -> Vec<String> {
        blocks.iter().map(|b| b.to_string()).collect()
    }

    #[test]
    fn test_coalesce_merges_overlapping_and_adjacent() {
        let merged = coalesce_ranges(vec![
            span("10.0.0.0/25"),
            span("10.0.0.128/25"),
            span("10.0.0.64-10.0.0.200"),
            span("10.0.2.0/24"),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].to_string(), "10.0.0.0-10.0.0.255");
        assert_eq!(merged[1].to_string(), "10.0.2.0-10.0.2.255");
    }

    #[test]
    fn test_cover_aligned_span_is_single_block() {
        let blocks = cover_range(&span("192.168.0.0/22"));
        assert_eq!(blocks_to_strings(&blocks), vec!["192.168.0.0/22"]);
    }

    #[test]
    fn test_cover_unaligned_span() {
        // 10.0.0.1 through 10.0.0.8 tiles as /32 + /31 + /30 + /32
        let blocks = cover_range(&span("10.0.0.1-10.0.0.8"));
        assert_eq!(
            blocks_to_strings(&blocks),
            vec!["10.0.0.1/32", "10.0.0.2/31", "10.0.0.4/30", "10.0.0.8/32"]
        );
        // Union of the tiling equals the span exactly
        let total: u128 = blocks.iter().map(|b| b.size().unwrap()).sum();
        assert_eq!(total, 8);
    }

    #[test]
    fn test_cover_full_ipv4_space() {
        let blocks = cover_range(&span("0.0.0.0-255.255.255.255"));
        assert_eq!(blocks_to_strings(&blocks), vec!["0.0.0.0/0"]);
    }

    #[test]
    fn test_cover_full_ipv6_space() {
        let blocks = cover_range(&span("::-ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff"));
        assert_eq!(blocks_to_strings(&blocks), vec!["::/0"]);
    }

    #[test]
    fn test_subtract_carves_gaps() {
        let base = vec![span("10.0.0.0/24")];
        let minus = vec![span("10.0.0.64/26"), span("10.0.0.192/26")];
        let free = subtract_ranges(&base, &minus);
        assert_eq!(free.len(), 2);
        assert_eq!(free[0].to_string(), "10.0.0.0-10.0.0.63");
        assert_eq!(free[1].to_string(), "10.0.0.128-10.0.0.191");
    }

    #[test]
    fn test_subtract_clips_outside_overlap() {
        let base = vec![span("10.0.1.0/24")];
        // Allocation straddles the pool's lower boundary
        let minus = vec![span("10.0.0.128-10.0.1.127")];
        let free = subtract_ranges(&base, &minus);
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].to_string(), "10.0.1.128-10.0.1.255");
    }

    #[test]
    fn test_subtract_everything_leaves_nothing() {
        let base = vec![span("10.0.0.0/24")];
        let minus = vec![span("10.0.0.0/23")];
        assert!(subtract_ranges(&base, &minus).is_empty());
    }

    #[test]
    fn test_summarize_ranges_merges_into_supernet() {
        let blocks = summarize_ranges(vec![span("192.168.0.0/25"), span("192.168.0.128/25")]);
        assert_eq!(blocks_to_strings(&blocks), vec!["192.168.0.0/24"]);
    }

    #[test]
    fn test_canonical_blocks_dedups_without_merging() {
        let entries = vec![
            parse_entry("192.168.0.0/25").unwrap(),
            parse_entry("192.168.0.128/25").unwrap(),
            parse_entry("192.168.0.0/25").unwrap(),
        ];
        let blocks = canonical_blocks(&entries);
        assert_eq!(
            blocks_to_strings(&blocks),
            vec!["192.168.0.0/25", "192.168.0.128/25"]
        );
    }

    #[test]
    fn test_total_addresses() {
        let ranges = vec![span("10.0.0.0/24"), span("10.1.0.0/16")];
        assert_eq!(total_addresses(&ranges), Some(256 + 65536));
        let full = vec![span("::-ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff")];
        assert_eq!(total_addresses(&full), None);
    }
}

//! Free-space search (next-available block finder).
//!
//! Given one or more parent pools and a set of already-made
//! allocations, finds the next unused blocks of a requested size.
//! Allocations may lie partly or wholly outside the pools; they are
//! clipped at pool boundaries and flagged with a warning rather than
//! rejected.

use serde::{Deserialize, Serialize};

use crate::addr::{block_len, parse_lines, prefix_for_hosts, CidrBlock, IpVersion, Range};
use crate::algebra::{coalesce_ranges, subtract_ranges, total_addresses};
use crate::utils::{format_count, usage_bar};

/// Desired candidate size: exactly one of a prefix length or a host
/// count. The CLI enforces the exactly-one rule; callers constructing
/// this directly have already chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockSize {
    Prefix(u8),
    Hosts(u64),
}

/// Candidate selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Lowest-addressed sufficient gap first.
    FirstFit,
    /// Smallest sufficient gap first.
    BestFit,
}

/// A free block of exactly the requested size, with the derived
/// boundary fields callers display. Ephemeral search output.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub cidr: String,
    pub network: String,
    /// Highest address; the broadcast address for IPv4, absent for
    /// IPv6 which has no broadcast concept.
    pub broadcast: Option<String>,
    pub first_usable: String,
    pub last_usable: String,
    pub size: String,
    pub usable_hosts: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchStats {
    pub pool_addresses: String,
    pub allocated_addresses: String,
    pub free_addresses: String,
    pub candidates_found: usize,
}

/// Result record for [`find_next_available`].
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub candidates: Vec<Candidate>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: SearchStats,
    pub visualization: String,
}

/// Find up to `max_candidates` unused blocks of the requested size
/// inside the pools, excluding existing allocations.
///
/// Both `pools` and `allocations` are newline-separated lists mixing
/// addresses, CIDR blocks and ranges. Total free space is computed as
/// a diagnostic even when no candidate fits.
pub fn find_next_available(
    pools: &str,
    allocations: &str,
    want: BlockSize,
    policy: Policy,
    max_candidates: usize,
) -> SearchResult {
    let (pool_entries, pool_errors) = parse_lines(pools);
    let (alloc_entries, alloc_errors) = parse_lines(allocations);

    let mut errors = Vec::new();
    errors.extend(pool_errors.into_iter().map(|e| format!("pools, {}", e)));
    errors.extend(
        alloc_errors
            .into_iter()
            .map(|e| format!("allocations, {}", e)),
    );

    if pool_entries.is_empty() {
        errors.push("no valid pool was given".to_string());
        return empty_result(errors, Vec::new());
    }

    let mut warnings = Vec::new();

    // Allocations that touch no pool at all are suspicious but not
    // fatal; clipping below handles partial overlap.
    let pool_spans: Vec<Range> = pool_entries.iter().map(|e| e.span()).collect();
    for entry in &alloc_entries {
        let span = entry.span();
        if !pool_spans.iter().any(|p| p.overlaps(&span)) {
            warnings.push(format!("allocation {} lies outside all pools", entry));
            log::warn!("allocation {} lies outside all pools", entry);
        }
    }

    let mut candidates = Vec::new();
    let mut pool_total = Some(0u128);
    let mut free_total = Some(0u128);

    for version in [IpVersion::V4, IpVersion::V6] {
        let pools_v: Vec<Range> = pool_spans
            .iter()
            .filter(|r| r.version() == version)
            .copied()
            .collect();
        if pools_v.is_empty() {
            continue;
        }
        let allocs_v: Vec<Range> = alloc_entries
            .iter()
            .map(|e| e.span())
            .filter(|r| r.version() == version)
            .collect();

        let prefix = match resolve_prefix(version, want) {
            Ok(prefix) => Some(prefix),
            Err(e) => {
                errors.push(format!("{} pools skipped: {}", version, e));
                None
            }
        };

        let merged_pools = coalesce_ranges(pools_v);
        let free = subtract_ranges(&merged_pools, &allocs_v);
        pool_total = add_totals(pool_total, total_addresses(&merged_pools));
        free_total = add_totals(free_total, total_addresses(&free));

        if let Some(prefix) = prefix {
            let Some(size) = block_len(version, prefix) else {
                errors.push(format!(
                    "a /{} block is the entire {} space and cannot be searched for",
                    prefix, version
                ));
                continue;
            };
            collect_candidates(
                &free,
                version,
                prefix,
                size,
                policy,
                max_candidates.saturating_sub(candidates.len()),
                &mut candidates,
            );
        }
    }

    let allocated_total = sub_totals(pool_total, free_total);
    let stats = SearchStats {
        pool_addresses: format_count(pool_total),
        allocated_addresses: format_count(allocated_total),
        free_addresses: format_count(free_total),
        candidates_found: candidates.len(),
    };
    log::info!(
        "free-space search found {} candidate(s), {} free of {} pooled",
        stats.candidates_found,
        stats.free_addresses,
        stats.pool_addresses
    );

    let visualization = match (pool_total, allocated_total) {
        (total @ Some(_), Some(used)) => usage_bar(used, total, 40),
        _ => usage_bar(0, None, 40),
    };

    SearchResult {
        candidates,
        errors,
        warnings,
        stats,
        visualization,
    }
}

/// Resolve the desired size to a prefix length for one version.
fn resolve_prefix(version: IpVersion, want: BlockSize) -> Result<u8, String> {
    match want {
        BlockSize::Prefix(prefix) if prefix > version.bits() => Err(format!(
            "prefix /{} is out of range for {}",
            prefix, version
        )),
        BlockSize::Prefix(prefix) => Ok(prefix),
        BlockSize::Hosts(hosts) => prefix_for_hosts(version, hosts as u128, true),
    }
}

/// Enumerate aligned candidate placements from the free ranges.
fn collect_candidates(
    free: &[Range],
    version: IpVersion,
    prefix: u8,
    size: u128,
    policy: Policy,
    limit: usize,
    out: &mut Vec<Candidate>,
) {
    if limit == 0 {
        return;
    }

    let mut gaps: Vec<Range> = free.to_vec();
    if policy == Policy::BestFit {
        // Smallest sufficient gap first; ties stay in address order
        // because the input is sorted and the sort is stable.
        gaps.sort_by_key(|g| g.len().unwrap_or(u128::MAX));
    }

    let mut taken = 0;
    for gap in &gaps {
        let rem = gap.start() % size;
        let mut cursor = if rem == 0 {
            gap.start()
        } else {
            match gap.start().checked_add(size - rem) {
                Some(c) => c,
                None => continue,
            }
        };
        while taken < limit && cursor <= gap.end() && gap.end() - cursor >= size - 1 {
            let block = CidrBlock::from_parts(version, cursor, prefix);
            out.push(render_candidate(&block));
            taken += 1;
            match cursor.checked_add(size) {
                Some(next) => cursor = next,
                None => break,
            }
        }
        if taken >= limit {
            break;
        }
    }
}

fn render_candidate(block: &CidrBlock) -> Candidate {
    Candidate {
        cidr: block.to_string(),
        network: block.network_addr().to_string(),
        broadcast: match block.version() {
            IpVersion::V4 => Some(block.last_addr().to_string()),
            IpVersion::V6 => None,
        },
        first_usable: block.first_usable(true).to_string(),
        last_usable: block.last_usable().to_string(),
        size: format_count(block.size()),
        usable_hosts: format_count(block.usable_hosts(true)),
    }
}

/// Add two address totals where `None` stands for the full 2^128
/// space.
fn add_totals(a: Option<u128>, b: Option<u128>) -> Option<u128> {
    a?.checked_add(b?)
}

/// Subtract totals; pools always contain at least the free space, so
/// a representable difference only fails across the full-space edge.
fn sub_totals(total: Option<u128>, free: Option<u128>) -> Option<u128> {
    match (total, free) {
        (Some(t), Some(f)) => Some(t.saturating_sub(f)),
        (None, Some(_)) => None,
        (_, None) => Some(0),
    }
}

fn empty_result(errors: Vec<String>, warnings: Vec<String>) -> SearchResult {
    SearchResult {
        candidates: Vec::new(),
        errors,
        warnings,
        stats: SearchStats {
            pool_addresses: "0".to_string(),
            allocated_addresses: "0".to_string(),
            free_addresses: "0".to_string(),
            candidates_found: 0,
        },
        visualization: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fit_takes_lowest_gap() {
        let result = find_next_available(
            "10.0.0.0/24",
            "10.0.0.0/26\n10.0.0.128/26",
            BlockSize::Prefix(26),
            Policy::FirstFit,
            2,
        );
        assert!(result.errors.is_empty());
        let cidrs: Vec<&str> = result.candidates.iter().map(|c| c.cidr.as_str()).collect();
        assert_eq!(cidrs, vec!["10.0.0.64/26", "10.0.0.192/26"]);
    }

    #[test]
    fn test_best_fit_prefers_smallest_sufficient_gap() {
        // Gaps: 10.0.0.16-10.0.0.127 (112 addresses) and
        // 10.0.0.192-10.0.0.255 (64 addresses)
        let result = find_next_available(
            "10.0.0.0/24",
            "10.0.0.0/28\n10.0.0.128/26",
            BlockSize::Prefix(26),
            Policy::BestFit,
            1,
        );
        assert_eq!(result.candidates[0].cidr, "10.0.0.192/26");
    }

    #[test]
    fn test_host_count_sizing() {
        let result = find_next_available(
            "192.168.0.0/24",
            "",
            BlockSize::Hosts(50),
            Policy::FirstFit,
            1,
        );
        assert_eq!(result.candidates[0].cidr, "192.168.0.0/26");
        assert_eq!(result.candidates[0].usable_hosts, "62");
        assert_eq!(result.candidates[0].broadcast.as_deref(), Some("192.168.0.63"));
    }

    #[test]
    fn test_candidates_never_overlap() {
        let result = find_next_available(
            "10.0.0.0/24",
            "",
            BlockSize::Prefix(26),
            Policy::FirstFit,
            10,
        );
        assert_eq!(result.candidates.len(), 4);
        let cidrs: Vec<&str> = result.candidates.iter().map(|c| c.cidr.as_str()).collect();
        assert_eq!(
            cidrs,
            vec!["10.0.0.0/26", "10.0.0.64/26", "10.0.0.128/26", "10.0.0.192/26"]
        );
    }

    #[test]
    fn test_allocation_outside_pool_warns_but_continues() {
        let result = find_next_available(
            "10.0.0.0/24",
            "172.16.0.0/24",
            BlockSize::Prefix(25),
            Policy::FirstFit,
            1,
        );
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("outside all pools"));
        assert_eq!(result.candidates[0].cidr, "10.0.0.0/25");
    }

    #[test]
    fn test_allocation_clipped_at_pool_boundary() {
        // Allocation straddles the pool's lower edge; only the inner
        // part counts against free space.
        let result = find_next_available(
            "10.0.1.0/24",
            "10.0.0.128-10.0.1.127",
            BlockSize::Prefix(25),
            Policy::FirstFit,
            4,
        );
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].cidr, "10.0.1.128/25");
        assert_eq!(result.stats.free_addresses, "128");
    }

    #[test]
    fn test_free_space_reported_even_without_candidates() {
        let result = find_next_available(
            "10.0.0.0/26",
            "10.0.0.0/27\n10.0.0.48/28",
            BlockSize::Prefix(27),
            Policy::FirstFit,
            5,
        );
        assert!(result.candidates.is_empty());
        assert_eq!(result.stats.free_addresses, "16");
        assert_eq!(result.stats.candidates_found, 0);
    }

    #[test]
    fn test_multiple_pools() {
        let result = find_next_available(
            "10.0.0.0/25\n10.0.9.0/25",
            "10.0.0.0/25",
            BlockSize::Prefix(26),
            Policy::FirstFit,
            5,
        );
        let cidrs: Vec<&str> = result.candidates.iter().map(|c| c.cidr.as_str()).collect();
        assert_eq!(cidrs, vec!["10.0.9.0/26", "10.0.9.64/26"]);
    }

    #[test]
    fn test_mixed_version_pools_search_both() {
        // Host-count sizing resolves per version: 2 usable hosts is a
        // /31 for IPv4 and a /126 for IPv6.
        let result = find_next_available(
            "10.0.0.0/30\n2001:db8::/126",
            "",
            BlockSize::Hosts(2),
            Policy::FirstFit,
            10,
        );
        let cidrs: Vec<&str> = result.candidates.iter().map(|c| c.cidr.as_str()).collect();
        assert_eq!(
            cidrs,
            vec!["10.0.0.0/31", "10.0.0.2/31", "2001:db8::/126"]
        );
    }
}

//! VLSM allocation engine.
//!
//! Carves non-overlapping sub-blocks out of one parent CIDR block to
//! satisfy a list of sized requests, using either size-ordered
//! best-fit packing or input-order-preserving placement. Leftover
//! space and efficiency accounting come out of the interval algebra.

pub mod requests;

pub use requests::load_requests;

use serde::{Deserialize, Serialize};

use crate::addr::{block_len, parse_entry, prefix_for_hosts, CidrBlock, Entry, Range};
use crate::algebra::{cover_range, total_addresses};
use crate::utils::{format_count, group_decimal, usage_bar};

/// One sized request, consumed exactly once by a planning run. The
/// position in the request list is the priority/order index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub id: String,
    /// Display name; falls back to the id when empty.
    #[serde(default)]
    pub name: String,
    /// Requested size in hosts (or raw addresses when the usable-hosts
    /// flag is off).
    pub hosts: u64,
}

impl AllocationRequest {
    pub fn new(id: impl Into<String>, hosts: u64) -> Self {
        AllocationRequest {
            id: id.into(),
            name: String::new(),
            hosts,
        }
    }

    fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Placement strategy for a planning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Sort requests descending by required block size, then place
    /// each at the lowest free address (classic VLSM packing).
    FitBest,
    /// Place requests in their original input order; often less
    /// efficient but deterministic for the caller.
    PreserveOrder,
}

/// A placed block bound to the request that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct AllocatedBlock {
    pub request_id: String,
    pub name: String,
    pub cidr: String,
    pub prefix: u8,
    pub size: String,
    pub requested_hosts: String,
    pub usable_hosts: String,
    pub first_usable: String,
    pub last_usable: String,
    /// Requested/provided ratio in percent.
    pub efficiency: f64,
}

/// Summary statistics for one planning run.
#[derive(Debug, Clone, Serialize)]
pub struct PlanStats {
    pub requests: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_requested: String,
    pub total_allocated: String,
    pub total_leftover: String,
    /// Requested/allocated ratio in percent; 0 when nothing allocated.
    pub efficiency: f64,
}

/// Result record for [`plan_subnets`]. Produced atomically by one run;
/// no state carries over between runs.
#[derive(Debug, Clone, Serialize)]
pub struct PlanResult {
    pub allocated: Vec<AllocatedBlock>,
    pub leftover_ranges: Vec<String>,
    pub leftover_cidrs: Vec<String>,
    pub errors: Vec<String>,
    pub stats: PlanStats,
    pub visualization: String,
}

/// Plan sub-blocks of `parent` for the given requests.
///
/// Per-request validation failures (zero size, demand exceeding the
/// remaining space) are accumulated as errors without aborting the
/// rest of the batch. With `usable_hosts` set, request sizes are
/// interpreted as usable host counts per the point-to-point
/// convention; otherwise as raw address counts.
pub fn plan_subnets(
    parent: &str,
    requests: &[AllocationRequest],
    strategy: Strategy,
    usable_hosts: bool,
) -> PlanResult {
    let parent_block = match parse_entry(parent) {
        Ok(Entry::Cidr(block)) => block,
        Ok(_) => {
            return failed_plan(
                requests.len(),
                format!("parent '{}' must be in CIDR notation", parent.trim()),
            )
        }
        Err(e) => return failed_plan(requests.len(), format!("parent '{}': {}", parent.trim(), e)),
    };
    let version = parent_block.version();

    // Resolve each request to its required prefix up front so invalid
    // requests fail without consuming space.
    let mut errors = Vec::new();
    let mut sized: Vec<(usize, u8, u128)> = Vec::new();
    for (index, request) in requests.iter().enumerate() {
        match prefix_for_hosts(version, request.hosts as u128, usable_hosts) {
            Ok(prefix) => match block_len(version, prefix) {
                Some(size) => sized.push((index, prefix, size)),
                None => errors.push(format!(
                    "request '{}' requires the entire {} space",
                    request.display_name(),
                    version
                )),
            },
            Err(e) => errors.push(format!("request '{}': {}", request.display_name(), e)),
        }
    }

    if strategy == Strategy::FitBest {
        // Stable sort keeps input order on equal sizes.
        sized.sort_by(|a, b| b.2.cmp(&a.2));
    }

    let mut free: Vec<Range> = vec![parent_block.range()];
    let mut allocated = Vec::new();
    let mut total_requested = 0u128;
    let mut total_allocated = 0u128;

    for (index, prefix, size) in sized {
        let request = &requests[index];
        match place(&mut free, version, prefix, size) {
            Some(block) => {
                total_requested += request.hosts as u128;
                total_allocated += size;
                allocated.push(render_block(request, &block, usable_hosts));
            }
            None => {
                errors.push(format!(
                    "request '{}' ({} hosts) requires a /{} block of {} addresses - larger than the free space remaining in {}",
                    request.display_name(),
                    request.hosts,
                    prefix,
                    group_decimal(size),
                    parent_block
                ));
            }
        }
    }

    let leftover_total = total_addresses(&free);
    let stats = PlanStats {
        requests: requests.len(),
        successful: allocated.len(),
        failed: requests.len() - allocated.len(),
        total_requested: group_decimal(total_requested),
        total_allocated: group_decimal(total_allocated),
        total_leftover: format_count(leftover_total),
        efficiency: ratio_pct(total_requested, total_allocated),
    };
    log::info!(
        "planned {}/{} requests in {} ({} addresses allocated, {} left)",
        stats.successful,
        stats.requests,
        parent_block,
        stats.total_allocated,
        stats.total_leftover
    );

    PlanResult {
        allocated,
        leftover_ranges: free.iter().map(|r| r.to_string()).collect(),
        leftover_cidrs: free
            .iter()
            .flat_map(cover_range)
            .map(|b| b.to_string())
            .collect(),
        errors,
        stats,
        visualization: usage_bar(total_allocated, parent_block.size(), 40),
    }
}

/// Place one block of `size` addresses at the lowest free address
/// where an aligned placement fits, splitting the containing free
/// range around it. Returns `None` when nothing fits.
fn place(
    free: &mut Vec<Range>,
    version: crate::addr::IpVersion,
    prefix: u8,
    size: u128,
) -> Option<CidrBlock> {
    for i in 0..free.len() {
        let gap = free[i];
        let rem = gap.start() % size;
        let aligned = if rem == 0 {
            gap.start()
        } else {
            match gap.start().checked_add(size - rem) {
                Some(a) => a,
                None => continue,
            }
        };
        if aligned > gap.end() || gap.end() - aligned < size - 1 {
            continue;
        }
        let last = aligned + (size - 1);
        let block = CidrBlock::from_parts(version, aligned, prefix);

        // Replace the gap with whatever survives on each side.
        let mut replacement = Vec::with_capacity(2);
        if aligned > gap.start() {
            replacement.push(Range::from_bounds(version, gap.start(), aligned - 1));
        }
        if last < gap.end() {
            replacement.push(Range::from_bounds(version, last + 1, gap.end()));
        }
        free.splice(i..=i, replacement);
        return Some(block);
    }
    None
}

fn render_block(request: &AllocationRequest, block: &CidrBlock, usable: bool) -> AllocatedBlock {
    let size = block.size().expect("placed blocks are never the full space");
    AllocatedBlock {
        request_id: request.id.clone(),
        name: request.display_name().to_string(),
        cidr: block.to_string(),
        prefix: block.prefix(),
        size: group_decimal(size),
        requested_hosts: group_decimal(request.hosts as u128),
        usable_hosts: format_count(block.usable_hosts(usable)),
        first_usable: block.first_usable(usable).to_string(),
        last_usable: block.last_usable().to_string(),
        efficiency: ratio_pct(request.hosts as u128, size),
    }
}

fn ratio_pct(numerator: u128, denominator: u128) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let pct = numerator as f64 / denominator as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

fn failed_plan(request_count: usize, error: String) -> PlanResult {
    PlanResult {
        allocated: Vec::new(),
        leftover_ranges: Vec::new(),
        leftover_cidrs: Vec::new(),
        errors: vec![error],
        stats: PlanStats {
            requests: request_count,
            successful: 0,
            failed: request_count,
            total_requested: "0".to_string(),
            total_allocated: "0".to_string(),
            total_leftover: "0".to_string(),
            efficiency: 0.0,
        },
        visualization: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str, hosts: u64) -> AllocationRequest {
        AllocationRequest::new(id, hosts)
    }

    #[test]
    fn test_fit_best_classic_vlsm() {
        let result = plan_subnets(
            "192.168.1.0/24",
            &[request("a", 100), request("b", 50), request("c", 10)],
            Strategy::FitBest,
            true,
        );
        assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
        assert_eq!(result.allocated.len(), 3);
        assert_eq!(result.allocated[0].cidr, "192.168.1.0/25");
        assert_eq!(result.allocated[0].usable_hosts, "126");
        assert_eq!(result.allocated[1].cidr, "192.168.1.128/26");
        assert_eq!(result.allocated[1].usable_hosts, "62");
        assert_eq!(result.allocated[2].cidr, "192.168.1.192/28");
        assert_eq!(result.allocated[2].usable_hosts, "14");
    }

    #[test]
    fn test_fit_best_sorts_but_reports_request_identity() {
        let result = plan_subnets(
            "10.0.0.0/24",
            &[request("small", 10), request("large", 100)],
            Strategy::FitBest,
            true,
        );
        // The larger request lands first despite arriving second
        assert_eq!(result.allocated[0].request_id, "large");
        assert_eq!(result.allocated[0].cidr, "10.0.0.0/25");
        assert_eq!(result.allocated[1].request_id, "small");
        assert_eq!(result.allocated[1].cidr, "10.0.0.128/28");
    }

    #[test]
    fn test_preserve_order_packs_in_input_order() {
        let result = plan_subnets(
            "10.0.0.0/24",
            &[request("first", 10), request("second", 100)],
            Strategy::PreserveOrder,
            true,
        );
        assert_eq!(result.allocated[0].cidr, "10.0.0.0/28");
        // The /25 cannot start before the next 128-aligned boundary
        assert_eq!(result.allocated[1].cidr, "10.0.0.128/25");
    }

    #[test]
    fn test_preserve_order_fills_alignment_gaps() {
        let result = plan_subnets(
            "10.0.0.0/24",
            &[request("a", 10), request("b", 100), request("c", 20)],
            Strategy::PreserveOrder,
            true,
        );
        // The /27 for 20 hosts fits in the gap between the /28 and /25
        assert_eq!(result.allocated[2].cidr, "10.0.0.32/27");
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_oversized_request_fails_without_consuming_space() {
        let result = plan_subnets(
            "192.168.1.0/24",
            &[request("huge", 300), request("ok", 10)],
            Strategy::FitBest,
            true,
        );
        assert_eq!(result.stats.successful, 1);
        assert_eq!(result.stats.failed, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("larger than the free space"));
        assert_eq!(result.allocated[0].cidr, "192.168.1.0/28");
    }

    #[test]
    fn test_zero_host_request_is_rejected() {
        let result = plan_subnets(
            "10.0.0.0/24",
            &[request("zero", 0), request("ok", 2)],
            Strategy::FitBest,
            true,
        );
        assert_eq!(result.stats.failed, 1);
        assert_eq!(result.stats.successful, 1);
        assert!(result.errors[0].contains("greater than zero"));
        // Two hosts map to a point-to-point /31
        assert_eq!(result.allocated[0].cidr, "10.0.0.0/31");
    }

    #[test]
    fn test_unparsable_parent_fails_whole_run() {
        let result = plan_subnets("not-a-cidr", &[request("a", 10)], Strategy::FitBest, true);
        assert_eq!(result.stats.failed, 1);
        assert_eq!(result.allocated.len(), 0);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_conservation_of_parent_space() {
        let result = plan_subnets(
            "192.168.1.0/24",
            &[request("a", 100), request("b", 50), request("c", 10)],
            Strategy::FitBest,
            true,
        );
        // 128 + 64 + 16 allocated, 48 left
        assert_eq!(result.stats.total_allocated, "208");
        assert_eq!(result.stats.total_leftover, "48");
        assert_eq!(
            result.leftover_ranges,
            vec!["192.168.1.208-192.168.1.255"]
        );
        assert_eq!(
            result.leftover_cidrs,
            vec!["192.168.1.208/28", "192.168.1.224/27"]
        );
    }

    #[test]
    fn test_counts_always_balance() {
        let result = plan_subnets(
            "10.0.0.0/26",
            &[request("a", 30), request("b", 30), request("c", 30)],
            Strategy::FitBest,
            true,
        );
        assert_eq!(
            result.stats.successful + result.stats.failed,
            result.stats.requests
        );
        // Two /27s fill the /26; the third request fails
        assert_eq!(result.stats.successful, 2);
        assert!(result.leftover_ranges.is_empty());
    }

    #[test]
    fn test_ipv6_planning() {
        let result = plan_subnets(
            "2001:db8::/48",
            &[request("lan", 1000), request("p2p", 2)],
            Strategy::FitBest,
            false,
        );
        assert!(result.errors.is_empty());
        assert_eq!(result.allocated[0].cidr, "2001:db8::/118");
        assert_eq!(result.allocated[1].cidr, "2001:db8::400/127");
    }

    #[test]
    fn test_raw_address_sizing_without_usable_flag() {
        let result = plan_subnets(
            "10.0.0.0/24",
            &[request("exact", 64)],
            Strategy::FitBest,
            false,
        );
        assert_eq!(result.allocated[0].cidr, "10.0.0.0/26");
        assert_eq!(result.allocated[0].size, "64");
    }
}

//! CIDR summarization.
//!
//! Aggregates an unordered mix of addresses, CIDR blocks and explicit
//! ranges into the minimal CIDR set whose union exactly equals the
//! union of the inputs.

use serde::Serialize;

use super::{spans_by_version, summarize_ranges, total_addresses};
use crate::addr::parse_entry;
use crate::utils::format_count;

/// Summary statistics for one summarization run. Address totals are
/// rendered as grouped decimal strings because IPv6 counts exceed
/// ordinary integer precision.
#[derive(Debug, Clone, Serialize)]
pub struct SummarizeStats {
    pub input_entries: usize,
    pub ipv4_blocks: usize,
    pub ipv6_blocks: usize,
    pub ipv4_addresses: String,
    pub ipv6_addresses: String,
}

/// Result record for [`summarize`].
#[derive(Debug, Clone, Serialize)]
pub struct SummarizeResult {
    pub ipv4: Vec<String>,
    pub ipv6: Vec<String>,
    pub stats: SummarizeStats,
    pub errors: Vec<String>,
}

/// Summarize a list of inputs (one entry per item) into minimal CIDR
/// sets, one per IP version.
///
/// Malformed items are collected into `errors` with their 1-based
/// position and do not prevent valid items from aggregating. The
/// operation is idempotent: summarizing its own output is a fixed
/// point.
pub fn summarize(inputs: &[String]) -> SummarizeResult {
    let mut entries = Vec::new();
    let mut errors = Vec::new();
    for (idx, item) in inputs.iter().enumerate() {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        match parse_entry(item) {
            Ok(entry) => entries.push(entry),
            Err(e) => errors.push(format!("line {}: {}", idx + 1, e)),
        }
    }

    let (v4_spans, v6_spans) = spans_by_version(&entries);
    let v4_merged = super::coalesce_ranges(v4_spans);
    let v6_merged = super::coalesce_ranges(v6_spans);
    let v4_total = total_addresses(&v4_merged);
    let v6_total = total_addresses(&v6_merged);
    let v4_blocks = summarize_ranges(v4_merged);
    let v6_blocks = summarize_ranges(v6_merged);

    log::debug!(
        "summarized {} entries into {} IPv4 and {} IPv6 blocks ({} errors)",
        entries.len(),
        v4_blocks.len(),
        v6_blocks.len(),
        errors.len()
    );

    SummarizeResult {
        ipv4: v4_blocks.iter().map(|b| b.to_string()).collect(),
        ipv6: v6_blocks.iter().map(|b| b.to_string()).collect(),
        stats: SummarizeStats {
            input_entries: entries.len(),
            ipv4_blocks: v4_blocks.len(),
            ipv6_blocks: v6_blocks.len(),
            ipv4_addresses: format_count(v4_total),
            ipv6_addresses: format_count(v6_total),
        },
        errors,
    }
}

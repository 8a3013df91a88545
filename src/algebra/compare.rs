//! CIDR set comparison.
//!
//! Normalizes two newline-separated lists to canonical CIDR sets and
//! classifies every canonical entry as added, removed or unchanged.

use std::collections::BTreeSet;

use serde::Serialize;

use super::canonical_blocks;
use crate::addr::{parse_lines, CidrBlock};

/// Running counts for one comparison. By construction
/// `added + unchanged` equals the size of the canonical B set and
/// `removed + unchanged` the size of the canonical A set.
#[derive(Debug, Clone, Serialize)]
pub struct CompareSummary {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

/// Result record for [`compare`].
#[derive(Debug, Clone, Serialize)]
pub struct CompareResult {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: Vec<String>,
    pub normalized_a: Vec<String>,
    pub normalized_b: Vec<String>,
    pub summary: CompareSummary,
    pub errors: Vec<String>,
}

/// Compare two newline-separated lists of addresses, CIDR blocks and
/// ranges.
///
/// Both lists are normalized to canonical CIDR sets (per-entry minimal
/// cover, deduplicated, sorted) without cross-entry merging, so two
/// blocks that happen to be adjacent stay distinct for classification.
pub fn compare(list_a: &str, list_b: &str) -> CompareResult {
    let (entries_a, errors_a) = parse_lines(list_a);
    let (entries_b, errors_b) = parse_lines(list_b);

    let mut errors = Vec::new();
    errors.extend(errors_a.into_iter().map(|e| format!("list A, {}", e)));
    errors.extend(errors_b.into_iter().map(|e| format!("list B, {}", e)));

    let canonical_a = canonical_blocks(&entries_a);
    let canonical_b = canonical_blocks(&entries_b);
    let set_a: BTreeSet<CidrBlock> = canonical_a.iter().copied().collect();
    let set_b: BTreeSet<CidrBlock> = canonical_b.iter().copied().collect();

    let added: Vec<String> = canonical_b
        .iter()
        .filter(|block| !set_a.contains(block))
        .map(|block| block.to_string())
        .collect();
    let removed: Vec<String> = canonical_a
        .iter()
        .filter(|block| !set_b.contains(block))
        .map(|block| block.to_string())
        .collect();
    let unchanged: Vec<String> = canonical_a
        .iter()
        .filter(|block| set_b.contains(block))
        .map(|block| block.to_string())
        .collect();

    let summary = CompareSummary {
        added: added.len(),
        removed: removed.len(),
        unchanged: unchanged.len(),
    };
    log::debug!(
        "compare: {} added, {} removed, {} unchanged",
        summary.added,
        summary.removed,
        summary.unchanged
    );

    CompareResult {
        added,
        removed,
        unchanged,
        normalized_a: canonical_a.iter().map(|b| b.to_string()).collect(),
        normalized_b: canonical_b.iter().map(|b| b.to_string()).collect(),
        summary,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_added_and_unchanged() {
        let result = compare("192.168.1.0/24", "192.168.1.0/24\n10.0.0.0/16");
        assert_eq!(result.added, vec!["10.0.0.0/16"]);
        assert!(result.removed.is_empty());
        assert_eq!(result.unchanged, vec!["192.168.1.0/24"]);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_compare_counts_balance() {
        let result = compare(
            "10.0.0.0/24\n10.0.1.0/24\n172.16.0.0/16",
            "10.0.1.0/24\n192.168.0.0/24",
        );
        assert_eq!(
            result.summary.added + result.summary.unchanged,
            result.normalized_b.len()
        );
        assert_eq!(
            result.summary.removed + result.summary.unchanged,
            result.normalized_a.len()
        );
    }

    #[test]
    fn test_compare_normalizes_before_classifying() {
        // Same block written unaligned on one side and as a host range
        // spanning it on the other
        let result = compare("192.168.1.77/24", "192.168.1.0-192.168.1.255");
        assert_eq!(result.unchanged, vec!["192.168.1.0/24"]);
        assert!(result.added.is_empty());
        assert!(result.removed.is_empty());
    }

    #[test]
    fn test_compare_dedups_repeated_entries() {
        let result = compare("10.0.0.0/24\n10.0.0.0/24", "10.0.0.0/24");
        assert_eq!(result.normalized_a, vec!["10.0.0.0/24"]);
        assert_eq!(result.summary.unchanged, 1);
    }

    #[test]
    fn test_compare_reports_errors_per_list() {
        let result = compare("bad-input", "10.0.0.0/24");
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("list A, line 1:"));
        assert_eq!(result.added, vec!["10.0.0.0/24"]);
    }
}

//! Subnet deaggregation and splitting.
//!
//! Breaks addresses, CIDR blocks and ranges into smaller subnets,
//! either down to a fixed target prefix or into a requested number of
//! equal pieces. Output sizes are bounded by hard safety ceilings so
//! a stray `10.0.0.0/8 -> /32` request aborts instead of producing
//! sixteen million lines.

use serde::Serialize;

use crate::addr::{block_len, parse_lines, CidrBlock, Entry};
use crate::algebra::cover_range;
use crate::utils::format_count;

/// Most subnets a single input line may expand to.
pub const MAX_SUBNETS_PER_INPUT: u128 = 10_000;
/// Most subnets one call may produce across all input lines.
pub const MAX_TOTAL_SUBNETS: u128 = 25_000;

/// Result record for [`deaggregate`] and [`split_by_count`].
///
/// A safety-limit breach is total: `success` is false, `error` names
/// the offending input, and `subnets` stays empty. Per-line parse
/// failures are soft and land in `errors` instead.
#[derive(Debug, Clone, Serialize)]
pub struct DeaggregateResult {
    pub success: bool,
    pub subnets: Vec<String>,
    pub total_subnets: usize,
    pub total_addresses: String,
    pub input_summary: Vec<String>,
    pub error: Option<String>,
    pub errors: Vec<String>,
}

/// Split every input into subnets at `target_prefix`.
///
/// Ranges are first tiled with their minimal CIDR cover; each tile
/// wider than the target is then cut into target-sized subnets, and a
/// tile at the target prefix or narrower passes through unchanged.
pub fn deaggregate(input: &str, target_prefix: u8) -> DeaggregateResult {
    let (entries, errors) = parse_lines(input);

    expand(entries, errors, |entry| {
        if target_prefix > entry.version().bits() {
            return Err(format!(
                "target prefix /{} is out of range for {}",
                target_prefix,
                entry.version()
            ));
        }
        let mut subnets = Vec::new();
        for tile in cover_range(&entry.span()) {
            if tile.prefix() >= target_prefix {
                push_checked(&mut subnets, tile, entry)?;
            } else {
                let pieces = count_pieces(&tile, target_prefix);
                check_input_limit(subnets.len() as u128 + pieces, entry)?;
                split_block(&tile, target_prefix, &mut subnets);
            }
        }
        Ok(subnets)
    })
}

/// Split every input into `count` equal subnets.
///
/// The piece size must be a power of two, so the count is rounded up
/// to the next one and the output trimmed back to `count` per line.
/// Ranges are tiled first and the round-up applies to each tile.
pub fn split_by_count(input: &str, count: u64) -> DeaggregateResult {
    let (entries, errors) = parse_lines(input);

    expand(entries, errors, |entry| {
        if count == 0 {
            return Err("split count must be greater than zero".to_string());
        }
        let rounded = (count as u128)
            .checked_next_power_of_two()
            .ok_or_else(|| format!("split count {} is too large", count))?;
        let extra_bits = rounded.trailing_zeros() as u8;

        let mut subnets = Vec::new();
        for tile in cover_range(&entry.span()) {
            let finer = tile.prefix().saturating_add(extra_bits);
            if finer > tile.version().bits() {
                return Err(format!(
                    "{} cannot be split into {} subnets, pieces would be smaller than one address",
                    entry, count
                ));
            }
            check_input_limit(subnets.len() as u128 + rounded, entry)?;
            split_block(&tile, finer, &mut subnets);
        }
        subnets.truncate(count as usize);
        Ok(subnets)
    })
}

/// Drive per-entry expansion, enforce the combined ceiling, and shape
/// the final result.
fn expand<F>(entries: Vec<Entry>, errors: Vec<String>, mut expand_one: F) -> DeaggregateResult
where
    F: FnMut(&Entry) -> Result<Vec<CidrBlock>, String>,
{
    let mut all = Vec::new();
    let mut input_summary = Vec::new();

    for entry in &entries {
        let subnets = match expand_one(entry) {
            Ok(subnets) => subnets,
            Err(message) => return aborted(message, errors),
        };
        if (all.len() as u128) + (subnets.len() as u128) > MAX_TOTAL_SUBNETS {
            return aborted(
                format!(
                    "expanding {} would exceed the combined limit of {} subnets",
                    entry, MAX_TOTAL_SUBNETS
                ),
                errors,
            );
        }
        input_summary.push(format!("{} -> {} subnets", entry, subnets.len()));
        all.extend(subnets);
    }

    // More specific blocks sort first within the same network.
    all.sort_by(|a, b| {
        (a.version(), a.network())
            .cmp(&(b.version(), b.network()))
            .then(b.prefix().cmp(&a.prefix()))
    });
    all.dedup();

    let total_addresses = all
        .iter()
        .try_fold(0u128, |acc, block| acc.checked_add(block.size()?));

    DeaggregateResult {
        success: true,
        total_subnets: all.len(),
        total_addresses: format_count(total_addresses),
        subnets: all.iter().map(|b| b.to_string()).collect(),
        input_summary,
        error: None,
        errors,
    }
}

/// Subnets produced by cutting `tile` down to `target`.
fn count_pieces(tile: &CidrBlock, target: u8) -> u128 {
    1u128 << (target - tile.prefix()).min(127) as u32
}

fn check_input_limit(pieces: u128, entry: &Entry) -> Result<(), String> {
    if pieces > MAX_SUBNETS_PER_INPUT {
        return Err(format!(
            "expanding {} would produce {} subnets, over the per-input limit of {}",
            entry,
            format_count(Some(pieces)),
            MAX_SUBNETS_PER_INPUT
        ));
    }
    Ok(())
}

fn push_checked(out: &mut Vec<CidrBlock>, tile: CidrBlock, entry: &Entry) -> Result<(), String> {
    check_input_limit(out.len() as u128 + 1, entry)?;
    out.push(tile);
    Ok(())
}

/// Append every `target`-prefix subnet of `block`, in address order.
/// Callers have already bounded the count.
fn split_block(block: &CidrBlock, target: u8, out: &mut Vec<CidrBlock>) {
    let step = block_len(block.version(), target).unwrap_or(u128::MAX);
    let mut network = block.network();
    let last = block.last();
    loop {
        out.push(CidrBlock::from_parts(block.version(), network, target));
        match network.checked_add(step) {
            Some(next) if next <= last => network = next,
            _ => break,
        }
    }
}

fn aborted(message: String, errors: Vec<String>) -> DeaggregateResult {
    log::warn!("deaggregation aborted: {}", message);
    DeaggregateResult {
        success: false,
        subnets: Vec::new(),
        total_subnets: 0,
        total_addresses: "0".to_string(),
        input_summary: Vec::new(),
        error: Some(message),
        errors,
    }
}

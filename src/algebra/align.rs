//! Boundary alignment checking.
//!
//! Determines whether each input's occupied span exactly equals one
//! full block at a target prefix granularity, and proposes
//! alternatives when it does not.

use serde::Serialize;

use super::cover_range;
use crate::addr::{block_len, parse_entry, CidrBlock, Entry, Range};

/// One remediation proposal for a misaligned input.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    /// Category: "larger", "smaller" or "split".
    pub kind: String,
    pub blocks: Vec<String>,
    /// Requested-span / suggested-span ratio in percent, rounded and
    /// capped at 100.
    pub efficiency: u32,
}

/// Alignment verdict for a single input.
#[derive(Debug, Clone, Serialize)]
pub struct AlignmentCheck {
    pub input: String,
    pub is_aligned: bool,
    pub reason: String,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlignmentSummary {
    pub total: usize,
    pub aligned: usize,
    pub misaligned: usize,
}

/// Result record for [`check_alignment`].
#[derive(Debug, Clone, Serialize)]
pub struct AlignmentReport {
    pub checks: Vec<AlignmentCheck>,
    pub summary: AlignmentSummary,
    pub errors: Vec<String>,
}

/// Check each input (one entry per item) against a target prefix
/// boundary.
///
/// A span is aligned only when its start sits on a multiple of the
/// target block size and its length equals the target block size
/// exactly. A narrower CIDR inside one target block is misaligned, and
/// so is a wider CIDR spanning several whole target blocks.
pub fn check_alignment(inputs: &[String], target_prefix: u8) -> AlignmentReport {
    let mut checks = Vec::new();
    let mut errors = Vec::new();

    for (idx, item) in inputs.iter().enumerate() {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let entry = match parse_entry(item) {
            Ok(entry) => entry,
            Err(e) => {
                errors.push(format!("line {}: {}", idx + 1, e));
                continue;
            }
        };
        if target_prefix > entry.version().bits() {
            errors.push(format!(
                "line {}: target prefix /{} is out of range for {}",
                idx + 1,
                target_prefix,
                entry.version()
            ));
            continue;
        }
        checks.push(check_entry(item, &entry, target_prefix));
    }

    let aligned = checks.iter().filter(|c| c.is_aligned).count();
    let summary = AlignmentSummary {
        total: checks.len(),
        aligned,
        misaligned: checks.len() - aligned,
    };
    AlignmentReport {
        checks,
        summary,
        errors,
    }
}

fn check_entry(input: &str, entry: &Entry, target_prefix: u8) -> AlignmentCheck {
    let span = entry.span();
    let target_len = block_len(entry.version(), target_prefix);

    let (is_aligned, reason) = match target_len {
        Some(t) if span.start() % t != 0 => (
            false,
            format!(
                "start {} is not on a /{} boundary",
                span.start_addr(),
                target_prefix
            ),
        ),
        Some(t) if span.len() != Some(t) => (
            false,
            format!(
                "span of {} addresses does not equal one full block at the /{} boundary",
                crate::utils::format_count(span.len()),
                target_prefix
            ),
        ),
        Some(_) => (true, format!("exactly one /{} block", target_prefix)),
        // Target /0 over IPv6: only the full space aligns.
        None if span.len().is_none() => (true, format!("exactly one /{} block", target_prefix)),
        None => (
            false,
            format!(
                "span does not equal one full block at the /{} boundary",
                target_prefix
            ),
        ),
    };

    let suggestions = if is_aligned {
        Vec::new()
    } else {
        build_suggestions(&span, target_prefix, target_len)
    };

    AlignmentCheck {
        input: input.to_string(),
        is_aligned,
        reason,
        suggestions,
    }
}

fn build_suggestions(span: &Range, target_prefix: u8, target_len: Option<u128>) -> Vec<Suggestion> {
    let mut out = Vec::new();
    let span_len = len_f64(span.len());

    // "larger": the smallest enclosing aligned block at or above the
    // target block size. Skipped when it would just restate the input.
    for prefix in (0..=target_prefix).rev() {
        let block = CidrBlock::new(span.start_addr(), prefix).expect("prefix bounded by version");
        if block.last() >= span.end() {
            if block.range() != *span {
                out.push(Suggestion {
                    kind: "larger".to_string(),
                    blocks: vec![block.to_string()],
                    efficiency: pct(span_len, len_f64(block.size())),
                });
            }
            break;
        }
    }

    // "smaller": the minimal exact cover, when it takes several blocks
    // no bigger than the target.
    let cover = cover_range(span);
    let fits_target = cover.iter().all(|b| match (b.size(), target_len) {
        (Some(size), Some(t)) => size <= t,
        (_, None) => true,
        (None, Some(_)) => false,
    });
    if cover.len() > 1 && cover.len() <= 4 && fits_target {
        out.push(Suggestion {
            kind: "smaller".to_string(),
            blocks: cover.iter().map(|b| b.to_string()).collect(),
            efficiency: 100,
        });
    }

    // "split": the exact tiling refined one boundary finer.
    let tiles: Vec<CidrBlock> = cover
        .iter()
        .flat_map(|block| {
            if block.prefix() >= block.version().bits() {
                vec![*block]
            } else {
                let finer = block.prefix() + 1;
                let half = block_len(block.version(), finer)
                    .expect("finer prefix is at least 1, size fits u128");
                vec![
                    CidrBlock::from_parts(block.version(), block.network(), finer),
                    CidrBlock::from_parts(block.version(), block.network() + half, finer),
                ]
            }
        })
        .collect();
    if tiles.len() > cover.len() && tiles.len() <= 8 {
        out.push(Suggestion {
            kind: "split".to_string(),
            blocks: tiles.iter().map(|b| b.to_string()).collect(),
            efficiency: 100,
        });
    }

    out
}

fn len_f64(len: Option<u128>) -> f64 {
    match len {
        Some(l) => l as f64,
        None => 2f64.powi(128),
    }
}

fn pct(span: f64, total: f64) -> u32 {
    if total <= 0.0 {
        return 0;
    }
    let ratio = (span / total * 100.0).round();
    ratio.clamp(0.0, 100.0) as u32
}

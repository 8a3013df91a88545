//! Numeric rendering helpers.
//!
//! Address counts routinely exceed 32-bit and even 64-bit range, so
//! all counts destined for output are rendered as grouped decimal
//! strings rather than native numbers.

/// The inclusive length of the full IPv6 space (2^128), which does not
/// fit in u128 and is carried through the crate as `None`.
const FULL_IPV6_SPACE: &str = "340,282,366,920,938,463,463,374,607,431,768,211,456";

/// Render a count with thousands separators: 4294967296 becomes
/// "4,294,967,296".
pub fn group_decimal(value: u128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - offset) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Render an address count where `None` stands for the full 2^128
/// IPv6 space.
pub fn format_count(count: Option<u128>) -> String {
    match count {
        Some(value) => group_decimal(value),
        None => FULL_IPV6_SPACE.to_string(),
    }
}

/// Render a fixed-width text utilization bar, e.g. `[#####...] 62.5%`.
///
/// `used` is clamped to `total`; a zero or unrepresentable total
/// renders as fully unknown rather than dividing by zero.
pub fn usage_bar(used: u128, total: Option<u128>, width: usize) -> String {
    let total = match total {
        Some(t) if t > 0 => t,
        // Full IPv6 space: any representable usage rounds to zero.
        None => {
            return format!("[{}] ~0.0%", ".".repeat(width));
        }
        _ => return format!("[{}] 0.0%", ".".repeat(width)),
    };
    let used = used.min(total);
    // Scale through f64; bar resolution does not need exact integers.
    let fraction = used as f64 / total as f64;
    let filled = (fraction * width as f64).round() as usize;
    let filled = filled.min(width);
    format!(
        "[{}{}] {:.1}%",
        "#".repeat(filled),
        ".".repeat(width - filled),
        fraction * 100.0
    )
}

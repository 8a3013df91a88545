//! Utility functions and helpers.

pub mod fmt;

pub use fmt::{format_count, group_decimal, usage_bar};

//! # ipplan - IP address-space arithmetic and allocation
//!
//! This library provides the core arithmetic for planning IP address
//! space: summarizing messy block lists, comparing allocation sets,
//! checking boundary alignment, packing variable-size subnets into a
//! parent block, finding free space, and deaggregating blocks into
//! smaller subnets.
//!
//! ## Overview
//!
//! All operations are pure functions over an exact integer model:
//! IPv4 and IPv6 addresses are carried as `u128` magnitudes tagged
//! with a version, so the same interval algebra serves both families
//! without floating-point approximation or version-specific code
//! paths. Counts that can exceed `u128` (the full IPv6 space) are
//! represented as `None` and rendered from a fixed constant.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `addr`: address, range and CIDR types plus text parsing
//! - `algebra`: interval coalescing, minimal CIDR covers, subtraction,
//!   and the summarize / compare / align operations built on them
//! - `plan`: the VLSM allocation engine and request-file loading
//! - `search`: free-space search over pools minus allocations
//! - `split`: deaggregation and fixed-count splitting with safety
//!   ceilings
//! - `utils`: grouped-decimal count rendering and utilization bars
//!
//! ## Example Usage
//!
//! ```rust
//! use ipplan::plan::{plan_subnets, AllocationRequest, Strategy};
//!
//! let requests = vec![
//!     AllocationRequest::new("web", 100),
//!     AllocationRequest::new("db", 10),
//! ];
//! let result = plan_subnets("192.168.1.0/24", &requests, Strategy::FitBest, true);
//! assert_eq!(result.stats.successful, 2);
//! ```
//!
//! ## Error Handling
//!
//! Batch operations never abort on a bad input line: each result
//! record carries an `errors` list with 1-based line numbers alongside
//! the successful output. Hard failures (an unusable parent block, a
//! safety-ceiling breach) are reported as failed result records, not
//! panics. Parsing uses typed `thiserror` errors; the binary wraps
//! everything in `color_eyre` for reporting.

pub mod addr;
pub mod algebra;
pub mod plan;
pub mod search;
pub mod split;
pub mod utils;

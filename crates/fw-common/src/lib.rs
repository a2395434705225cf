//! Shared primitives used across the firewall workspace: verdicts, log
//! schemas, the queue-numbering conventions, and process exit codes.

pub mod exit_codes;
pub mod log;
pub mod metrics;
pub mod verdict;

pub use log::{LogType, Reason};
pub use verdict::Verdict;

/// Sentinel queue number meaning "accept directly in the kernel, never
/// hand off to userspace".
pub const ACCEPT_DIRECT_QUEUE: i32 = -1;

/// Fixed per-interaction increment applied to the queue-base counter.
pub const QUEUE_ID_STEP: u16 = 10;

/// Global upper bound (in entries) the DNS map is pruned to after TTL
/// expiry has already been applied once.
pub const DNS_MAP_MAX_ENTRIES: usize = 4096;

/// Wildcard marker for suffix domain-name matches (`$.example.org`).
pub const DOMAIN_WILDCARD: char = '$';

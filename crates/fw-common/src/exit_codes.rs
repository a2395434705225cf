//! Process exit codes shared by every binary in the workspace.

/// Completed successfully.
pub const SUCCESS: i32 = 0;
/// A profile/ruleset failed to load or compile (`ConfigError`).
pub const CONFIG_ERROR: i32 = 2;
/// The classifier runtime could not start (unsupported platform, I/O).
pub const RUNTIME_ERROR: i32 = 3;
/// Verdict reconciliation could not complete (missing/malformed logs).
pub const RECONCILIATION_ERROR: i32 = 4;

//! Verdict reconciliation: merges the kernel and classifier logs, then
//! links the merged log against each profile interaction's expected
//! step sequence (spec §4.5).

pub mod error;
pub mod link;
pub mod merge;

pub use error::{Result, VerdictError};

use std::path::Path;

/// Runs both reconciliation stages back to back: merge the two raw logs,
/// then link the merged result against `profile_path`, falling back to
/// `ground_truth_log` for bare default-drop rows.
pub fn reconcile(
    kernel_log: &Path,
    classifier_log: &Path,
    edit_log: &Path,
    profile_path: &Path,
    ground_truth_log: &Path,
    merged_log: &Path,
    final_log: &Path,
) -> Result<()> {
    merge::merge_files(kernel_log, classifier_log, merged_log)?;
    link::link_files(merged_log, edit_log, profile_path, ground_truth_log, final_log)
}

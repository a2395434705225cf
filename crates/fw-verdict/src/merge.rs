//! Merges the kernel log (every packet the ruleset matched, whether it
//! went straight to a verdict or was queued) with the classifier log
//! (the queued subset's userspace verdict) into one merged log.
//! Grounded on `original_source/eval/fuzzing/ground-truth/merge-logs.py`:
//! both logs are independently id-counted per file, so the join key is
//! `(hash, timestamp)`, never `id` — a non-`QUEUE` kernel row is written
//! through unchanged, and a `QUEUE` row is matched against every
//! classifier row sharing its `(hash, timestamp)`, the merged row always
//! taking the kernel row's `id` and falling back to the kernel row's
//! `policy` only when the classifier row's is empty.

use crate::error::{Result, VerdictError};
use fw_common::log::LogRow;
use fw_common::Verdict;
use std::path::Path;

fn read_rows(path: &Path) -> Result<Vec<LogRow>> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| VerdictError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: LogRow = record.map_err(|source| VerdictError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

fn write_rows(path: &Path, rows: &[LogRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|source| VerdictError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    for row in rows {
        writer.serialize(row).map_err(|source| VerdictError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    writer.flush().map_err(|e| VerdictError::Write {
        path: path.to_path_buf(),
        source: csv::Error::from(e),
    })?;
    Ok(())
}

/// Collects every row in `rows[start_idx..]` whose `(hash, timestamp)`
/// equals the given pair, stopping as soon as a later timestamp is seen
/// (both logs are timestamp-sorted by the time this runs). Returns the
/// matches plus the index just past the last match, or `start_idx`
/// unchanged if nothing matched — mirrors `get_all_packets`.
fn collect_matching(rows: &[LogRow], hash: &str, timestamp: f64, start_idx: usize) -> (Vec<LogRow>, usize) {
    let mut acc = Vec::new();
    let mut last_match = None;
    for (offset, row) in rows[start_idx..].iter().enumerate() {
        if row.timestamp > timestamp {
            break;
        }
        if row.hash == hash && row.timestamp == timestamp {
            acc.push(row.clone());
            last_match = Some(start_idx + offset);
        }
    }
    let next_idx = last_match.map_or(start_idx, |idx| idx + 1);
    (acc, next_idx)
}

/// Merges one kernel/classifier pair: starts from the classifier row,
/// overwrites its `id` with the kernel row's, and borrows the kernel
/// row's `policy` only if the classifier row's is empty.
fn merge_pair(kernel_row: &LogRow, classifier_row: &LogRow) -> LogRow {
    let mut merged = classifier_row.clone();
    merged.id = kernel_row.id;
    if merged.policy.is_empty() {
        merged.policy = kernel_row.policy.clone();
    }
    merged
}

/// Merges two logs already parsed into [`LogRow`] vectors and sorted by
/// timestamp. A non-`QUEUE` kernel row passes through unchanged. A
/// `QUEUE` kernel row is matched against every classifier row sharing
/// its `(hash, timestamp)`: no match logs a warning and emits nothing
/// (the boot-time race the original guards against); equal counts zip
/// pairwise; one kernel row matching N>1 classifier rows emits N merged
/// rows, all sharing that kernel row's `id` (one packet the ruleset
/// matched against more than one policy).
pub fn merge_rows(mut kernel_rows: Vec<LogRow>, mut classifier_rows: Vec<LogRow>) -> Vec<LogRow> {
    kernel_rows.sort_by(|a, b| a.timestamp.partial_cmp(&b.timestamp).unwrap());
    classifier_rows.sort_by(|a, b| a.timestamp.partial_cmp(&b.timestamp).unwrap());

    let mut output = Vec::new();
    let mut kernel_idx = 0;
    let mut classifier_idx = 0;

    while kernel_idx < kernel_rows.len() {
        let kernel_row = kernel_rows[kernel_idx].clone();
        if kernel_row.verdict != Verdict::Queue {
            output.push(kernel_row);
            kernel_idx += 1;
            continue;
        }

        let (kernel_group, next_kernel_idx) =
            collect_matching(&kernel_rows, &kernel_row.hash, kernel_row.timestamp, kernel_idx);
        let (classifier_group, next_classifier_idx) =
            collect_matching(&classifier_rows, &kernel_row.hash, kernel_row.timestamp, classifier_idx);
        kernel_idx = next_kernel_idx;
        classifier_idx = next_classifier_idx;

        if classifier_group.is_empty() {
            tracing::warn!(
                hash = %kernel_row.hash,
                timestamp = kernel_row.timestamp,
                "no classifier row found for queued kernel row"
            );
        } else if kernel_group.len() == classifier_group.len() {
            for (k, c) in kernel_group.iter().zip(classifier_group.iter()) {
                output.push(merge_pair(k, c));
            }
        } else if kernel_group.len() == 1 && classifier_group.len() > 1 {
            for c in &classifier_group {
                output.push(merge_pair(&kernel_group[0], c));
            }
        }
    }

    output
}

pub fn merge_files(kernel_log: &Path, classifier_log: &Path, merged_log: &Path) -> Result<()> {
    let kernel_rows = read_rows(kernel_log)?;
    let classifier_rows = read_rows(classifier_log)?;
    let merged = merge_rows(kernel_rows, classifier_rows);
    write_rows(merged_log, &merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: u64, hash: &str, timestamp: f64, policy: &str, verdict: Verdict) -> LogRow {
        LogRow {
            id,
            hash: hash.to_string(),
            timestamp,
            policy: policy.to_string(),
            verdict,
        }
    }

    #[test]
    fn non_queue_kernel_row_passes_through_unchanged() {
        let kernel = vec![row(1, "h1", 1.0, "", Verdict::Drop)];
        let merged = merge_rows(kernel, vec![]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].verdict, Verdict::Drop);
    }

    #[test]
    fn queue_row_joins_the_classifier_row_sharing_hash_and_timestamp_not_id() {
        let kernel = vec![row(7, "h1", 1.0, "", Verdict::Queue)];
        let classifier = vec![row(400, "h1", 1.0, "dns-then-https#p1", Verdict::Accept)];
        let merged = merge_rows(kernel, classifier);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, 7, "merged row keeps the kernel row's id");
        assert_eq!(merged[0].policy, "dns-then-https#p1");
        assert_eq!(merged[0].verdict, Verdict::Accept);
    }

    #[test]
    fn queue_row_with_no_classifier_match_is_dropped_with_no_output() {
        let kernel = vec![row(1, "h1", 1.0, "", Verdict::Queue)];
        let merged = merge_rows(kernel, vec![]);
        assert!(merged.is_empty());
    }

    #[test]
    fn one_kernel_row_matched_to_several_classifier_rows_emits_one_per_classifier_row() {
        let kernel = vec![row(1, "h1", 1.0, "", Verdict::Queue)];
        let classifier = vec![
            row(10, "h1", 1.0, "single#p1", Verdict::Accept),
            row(11, "h1", 1.0, "single#p2", Verdict::Drop),
        ];
        let merged = merge_rows(kernel, classifier);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|r| r.id == 1));
        assert_eq!(merged[0].policy, "single#p1");
        assert_eq!(merged[1].policy, "single#p2");
    }

    #[test]
    fn classifier_policy_is_kept_over_an_empty_kernel_policy() {
        let kernel = vec![row(1, "h1", 1.0, "", Verdict::Queue)];
        let classifier = vec![row(2, "h1", 1.0, "single#p1", Verdict::Accept)];
        let merged = merge_rows(kernel, classifier);
        assert_eq!(merged[0].policy, "single#p1");
    }

    #[test]
    fn kernel_policy_fills_in_when_classifier_policy_is_empty() {
        let kernel = vec![row(1, "h1", 1.0, "single#p1", Verdict::Queue)];
        let classifier = vec![row(2, "h1", 1.0, "", Verdict::Accept)];
        let merged = merge_rows(kernel, classifier);
        assert_eq!(merged[0].policy, "single#p1");
    }

    #[test]
    fn unrelated_rows_at_different_timestamps_do_not_cross_match() {
        let kernel = vec![
            row(1, "h1", 1.0, "", Verdict::Queue),
            row(2, "h1", 2.0, "", Verdict::Queue),
        ];
        let classifier = vec![
            row(10, "h1", 1.0, "single#p1", Verdict::Accept),
            row(11, "h1", 2.0, "single#p2", Verdict::Drop),
        ];
        let merged = merge_rows(kernel, classifier);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].policy, "single#p1");
        assert_eq!(merged[1].policy, "single#p2");
    }
}

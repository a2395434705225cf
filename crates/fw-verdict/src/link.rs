//! Link-to-interactions: the second reconciliation stage. Walks a
//! merged log one row at a time, in file order, deciding what verdict
//! an unedited replay of the packet's interaction *should* have
//! produced and comparing it against what the kernel/classifier
//! actually returned. Grounded on
//! `original_source/eval/fuzzing/edited/link-interactions.py`.

use crate::error::Result;
use crate::error::VerdictError;
use fw_common::log::{FinalLogRow, LogRow, Reason};
use fw_common::Verdict;
use fw_profile::interaction::Step;
use fw_profile::policy::{Policy, PolicyKind};
use fw_profile::Profile;
use serde::Deserialize;
use serde_yaml::Value;
use std::path::Path;

/// One row of the fuzzer's edit log: the packet's hash before and after
/// mutation, which field was mutated, and its new raw value.
#[derive(Debug, Clone, Deserialize)]
pub struct EditRecord {
    pub old_hash: String,
    pub new_hash: String,
    pub protocol: String,
    pub field: String,
    pub new_value: String,
}

fn read_edits(path: &Path) -> Result<Vec<EditRecord>> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| VerdictError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut out = Vec::new();
    for record in reader.deserialize() {
        out.push(record.map_err(|source| VerdictError::Read {
            path: path.to_path_buf(),
            source,
        })?);
    }
    Ok(out)
}

fn read_rows(path: &Path) -> Result<Vec<LogRow>> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| VerdictError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut out = Vec::new();
    for record in reader.deserialize() {
        out.push(record.map_err(|source| VerdictError::Read {
            path: path.to_path_buf(),
            source,
        })?);
    }
    Ok(out)
}

fn write_final_rows(path: &Path, rows: &[FinalLogRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|source| VerdictError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|source| VerdictError::Write {
                path: path.to_path_buf(),
                source,
            })?;
    }
    writer
        .flush()
        .map_err(|e| VerdictError::Write {
            path: path.to_path_buf(),
            source: csv::Error::from(e),
        })
}

fn is_default_drop(policy: &str) -> bool {
    !policy.contains('#')
}

fn is_backward_name(name: &str) -> bool {
    name.ends_with("-backward")
}

/// True when `previous` belongs to the same interaction as `current`,
/// or when both are the forward/backward legs of the same standalone
/// ("single") policy.
fn is_same_interaction(previous_policy: &str, current_policy: &str) -> bool {
    let Some((prev_interaction, prev_name)) = previous_policy.split_once('#') else {
        return false;
    };
    let Some((current_interaction, current_name)) = current_policy.split_once('#') else {
        return false;
    };
    if prev_interaction == current_interaction {
        return true;
    }
    prev_interaction == "single"
        && current_interaction == "single"
        && (prev_name.contains(current_name) || current_name.contains(prev_name))
}

fn is_same_policy(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

fn dns_rr_type_name(code: u16) -> Option<&'static str> {
    Some(match code {
        1 => "A",
        2 => "NS",
        5 => "CNAME",
        6 => "SOA",
        12 => "PTR",
        15 => "MX",
        16 => "TXT",
        28 => "AAAA",
        255 => "ANY",
        _ => return None,
    })
}

fn find_policy<'a>(profile: &'a Profile, interaction_name: &str, fwd_policy_name: &str) -> Option<&'a Policy> {
    if interaction_name == "single" {
        profile
            .single_policies
            .iter()
            .find(|p| p.name == fwd_policy_name)
    } else {
        profile
            .interactions
            .iter()
            .find(|i| i.name == interaction_name)
            .and_then(|i| {
                i.steps
                    .iter()
                    .find(|s| !s.is_backward && s.policy.name == fwd_policy_name)
            })
            .map(|s| &s.policy)
    }
}

fn forward_steps<'a>(profile: &'a Profile, interaction_name: &str) -> Option<Vec<&'a Step>> {
    profile
        .interactions
        .iter()
        .find(|i| i.name == interaction_name)
        .map(|i| i.steps.iter().filter(|s| !s.is_backward).collect())
}

fn clause_qtype(policy: &Policy, protocol_key: &str) -> Option<String> {
    policy
        .clauses
        .iter()
        .find(|c| c.name == protocol_key)
        .and_then(|c| c.data.get(Value::String("qtype".to_string())))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Whether an edited packet is still compliant with the profile it was
/// matched against. Only (m)DNS edits are ever checked: an mDNS QR-flag
/// edit is unconditionally compliant, a DNS/mDNS `qtype` edit is
/// compliant iff the new type is still one the policy's clause accepts,
/// and every other edited field is unconditionally non-compliant.
fn is_compliant(edit: &EditRecord, policy_name: &str, interaction_name: &str, profile: &Profile) -> bool {
    if edit.protocol != "DNS" && edit.protocol != "mDNS" {
        return false;
    }
    if edit.protocol == "mDNS" && edit.field == "qr" {
        return true;
    }
    if edit.field != "qtype" {
        return false;
    }

    let fwd_name = policy_name.strip_suffix("-backward").unwrap_or(policy_name);
    let Some(policy) = find_policy(profile, interaction_name, fwd_name) else {
        return false;
    };
    let protocol_key = edit.protocol.to_ascii_lowercase();
    let Some(configured_qtype) = clause_qtype(policy, &protocol_key) else {
        return false;
    };
    let Ok(code) = edit.new_value.parse::<u16>() else {
        return false;
    };
    let Some(new_qtype_name) = dns_rr_type_name(code) else {
        return false;
    };
    new_qtype_name.eq_ignore_ascii_case(&configured_qtype)
}

fn ground_truth_verdict(row: &LogRow, ground_truth: &[LogRow]) -> Verdict {
    let any_accept = ground_truth
        .iter()
        .any(|r| r.id == row.id && r.verdict == Verdict::Accept);
    if any_accept {
        Verdict::Accept
    } else {
        Verdict::Drop
    }
}

fn settle(row: &LogRow, expected: Verdict, reason: Reason) -> FinalLogRow {
    FinalLogRow {
        id: row.id,
        hash: row.hash.clone(),
        timestamp: row.timestamp,
        policy: row.policy.clone(),
        actual_verdict: row.verdict,
        expected_verdict: expected,
        reason,
    }
}

/// Builds the set of policy names that may legally precede `policy_name`
/// (the forward form, with any `-backward` suffix already stripped) in
/// its interaction, and whether it is that interaction's first step.
fn expected_previous(
    interaction_name: &str,
    policy_name: &str,
    fwd_policy_name: &str,
    profile: &Profile,
) -> (bool, Vec<String>) {
    if interaction_name == "single" {
        let policy = find_policy(profile, interaction_name, fwd_policy_name);
        let is_one_off = policy.map_or(true, |p| p.kind == PolicyKind::OneOff);
        let is_bidirectional = policy.is_some_and(|p| p.is_bidirectional);
        if is_one_off && is_bidirectional {
            if is_backward_name(policy_name) {
                (false, vec![fwd_policy_name.to_string()])
            } else {
                (true, vec![format!("{fwd_policy_name}-backward")])
            }
        } else {
            // Unidirectional one-off, or transient/periodic: no chain to check.
            (true, Vec::new())
        }
    } else {
        let Some(steps) = forward_steps(profile, interaction_name) else {
            return (true, Vec::new());
        };
        let Some(idx) = steps.iter().position(|s| s.policy.name == fwd_policy_name) else {
            return (true, Vec::new());
        };
        let policy = &steps[idx].policy;
        let is_first = idx == 0;

        if (policy.kind == PolicyKind::OneOff || policy.kind == PolicyKind::Transient)
            && policy.is_bidirectional
            && is_backward_name(policy_name)
        {
            return (is_first, vec![fwd_policy_name.to_string()]);
        }

        let mut names = Vec::new();
        let mut backtrack_idx: isize = idx as isize - 1;
        loop {
            let wrapped = if backtrack_idx < 0 {
                steps.len() as isize + backtrack_idx
            } else {
                backtrack_idx
            };
            let Ok(wrapped) = usize::try_from(wrapped) else {
                break;
            };
            let Some(previous_step) = steps.get(wrapped) else {
                break;
            };
            let previous_policy = &previous_step.policy;
            let mut name = previous_policy.name.clone();
            if previous_policy.kind == PolicyKind::OneOff && previous_policy.is_bidirectional {
                name = format!("{name}-backward");
            }
            names.push(name.clone());

            if (previous_policy.kind == PolicyKind::Transient || previous_policy.kind == PolicyKind::Periodic)
                && previous_policy.is_bidirectional
            {
                names.push(format!("{name}-backward"));
            }

            if previous_policy.kind == PolicyKind::Periodic {
                backtrack_idx -= 1;
                continue;
            }
            break;
        }
        (is_first, names)
    }
}

fn link_one(
    rows: &[LogRow],
    index: usize,
    ground_truth: &[LogRow],
    edits: &[EditRecord],
    profile: &Profile,
) -> FinalLogRow {
    let row = &rows[index];

    if let Some(edit) = edits
        .iter()
        .find(|e| e.new_hash == row.hash && e.new_hash != e.old_hash)
    {
        let compliant = match row.split_policy() {
            Some((interaction_name, policy_name)) => {
                is_compliant(edit, policy_name, interaction_name, profile)
            }
            None => false,
        };
        if !compliant {
            return settle(row, Verdict::Drop, Reason::Edited);
        }
    }

    let Some((interaction_name, policy_name)) = row.split_policy() else {
        let expected = ground_truth_verdict(row, ground_truth);
        return settle(row, expected, Reason::GroundTruth);
    };

    let fwd_policy_name = policy_name.strip_suffix("-backward").unwrap_or(policy_name);

    if interaction_name == "single" {
        let policy = find_policy(profile, interaction_name, fwd_policy_name);
        let is_one_off = policy.map_or(true, |p| p.kind == PolicyKind::OneOff);
        let is_bidirectional = policy.is_some_and(|p| p.is_bidirectional);
        if !(is_one_off && is_bidirectional) {
            return settle(row, row.verdict, Reason::GroundTruth);
        }
    }

    let (is_first, expected_previous_names) =
        expected_previous(interaction_name, policy_name, fwd_policy_name, profile);
    let policy_kind = find_policy(profile, interaction_name, fwd_policy_name).map(|p| p.kind);

    let mut seen_previous_policy = false;
    let mut j = index as isize - 1;
    while j >= 0 {
        let previous_row = &rows[j as usize];
        if is_default_drop(&previous_row.policy) {
            j -= 1;
            continue;
        }
        if !is_same_interaction(&previous_row.policy, &row.policy) {
            j -= 1;
            continue;
        }

        let Some((_, actual_previous_policy_name)) = previous_row.split_policy() else {
            j -= 1;
            continue;
        };
        let actual_previous_verdict = previous_row.verdict;

        let is_recurrence = actual_previous_policy_name == policy_name
            || (policy_kind != Some(PolicyKind::OneOff)
                && is_same_policy(fwd_policy_name, actual_previous_policy_name));

        if is_recurrence {
            if policy_kind != Some(PolicyKind::OneOff) && actual_previous_verdict == Verdict::Accept {
                return settle(row, row.verdict, Reason::GroundTruth);
            }
            if seen_previous_policy
                && policy_kind == Some(PolicyKind::OneOff)
                && actual_previous_verdict == Verdict::Accept
                && !expected_previous_names.iter().any(|n| n == policy_name)
            {
                return settle(row, Verdict::Drop, Reason::Interaction);
            }
            j -= 1;
            continue;
        }

        if expected_previous_names
            .iter()
            .any(|n| n == actual_previous_policy_name)
        {
            seen_previous_policy = true;
            if actual_previous_verdict == Verdict::Accept {
                return settle(row, row.verdict, Reason::GroundTruth);
            }
            j -= 1;
            continue;
        }

        if actual_previous_verdict == Verdict::Accept {
            return settle(row, Verdict::Drop, Reason::Interaction);
        }
        j -= 1;
    }

    if is_first {
        settle(row, row.verdict, Reason::GroundTruth)
    } else {
        settle(row, Verdict::Drop, Reason::Interaction)
    }
}

/// Links every row of a merged log against its interaction's expected
/// sequence, in file order.
pub fn link_rows(
    rows: &[LogRow],
    ground_truth: &[LogRow],
    edits: &[EditRecord],
    profile: &Profile,
) -> Vec<FinalLogRow> {
    (0..rows.len())
        .map(|i| link_one(rows, i, ground_truth, edits, profile))
        .collect()
}

pub fn link_files(
    merged_log: &Path,
    edit_log: &Path,
    profile_path: &Path,
    ground_truth_log: &Path,
    final_log: &Path,
) -> Result<()> {
    let rows = read_rows(merged_log)?;
    let ground_truth = read_rows(ground_truth_log)?;
    let edits = read_edits(edit_log)?;
    let (profile, _unsupported) = Profile::load(profile_path)?;
    let final_rows = link_rows(&rows, &ground_truth, &edits, &profile);
    write_final_rows(final_log, &final_rows)
}

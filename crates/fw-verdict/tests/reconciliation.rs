//! End-to-end merge + link-to-interactions coverage, exercised against
//! profiles loaded the same way `fw-compile`'s scenarios are (see
//! `crates/fw-compile/tests/scenarios.rs`). Builds `LogRow`/`EditRecord`
//! values directly rather than hand-writing CSV fixtures, the same
//! pattern `merge.rs`/`link.rs`'s own unit tests use. Kernel/classifier
//! rows are joined by `(hash, timestamp)`, not `id` — each pair below
//! gives the kernel and classifier row the same hash and timestamp but
//! deliberately different ids, so a test that passed by id-coincidence
//! would fail here.

use fw_common::log::{LogRow, Reason};
use fw_common::Verdict;
use fw_verdict::link::{link_rows, EditRecord};
use fw_verdict::merge::merge_rows;
use std::io::Write;

fn profile_from(yaml: &str) -> fw_profile::Profile {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.yaml");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(yaml.as_bytes())
        .unwrap();
    let (profile, unsupported) = fw_profile::Profile::load(&path).unwrap();
    assert!(unsupported.is_empty(), "unsupported protocols: {unsupported:?}");
    profile
}

fn row(id: u64, hash: &str, timestamp: f64, policy: &str, verdict: Verdict) -> LogRow {
    LogRow {
        id,
        hash: hash.to_string(),
        timestamp,
        policy: policy.to_string(),
        verdict,
    }
}

/// S6. A DNS question edited to request an AAAA record against a policy
/// configured for `qtype: A` only is non-compliant: the final log drops
/// it with `reason = Edited` regardless of what the kernel/classifier
/// pair actually decided.
#[test]
fn s6_dns_qtype_edit_outside_the_configured_type_forces_a_drop() {
    let profile = profile_from(
        "device-info:\n  name: bulb\n  mac: \"aa:bb:cc:dd:ee:ff\"\n  ipv4: 192.168.1.50\n\
single-policies:\n\
  - name: dns-a-only\n    udp:\n      dport: 53\n    dns:\n      qtype: A\n",
    );

    let kernel = vec![row(1, "h-edited", 1.0, "", Verdict::Queue)];
    let classifier = vec![row(50, "h-edited", 1.0, "single#dns-a-only", Verdict::Accept)];
    let merged = merge_rows(kernel, classifier);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].id, 1, "merged row keeps the kernel row's id, not the classifier's");
    assert_eq!(merged[0].policy, "single#dns-a-only");

    let edits = vec![EditRecord {
        old_hash: "h-orig".into(),
        new_hash: "h-edited".into(),
        protocol: "DNS".into(),
        field: "qtype".into(),
        new_value: "28".into(), // AAAA, not the configured A
    }];

    let final_rows = link_rows(&merged, &[], &edits, &profile);
    assert_eq!(final_rows.len(), 1);
    assert_eq!(final_rows[0].expected_verdict, Verdict::Drop);
    assert_eq!(final_rows[0].reason, Reason::Edited);
    assert_eq!(final_rows[0].actual_verdict, Verdict::Accept);
}

/// A `qtype` edit that still resolves to the policy's configured type is
/// compliant and falls through to the interaction/ground-truth checks
/// rather than being force-dropped.
#[test]
fn dns_qtype_edit_within_the_configured_type_is_compliant() {
    let profile = profile_from(
        "device-info:\n  name: bulb\n  mac: \"aa:bb:cc:dd:ee:ff\"\n  ipv4: 192.168.1.50\n\
single-policies:\n\
  - name: dns-a-only\n    udp:\n      dport: 53\n    dns:\n      qtype: A\n",
    );

    let merged = vec![row(1, "h-edited", 1.0, "single#dns-a-only", Verdict::Accept)];
    let edits = vec![EditRecord {
        old_hash: "h-orig".into(),
        new_hash: "h-edited".into(),
        protocol: "DNS".into(),
        field: "qtype".into(),
        new_value: "1".into(), // A, matches the configured qtype
    }];

    let final_rows = link_rows(&merged, &[], &edits, &profile);
    assert_eq!(final_rows[0].expected_verdict, Verdict::Accept);
    assert_eq!(final_rows[0].reason, Reason::GroundTruth);
}

/// Full pipeline for a two-step interaction: the kernel log holds the
/// queued default-drop rows alongside the classifier's policy-annotated
/// rows, merge picks the classifier's verdict and policy for each (while
/// keeping the kernel row's id), and link approves the second step only
/// because the first step's accept immediately precedes it.
#[test]
fn merge_then_link_approves_a_two_step_interaction_in_order() {
    let profile = profile_from(
        "device-info:\n  name: bulb\n  mac: \"aa:bb:cc:dd:ee:ff\"\n  ipv4: 192.168.1.50\n\
interactions:\n\
  - name: dns-then-https\n    policies:\n\
      - name: dns-question\n        udp:\n          dport: 53\n\
        dns:\n          qtype: A\n          qname: use1-api.example.com\n\
      - name: https-request\n        ipv4:\n          dst: use1-api.example.com\n        tcp:\n          dport: 443\n",
    );

    let kernel = vec![
        row(1, "h1", 1.0, "", Verdict::Queue),
        row(2, "h2", 2.0, "", Verdict::Queue),
    ];
    let classifier = vec![
        row(101, "h1", 1.0, "dns-then-https#dns-question", Verdict::Accept),
        row(102, "h2", 2.0, "dns-then-https#https-request", Verdict::Accept),
    ];
    let merged = merge_rows(kernel, classifier);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].id, 1);
    assert_eq!(merged[0].policy, "dns-then-https#dns-question");
    assert_eq!(merged[1].id, 2);
    assert_eq!(merged[1].policy, "dns-then-https#https-request");

    let final_rows = link_rows(&merged, &[], &[], &profile);
    assert_eq!(final_rows[0].expected_verdict, Verdict::Accept);
    assert_eq!(final_rows[0].reason, Reason::GroundTruth);
    assert_eq!(final_rows[1].expected_verdict, Verdict::Accept);
    assert_eq!(final_rows[1].reason, Reason::GroundTruth);
}

/// The second step of the same interaction, observed with no first step
/// anywhere in the log, is an interaction violation: the classifier's
/// accept is overridden to an expected drop.
#[test]
fn merge_then_link_rejects_a_second_step_with_no_preceding_first_step() {
    let profile = profile_from(
        "device-info:\n  name: bulb\n  mac: \"aa:bb:cc:dd:ee:ff\"\n  ipv4: 192.168.1.50\n\
interactions:\n\
  - name: dns-then-https\n    policies:\n\
      - name: dns-question\n        udp:\n          dport: 53\n\
        dns:\n          qtype: A\n          qname: use1-api.example.com\n\
      - name: https-request\n        ipv4:\n          dst: use1-api.example.com\n        tcp:\n          dport: 443\n",
    );

    let kernel = vec![row(2, "h2", 2.0, "", Verdict::Queue)];
    let classifier = vec![row(
        202,
        "h2",
        2.0,
        "dns-then-https#https-request",
        Verdict::Accept,
    )];
    let merged = merge_rows(kernel, classifier);

    let final_rows = link_rows(&merged, &[], &[], &profile);
    assert_eq!(final_rows[0].expected_verdict, Verdict::Drop);
    assert_eq!(final_rows[0].reason, Reason::Interaction);
}

/// A kernel-only row (a `QUEUE` verdict with no classifier counterpart —
/// the benign boot-time race the original guards against) is dropped
/// from the merged log entirely rather than half-merged.
#[test]
fn merge_drops_a_queued_kernel_row_with_no_classifier_counterpart() {
    let kernel = vec![row(9, "h9", 9.0, "", Verdict::Queue)];
    let merged = merge_rows(kernel, vec![]);
    assert!(merged.is_empty());
}

/// A bare default-drop row (never queued, so merge passes it through
/// unchanged) with no recognizable policy name falls back to the
/// ground-truth log, matched by packet id, for its expected verdict.
#[test]
fn link_uses_ground_truth_log_for_bare_default_drop_rows() {
    let kernel = vec![row(9, "h9", 9.0, "", Verdict::Drop)];
    let merged = merge_rows(kernel, vec![]);
    assert_eq!(merged.len(), 1);
    assert!(merged[0].is_default_drop());

    let profile = profile_from(
        "device-info:\n  name: bulb\n  mac: \"aa:bb:cc:dd:ee:ff\"\n  ipv4: 192.168.1.50\n",
    );
    let ground_truth = vec![row(9, "h9-gt", 9.0, "single#anything", Verdict::Accept)];
    let final_rows = link_rows(&merged, &ground_truth, &[], &profile);
    assert_eq!(final_rows[0].expected_verdict, Verdict::Accept);
    assert_eq!(final_rows[0].reason, Reason::GroundTruth);
}

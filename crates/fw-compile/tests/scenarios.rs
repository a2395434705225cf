//! End-to-end compilation scenarios S1-S6, exercised at the profile →
//! ruleset/classifier-config boundary (the compiler's own test layer;
//! S2/S6's runtime/reconciliation halves live in `fw-classify` and
//! `crates/fw-verdict/tests/reconciliation.rs` respectively).

use fw_common::log::LogType;
use fw_profile::Profile;
use std::io::Write;

fn profile_from(yaml: &str) -> fw_profile::Profile {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.yaml");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(yaml.as_bytes())
        .unwrap();
    let (profile, unsupported) = Profile::load(&path).unwrap();
    assert!(unsupported.is_empty(), "unsupported protocols: {unsupported:?}");
    profile
}

/// S1. Periodic rate-limited ARP: one periodic policy, `rate: 1/second
/// burst 1 packets`. The stateless ARP match routes to a queue (not a
/// direct accept) because the rate stat forces admission through the
/// classifier, and the compiled queue entry carries the parsed rate.
#[test]
fn s1_periodic_rate_limited_arp_forces_a_queue_with_its_rate() {
    let profile = profile_from(
        "device-info:\n  name: phone-peer\n  mac: \"aa:bb:cc:dd:ee:ff\"\n  ipv4: 192.168.1.2\n\
single-policies:\n\
  - name: arp-probe\n    type: periodic\n    stats:\n      rate: 1/second burst 1 packets\n    arp:\n      type: request\n      sha: self\n      tha: self\n",
    );
    let output = fw_compile::compile(&profile, "firewall", "input", LogType::None, 100).unwrap();
    assert_eq!(output.config.queues.len(), 1);
    let entry = &output.config.queues[0];
    assert!(entry.is_periodic);
    let rate = entry.rate.expect("rate carried through to the queue entry");
    assert_eq!(rate.value, 1);
    assert!(output.ruleset.contains("queue num"));
}

/// S2. DNS-then-HTTPS interaction: a two-step interaction compiles to two
/// queue entries sharing one interaction name, the second step carrying
/// the domain-bound stateful predicate that only resolves once the first
/// step's DNS answer is observed.
#[test]
fn s2_dns_then_https_interaction_shares_one_interaction_name_across_steps() {
    let profile = profile_from(
        "device-info:\n  name: bulb\n  mac: \"aa:bb:cc:dd:ee:ff\"\n  ipv4: 192.168.1.50\n\
interactions:\n\
  - name: dns-then-https\n    policies:\n\
      - name: dns-question\n        udp:\n          dport: 53\n\
        dns:\n          qtype: A\n          qname: use1-api.example.com\n\
      - name: https-request\n        ipv4:\n          dst: use1-api.example.com\n        tcp:\n          dport: 443\n",
    );
    let output = fw_compile::compile(&profile, "firewall", "input", LogType::None, 100).unwrap();
    assert_eq!(output.config.queues.len(), 2);
    assert!(output
        .config
        .queues
        .iter()
        .all(|q| q.interaction_name == "dns-then-https"));
    assert_eq!(output.config.queues[0].policy_name, "dns-question");
    assert_eq!(output.config.queues[1].policy_name, "https-request");
}

/// S3. Wildcard domain: a single policy naming a `*.example.org` suffix
/// compiles to one stateful domain predicate, queued (never a direct
/// accept, since the domain binding can only be checked in userspace).
#[test]
fn s3_wildcard_domain_single_policy_is_queued() {
    let profile = profile_from(
        "device-info:\n  name: bulb\n  mac: \"aa:bb:cc:dd:ee:ff\"\n  ipv4: 192.168.1.50\n\
single-policies:\n\
  - name: wildcard-https\n    ipv4:\n      dst: \"*.example.org\"\n    tcp:\n      dport: 443\n",
    );
    let output = fw_compile::compile(&profile, "firewall", "input", LogType::None, 100).unwrap();
    assert_eq!(output.config.queues.len(), 1);
    assert!(!output.config.queues[0].predicates.is_empty());
}

/// S4. Bidirectional one-off DHCP: a single `bidirectional: true` step
/// expands into a forward step followed by its synthetic backward
/// sibling, in that order, each getting its own queue.
#[test]
fn s4_bidirectional_dhcp_expands_to_forward_then_backward_queue() {
    let profile = profile_from(
        "device-info:\n  name: bulb\n  mac: \"aa:bb:cc:dd:ee:ff\"\n  ipv4: 192.168.1.50\n\
interactions:\n\
  - name: dhcp-lease\n    policies:\n\
      - name: dhcp-exchange\n        bidirectional: true\n        dhcp:\n          type: DHCPDISCOVER\n",
    );
    let output = fw_compile::compile(&profile, "firewall", "input", LogType::None, 100).unwrap();
    assert_eq!(output.config.queues.len(), 2);
    assert!(!output.config.queues[0].is_backward);
    assert_eq!(output.config.queues[0].policy_name, "dhcp-exchange");
    assert!(output.config.queues[1].is_backward);
    assert_eq!(output.config.queues[1].policy_name, "dhcp-exchange-backward");
}

/// S5. Transient packet-count: `packet-count: {fwd: 3}` is carried
/// through to the compiled queue entry unchanged, so the classifier can
/// enforce the 3-packet cutoff at runtime.
#[test]
fn s5_transient_packet_count_is_carried_to_the_queue_entry() {
    let profile = profile_from(
        "device-info:\n  name: bulb\n  mac: \"aa:bb:cc:dd:ee:ff\"\n  ipv4: 192.168.1.50\n\
single-policies:\n\
  - name: burst-probe\n    type: transient\n    stats:\n      packet-count:\n        fwd: 3\n    ipv4:\n      dst: self\n",
    );
    let output = fw_compile::compile(&profile, "firewall", "input", LogType::None, 100).unwrap();
    assert_eq!(output.config.queues.len(), 1);
    let entry = &output.config.queues[0];
    assert!(entry.is_transient);
    assert_eq!(entry.packet_count.fwd, Some(3));
}

/// S6's precondition: the compiler must resolve the exact `qtype = A`
/// clause the reconciliation stage later checks an edited packet against
/// (full S6 behavior is exercised in
/// `crates/fw-verdict/tests/reconciliation.rs`).
#[test]
fn s6_dns_qtype_clause_compiles_to_a_stateful_predicate() {
    let profile = profile_from(
        "device-info:\n  name: bulb\n  mac: \"aa:bb:cc:dd:ee:ff\"\n  ipv4: 192.168.1.50\n\
single-policies:\n\
  - name: dns-a-only\n    udp:\n      dport: 53\n    dns:\n      qtype: A\n",
    );
    let output = fw_compile::compile(&profile, "firewall", "input", LogType::None, 100).unwrap();
    assert_eq!(output.config.queues.len(), 1);
    assert!(!output.config.queues[0].predicates.is_empty());
}

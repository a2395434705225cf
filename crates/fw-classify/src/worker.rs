//! One thread per NFQUEUE, each doing a genuine blocking read (NFQUEUE
//! sockets support this directly, unlike the poll-driven ring buffer
//! `assay-monitor` uses for eBPF) — spec §4.4, §9 REDESIGN FLAG.
//!
//! NFQUEUE is a Linux-only facility (`libnetfilter_queue`), so this
//! module, like `assay-monitor::loader`, only builds on Linux.
#![cfg(target_os = "linux")]

use crate::dns_map::DnsMap;
use crate::error::{ClassifyError, Result};
use crate::log::{packet_hash, PacketLog};
use crate::packet::{self, L4Protocol};
use crate::state::InteractionState;
use crate::token_bucket::TokenBucket;
use fw_common::metrics::QueueMetrics;
use fw_common::Verdict as FwVerdict;
use fw_compile::classifier_config::QueueEntry;
use fw_profile::protocols::{Direction, StatefulPredicate};
use nfq::{Queue, Verdict as NfqVerdict};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Evaluates one packet's predicate set. `resolved_ip` is the
/// interaction's cached address, if any; a domain predicate with no
/// cached binding yet and no DNS-map hit fails closed.
fn evaluate_predicates(
    predicates: &[StatefulPredicate],
    dns_map: &DnsMap,
    cached_ip: Option<IpAddr>,
    ip_header: &packet::IpHeader,
    l4_payload: &[u8],
) -> bool {
    for predicate in predicates {
        let ok = match predicate {
            StatefulPredicate::IpAddrDomain { dir, domain } => {
                let candidate = match dir {
                    Direction::Src => ip_header.src,
                    Direction::Dst => ip_header.dst,
                };
                Some(candidate) == cached_ip
                    || dns_map.resolves(&domain.name, domain.suffix, candidate)
            }
            StatefulPredicate::DnsQr { response } => packet::parse_dns(l4_payload)
                .map(|m| m.is_response == *response)
                .unwrap_or(false),
            StatefulPredicate::DnsQtype(expected) => packet::parse_dns(l4_payload)
                .map(|m| &m.qtype == expected)
                .unwrap_or(false),
            StatefulPredicate::DnsQuestionName(domain) => packet::parse_dns(l4_payload)
                .map(|m| domain.matches_question(&m.qname))
                .unwrap_or(false),
            StatefulPredicate::HttpIsRequest(expected) => packet::parse_http(l4_payload)
                .map(|m| m.is_request == *expected)
                .unwrap_or(false),
            StatefulPredicate::HttpMethod(expected) => packet::parse_http(l4_payload)
                .and_then(|m| m.method)
                .map(|m| &m == expected)
                .unwrap_or(false),
            StatefulPredicate::HttpUri(expected) => packet::parse_http(l4_payload)
                .and_then(|m| m.uri)
                .map(|uri| expected.matches(&uri))
                .unwrap_or(false),
            StatefulPredicate::CoapType(expected) => packet::parse_coap(l4_payload)
                .map(|m| &m.msg_type == expected)
                .unwrap_or(false),
            StatefulPredicate::CoapMethod(expected) => packet::parse_coap(l4_payload)
                .map(|m| &m.method == expected)
                .unwrap_or(false),
            StatefulPredicate::CoapUri(expected) => packet::parse_coap(l4_payload)
                .map(|m| &m.uri == expected)
                .unwrap_or(false),
            StatefulPredicate::SsdpIsRequest(expected) => packet::parse_ssdp(l4_payload)
                .map(|m| m.is_request == *expected)
                .unwrap_or(false),
            StatefulPredicate::SsdpMethod(expected) => packet::parse_ssdp(l4_payload)
                .and_then(|m| m.method)
                .map(|m| &m == expected)
                .unwrap_or(false),
            StatefulPredicate::DhcpMessageType(expected) => packet::parse_dhcp(l4_payload)
                .map(|m| &m.message_type == expected)
                .unwrap_or(false),
            StatefulPredicate::DhcpClientMac(expected) => packet::parse_dhcp(l4_payload)
                .map(|m| &m.client_mac == expected)
                .unwrap_or(false),
            StatefulPredicate::IgmpMessageType(expected) => packet::parse_igmp(l4_payload)
                .map(|m| &m.msg_type == expected)
                .unwrap_or(false),
            StatefulPredicate::IgmpGroup(expected) => packet::parse_igmp(l4_payload)
                .map(|m| m.group.to_string() == *expected)
                .unwrap_or(false),
        };
        if !ok {
            return false;
        }
    }
    true
}

pub struct Worker {
    entry: QueueEntry,
    dns_map: Arc<Mutex<DnsMap>>,
    interaction_state: Option<Arc<Mutex<InteractionState>>>,
    token_bucket: Option<Mutex<TokenBucket>>,
    metrics: Arc<QueueMetrics>,
    packet_log: Option<Arc<PacketLog>>,
    shutdown: Arc<AtomicBool>,
}

impl Worker {
    pub fn new(
        entry: QueueEntry,
        dns_map: Arc<Mutex<DnsMap>>,
        interaction_state: Option<Arc<Mutex<InteractionState>>>,
        metrics: Arc<QueueMetrics>,
        packet_log: Option<Arc<PacketLog>>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let token_bucket = entry
            .rate
            .as_ref()
            .and_then(TokenBucket::from_rate)
            .map(Mutex::new);
        Worker {
            entry,
            dns_map,
            interaction_state,
            token_bucket,
            metrics,
            packet_log,
            shutdown,
        }
    }

    /// The `interaction#policy` string this queue's packets are logged
    /// under, matching `fw-verdict::link`'s `LogRow::split_policy` format.
    fn log_policy_name(&self) -> String {
        format!("{}#{}", self.entry.interaction_name, self.entry.policy_name)
    }

    fn queue_id_u16(&self) -> u16 {
        self.entry.queue_id.try_into().unwrap_or(0)
    }

    /// Runs the blocking receive loop until `shutdown` is set. Intended
    /// to be spawned one-per-queue (spec §4.4).
    pub fn run(&self) -> Result<()> {
        let queue_id = self.queue_id_u16();
        let mut queue = Queue::open().map_err(|source| ClassifyError::QueueOpen { queue_id, source })?;
        queue
            .bind(queue_id)
            .map_err(|source| ClassifyError::QueueBind { queue_id, source })?;

        while !self.shutdown.load(Ordering::Relaxed) {
            let mut msg = match queue.recv() {
                Ok(m) => m,
                Err(source) => return Err(ClassifyError::QueueRecv { queue_id, source }),
            };
            let verdict = self.classify(msg.get_payload());
            msg.set_verdict(match verdict {
                FwVerdict::Accept => NfqVerdict::Accept,
                _ => NfqVerdict::Drop,
            });
            if let Err(source) = queue.verdict(msg) {
                return Err(ClassifyError::QueueRecv { queue_id, source });
            }
        }
        Ok(())
    }

    fn classify(&self, payload: &[u8]) -> FwVerdict {
        let verdict = self.classify_inner(payload);
        if let Some(log) = &self.packet_log {
            if let Err(source) = log.record(packet_hash(payload), self.log_policy_name(), verdict) {
                warn!(queue = self.entry.queue_id, %source, "failed to append classifier log row");
            }
        }
        verdict
    }

    fn classify_inner(&self, payload: &[u8]) -> FwVerdict {
        let Some((ip_header, offset)) = packet::parse_ip(payload) else {
            warn!(queue = self.entry.queue_id, "unparseable packet, dropping");
            self.metrics.record_drop(self.entry.queue_id);
            return FwVerdict::Drop;
        };
        let l4_payload = match ip_header.protocol {
            L4Protocol::Tcp => packet::parse_tcp(&payload[offset..])
                .map(|(_, hdr_len)| &payload[offset + hdr_len..]),
            L4Protocol::Udp => packet::parse_udp(&payload[offset..])
                .map(|(_, hdr_len)| &payload[offset + hdr_len..]),
            _ => Some(&payload[offset..]),
        };
        let Some(l4_payload) = l4_payload else {
            self.metrics.record_drop(self.entry.queue_id);
            return FwVerdict::Drop;
        };

        let cached_ip = self
            .interaction_state
            .as_ref()
            .and_then(|s| s.lock().ok().and_then(|s| s.cached_ip()));

        let dns_map = self.dns_map.lock().unwrap_or_else(|e| e.into_inner());
        let predicates_ok = evaluate_predicates(
            &self.entry.predicates,
            &dns_map,
            cached_ip,
            &ip_header,
            l4_payload,
        );
        drop(dns_map);

        if !predicates_ok {
            debug!(queue = self.entry.queue_id, "predicate mismatch");
            self.metrics.record_drop(self.entry.queue_id);
            return FwVerdict::Drop;
        }

        if let Some(size) = &self.entry.packet_size {
            if !size.contains(ip_header.total_len) {
                self.metrics.record_drop(self.entry.queue_id);
                return FwVerdict::Drop;
            }
        }

        if let Some(bucket) = &self.token_bucket {
            let mut bucket = bucket.lock().unwrap_or_else(|e| e.into_inner());
            if !bucket.try_admit(ip_header.total_len) {
                self.metrics.record_overflow(self.entry.queue_id);
                return FwVerdict::Drop;
            }
        }

        if let Some(state) = &self.interaction_state {
            if let Ok(mut state) = state.lock() {
                if self.entry.is_backward {
                    state.advance(None);
                } else {
                    state.advance(Some(ip_header.dst));
                }
            }
        }

        self.metrics.record_accept(self.entry.queue_id);
        FwVerdict::Accept
    }
}

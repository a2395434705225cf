//! A single policy: one or more protocol clauses plus the statistics
//! that turn it into a rate-limited, size-bounded, or counted rule.
//! Grounded on `original_source/src/translator/Policy.py` and
//! `original_source/src/translator/NFQueue.py` (which fields are
//! match-producing versus counter-only).

use crate::device::DeviceInfo;
use crate::error::{ProfileError, Result, UnsupportedProtocol};
use crate::network::NetworkInfo;
use crate::protocols::{ParseContext, ParsedClause, Protocol};
use crate::stats::{parse_duration_micros, DirectionalCounter, PacketSize, Rate};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// How a policy's interaction replays: once (`OneOff`), gated by a
/// transient condition re-checked every packet (`Transient`), or on a
/// fixed cadence (`Periodic`) — spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyKind {
    OneOff,
    Transient,
    Periodic,
}

/// A third-party LAN host this policy's traffic also touches, kept for
/// bookkeeping only (spec §4.3): it never contributes match fragments
/// of its own, grounded on `translator.py`'s `global_accs["other_hosts"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherHost {
    pub name: String,
}

/// The raw `stats` block of a policy, before it is split into the
/// match-producing fields (rate, packet-size) and the counter-only
/// fields (packet-count, duration) — spec §3's `stats_metadata`
/// distinction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_size: Option<PacketSize>,
    #[serde(default, skip_serializing_if = "DirectionalCounter::is_empty")]
    pub packet_count: DirectionalCounter,
    /// Duration bound, stored as whole microseconds (the unit
    /// `DirectionalCounter`'s `u64` slots share across the policy).
    #[serde(default, skip_serializing_if = "DirectionalCounter::is_empty")]
    pub duration_micros: DirectionalCounter,
}

impl DirectionalCounter {
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.fwd.is_none() && self.bwd.is_none()
    }
}

/// A resolved policy clause: one protocol and its raw YAML mapping, not
/// yet parsed into matches (parsing happens once direction/backward is
/// known, at `Policy::parse_protocols` time).
#[derive(Debug, Clone)]
pub struct ProtocolClause {
    pub name: String,
    pub data: Mapping,
}

/// A single policy within an interaction (or a standalone "single"
/// policy), spec §3.
#[derive(Debug, Clone)]
pub struct Policy {
    pub name: String,
    pub kind: PolicyKind,
    pub clauses: Vec<ProtocolClause>,
    pub stats: Stats,
    pub is_bidirectional: bool,
    pub other_host: Option<OtherHost>,
}

impl Policy {
    /// Parses every clause against the given direction context, folding
    /// all of them into one [`ParsedClause`]. A clause naming an
    /// unregistered protocol is skipped and recorded in `unsupported`
    /// rather than aborting the whole policy (spec §7).
    pub fn parse_protocols(
        &self,
        device: &DeviceInfo,
        network: &NetworkInfo,
        is_backward: bool,
        unsupported: &mut Vec<UnsupportedProtocol>,
    ) -> Result<ParsedClause> {
        let ctx = ParseContext {
            device,
            network,
            is_backward,
            initiator: None,
        };
        let mut merged = ParsedClause::default();
        for clause in &self.clauses {
            match Protocol::from_name(&clause.name) {
                Some(protocol) => {
                    let parsed = protocol.parse(&clause.data, &ctx)?;
                    merged.merge(parsed);
                }
                None => unsupported.push(UnsupportedProtocol(clause.name.clone())),
            }
        }
        Ok(merged)
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.kind, PolicyKind::Transient)
    }

    pub fn is_periodic(&self) -> bool {
        matches!(self.kind, PolicyKind::Periodic)
    }

    /// True when this policy (in the given direction) is the counter's
    /// originating leg, per `DirectionalCounter::is_base_for`.
    pub fn is_base_for_counter(&self, counter: &DirectionalCounter, is_backward: bool) -> bool {
        counter.is_base_for(is_backward)
    }

    pub fn is_backward_for_counter(&self, counter: &DirectionalCounter, is_backward: bool) -> bool {
        counter.is_backward_for(is_backward)
    }
}

fn kind_from_str(s: &str, policy_name: &str) -> Result<PolicyKind> {
    match s {
        "one-off" | "one_off" => Ok(PolicyKind::OneOff),
        "transient" => Ok(PolicyKind::Transient),
        "periodic" => Ok(PolicyKind::Periodic),
        other => Err(ProfileError::ConflictingStats {
            policy: policy_name.to_string(),
            reason: format!("unknown policy kind {other:?}"),
        }),
    }
}

fn counter_from_value(value: Option<&Value>, policy_name: &str, field: &str, is_duration: bool) -> Result<DirectionalCounter> {
    let Some(value) = value else {
        return Ok(DirectionalCounter::default());
    };
    let convert = |v: &Value| -> Result<u64> {
        if is_duration {
            let raw = crate::protocols::value_to_string(v);
            parse_duration_micros(&raw)
        } else {
            v.as_u64().ok_or_else(|| ProfileError::ConflictingStats {
                policy: policy_name.to_string(),
                reason: format!("{field} must be an integer"),
            })
        }
    };
    match value {
        Value::Mapping(map) => {
            let default = map
                .get(Value::String("default".to_string()))
                .map(convert)
                .transpose()?;
            let fwd = map
                .get(Value::String("fwd".to_string()))
                .map(convert)
                .transpose()?;
            let bwd = map
                .get(Value::String("bwd".to_string()))
                .map(convert)
                .transpose()?;
            Ok(DirectionalCounter { default, fwd, bwd })
        }
        scalar => Ok(DirectionalCounter {
            default: Some(convert(scalar)?),
            fwd: None,
            bwd: None,
        }),
    }
}

/// Builds a [`Policy`] from a raw `serde_yaml::Mapping` (one entry of a
/// profile's `single-policies` list, or one step of an interaction),
/// after include-expansion has already run.
pub fn from_mapping(name: &str, map: &Mapping) -> Result<Policy> {
    let kind = match map.get(Value::String("type".to_string())) {
        Some(Value::String(s)) => kind_from_str(s, name)?,
        _ => PolicyKind::OneOff,
    };

    let is_bidirectional = map
        .get(Value::String("bidirectional".to_string()))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let other_host = map
        .get(Value::String("other-host".to_string()))
        .and_then(Value::as_str)
        .map(|s| OtherHost { name: s.to_string() });

    let mut stats = Stats::default();
    if let Some(Value::Mapping(stats_map)) = map.get(Value::String("stats".to_string())) {
        if let Some(Value::String(rate)) = stats_map.get(Value::String("rate".to_string())) {
            stats.rate = Some(Rate::parse(rate)?);
        }
        if let Some(Value::String(size)) = stats_map.get(Value::String("packet-size".to_string())) {
            stats.packet_size = Some(PacketSize::parse(size)?);
        }
        stats.packet_count = counter_from_value(
            stats_map.get(Value::String("packet-count".to_string())),
            name,
            "packet-count",
            false,
        )?;
        stats.duration_micros = counter_from_value(
            stats_map.get(Value::String("duration".to_string())),
            name,
            "duration",
            true,
        )?;
    }

    let mut clauses = Vec::new();
    for (key, value) in map {
        let Value::String(protocol_name) = key else {
            continue;
        };
        if matches!(
            protocol_name.as_str(),
            "type" | "bidirectional" | "other-host" | "stats" | "name"
        ) {
            continue;
        }
        let Value::Mapping(clause_data) = value else {
            continue;
        };
        clauses.push(ProtocolClause {
            name: protocol_name.clone(),
            data: clause_data.clone(),
        });
    }

    Ok(Policy {
        name: name.to_string(),
        kind,
        clauses,
        stats,
        is_bidirectional,
        other_host,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping_from_yaml(yaml: &str) -> Mapping {
        match serde_yaml::from_str(yaml).unwrap() {
            Value::Mapping(m) => m,
            _ => panic!("expected mapping"),
        }
    }

    #[test]
    fn parses_basic_policy_with_stats() {
        let map = mapping_from_yaml(
            "type: transient\nstats:\n  rate: 5/second\n  packet-size: \"< 100\"\nipv4:\n  dst: self\n",
        );
        let policy = from_mapping("p1", &map).unwrap();
        assert!(policy.is_transient());
        assert_eq!(policy.stats.rate.unwrap().value, 5);
        assert_eq!(policy.clauses.len(), 1);
        assert_eq!(policy.clauses[0].name, "ipv4");
    }

    #[test]
    fn rejects_unknown_kind() {
        let map = mapping_from_yaml("type: bogus\n");
        assert!(from_mapping("p1", &map).is_err());
    }

    #[test]
    fn directional_packet_count_reads_per_side_slots() {
        let map = mapping_from_yaml("stats:\n  packet-count:\n    fwd: 3\n    bwd: 1\n");
        let policy = from_mapping("p1", &map).unwrap();
        assert_eq!(policy.stats.packet_count.fwd, Some(3));
        assert_eq!(policy.stats.packet_count.bwd, Some(1));
    }
}

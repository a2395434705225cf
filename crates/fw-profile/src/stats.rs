//! Statistics literals: rate, packet-size range, and the per-direction
//! packet-count/duration counters. Parsing rules and the merge tie-break
//! for rate/size are pinned down in SPEC_FULL.md §3/§4.3, sourced from
//! `original_source/src/translator/{Policy.py,NFQueue.py}`.

use crate::error::{ProfileError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl RateUnit {
    fn seconds(self) -> f64 {
        match self {
            RateUnit::Second => 1.0,
            RateUnit::Minute => 60.0,
            RateUnit::Hour => 3_600.0,
            RateUnit::Day => 86_400.0,
            RateUnit::Week => 604_800.0,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "second" => Some(RateUnit::Second),
            "minute" => Some(RateUnit::Minute),
            "hour" => Some(RateUnit::Hour),
            "day" => Some(RateUnit::Day),
            "week" => Some(RateUnit::Week),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BurstUnit {
    Packets,
    Bytes,
}

impl BurstUnit {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "packets" => Some(BurstUnit::Packets),
            "bytes" => Some(BurstUnit::Bytes),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Burst {
    pub value: u64,
    pub unit: BurstUnit,
}

/// A rate literal such as `5/minute burst 3 packets`, or the literal `0`
/// meaning unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub value: u64,
    pub unit: RateUnit,
    pub burst: Option<Burst>,
}

fn rate_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?P<value>\d+)/(?P<unit>second|minute|hour|day|week)(?:\s+burst\s+(?P<burst_value>\d+)\s+(?P<burst_unit>packets|bytes))?\s*$",
        )
        .expect("static regex")
    })
}

impl Rate {
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed == "0" {
            return Ok(Rate {
                value: 0,
                unit: RateUnit::Second,
                burst: None,
            });
        }
        let caps = rate_regex()
            .captures(trimmed)
            .ok_or_else(|| ProfileError::BadRate(s.to_string()))?;
        let value: u64 = caps["value"]
            .parse()
            .map_err(|_| ProfileError::BadRate(s.to_string()))?;
        let unit =
            RateUnit::parse(&caps["unit"]).ok_or_else(|| ProfileError::BadRate(s.to_string()))?;
        let burst = match (caps.name("burst_value"), caps.name("burst_unit")) {
            (Some(v), Some(u)) => Some(Burst {
                value: v
                    .as_str()
                    .parse()
                    .map_err(|_| ProfileError::BadRate(s.to_string()))?,
                unit: BurstUnit::parse(u.as_str())
                    .ok_or_else(|| ProfileError::BadRate(s.to_string()))?,
            }),
            _ => None,
        };
        Ok(Rate { value, unit, burst })
    }

    pub fn is_unlimited(&self) -> bool {
        self.value == 0
    }

    /// Rate normalized to packets/second.
    pub fn per_second(&self) -> f64 {
        if self.is_unlimited() {
            0.0
        } else {
            self.value as f64 / self.unit.seconds()
        }
    }

    /// Merges two rates as the compiler aggregates a queue's statistics
    /// (spec §4.3 step 4 / §9 open question #1): unlimited absorbs
    /// anything; otherwise rates sum (packets/second, floored); bursts
    /// sum when both present and their units agree, otherwise the older
    /// (`self`) burst is kept unchanged. See DESIGN.md for the rationale.
    pub fn merge(&self, other: &Rate) -> Rate {
        if self.is_unlimited() || other.is_unlimited() {
            return Rate {
                value: 0,
                unit: RateUnit::Second,
                burst: None,
            };
        }
        let summed = (self.per_second() + other.per_second()).floor() as u64;
        let burst = match (self.burst, other.burst) {
            (Some(a), Some(b)) if a.unit == b.unit => Some(Burst {
                value: a.value + b.value,
                unit: a.unit,
            }),
            (Some(a), Some(_)) => Some(a),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        Rate {
            value: summed,
            unit: RateUnit::Second,
            burst,
        }
    }
}

/// A packet-size range, inclusive. `lower == 0` renders as `< upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketSize {
    pub lower: u32,
    pub upper: u32,
}

fn size_regex_upper_only() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*<\s*(?P<upper>\d+)\s*$").expect("static regex"))
}

fn size_regex_range() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?P<lower>\d+)\s*-\s*(?P<upper>\d+)\s*$").expect("static regex")
    })
}

impl PacketSize {
    pub fn parse(s: &str) -> Result<Self> {
        if let Some(caps) = size_regex_upper_only().captures(s) {
            let upper = caps["upper"]
                .parse()
                .map_err(|_| ProfileError::BadPacketSize(s.to_string()))?;
            return Ok(PacketSize { lower: 0, upper });
        }
        if let Some(caps) = size_regex_range().captures(s) {
            let lower = caps["lower"]
                .parse()
                .map_err(|_| ProfileError::BadPacketSize(s.to_string()))?;
            let upper = caps["upper"]
                .parse()
                .map_err(|_| ProfileError::BadPacketSize(s.to_string()))?;
            return Ok(PacketSize { lower, upper });
        }
        Err(ProfileError::BadPacketSize(s.to_string()))
    }

    /// Pure range union (spec §3 invariant, §4.3 step 4).
    pub fn merge(&self, other: &PacketSize) -> PacketSize {
        PacketSize {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    pub fn contains(&self, wire_len: u32) -> bool {
        wire_len >= self.lower && wire_len <= self.upper
    }
}

/// A per-direction counter value (packet-count or duration), as found in
/// a policy's `stats` block. `default` applies regardless of direction;
/// `fwd`/`bwd` apply to one direction of a bidirectional policy pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectionalCounter {
    pub default: Option<u64>,
    pub fwd: Option<u64>,
    pub bwd: Option<u64>,
}

impl DirectionalCounter {
    /// A policy is "base" for this counter if a `default` is declared and
    /// the policy is forward, or if the direction-specific slot
    /// (`fwd`/`bwd`) matching the policy's own direction is declared.
    pub fn is_base_for(&self, is_backward: bool) -> bool {
        (self.default.is_some() && !is_backward)
            || (if is_backward {
                self.bwd.is_some()
            } else {
                self.fwd.is_some()
            })
    }

    /// A policy is "backward" for this counter if only `default` is
    /// declared and the policy itself is the backward leg.
    pub fn is_backward_for(&self, is_backward: bool) -> bool {
        self.default.is_some() && is_backward
    }

    /// The bound that applies when this policy is evaluated, choosing the
    /// direction-specific slot over `default`.
    pub fn bound_for(&self, is_backward: bool) -> Option<u64> {
        if is_backward {
            self.bwd.or(self.default)
        } else {
            self.fwd.or(self.default)
        }
    }
}

/// Parses a duration literal (`<integer> <unit>`) to whole microseconds,
/// rounding fractional results up. Unit omitted defaults to seconds.
pub fn parse_duration_micros(s: &str) -> Result<u64> {
    let s = s.trim();
    let (number_part, unit_part) = match s.split_once(' ') {
        Some((n, u)) => (n.trim(), u.trim()),
        None => (s, "seconds"),
    };
    let value: f64 = number_part
        .parse()
        .map_err(|_| ProfileError::BadDuration(s.to_string()))?;
    let multiplier = match unit_part {
        "s" | "sec" | "secs" | "second" | "seconds" => 1_000_000.0,
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 1_000.0,
        "us" | "usec" | "usecs" | "microsecond" | "microseconds" => 1.0,
        other => return Err(ProfileError::BadDuration(format!("{s} (unit {other:?})"))),
    };
    Ok((value * multiplier).ceil() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rate_without_burst() {
        let r = Rate::parse("5/minute").unwrap();
        assert_eq!(r.value, 5);
        assert_eq!(r.unit, RateUnit::Minute);
        assert!(r.burst.is_none());
        assert!((r.per_second() - 5.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn parses_rate_with_burst() {
        let r = Rate::parse("1/second burst 1 packets").unwrap();
        assert_eq!(r.burst, Some(Burst { value: 1, unit: BurstUnit::Packets }));
    }

    #[test]
    fn zero_rate_is_unlimited() {
        assert!(Rate::parse("0").unwrap().is_unlimited());
    }

    #[test]
    fn merge_sums_when_burst_units_agree() {
        let a = Rate::parse("1/second burst 2 packets").unwrap();
        let b = Rate::parse("2/second burst 3 packets").unwrap();
        let merged = a.merge(&b);
        assert_eq!(merged.value, 3);
        assert_eq!(merged.burst, Some(Burst { value: 5, unit: BurstUnit::Packets }));
    }

    #[test]
    fn merge_keeps_first_burst_when_units_disagree() {
        let a = Rate::parse("1/second burst 2 packets").unwrap();
        let b = Rate::parse("2/second burst 100 bytes").unwrap();
        let merged = a.merge(&b);
        assert_eq!(merged.burst, Some(Burst { value: 2, unit: BurstUnit::Packets }));
    }

    #[test]
    fn merge_with_unlimited_is_unlimited() {
        let a = Rate::parse("0").unwrap();
        let b = Rate::parse("5/second").unwrap();
        assert!(a.merge(&b).is_unlimited());
        assert!(b.merge(&a).is_unlimited());
    }

    #[test]
    fn size_parses_both_forms() {
        assert_eq!(PacketSize::parse("< 100").unwrap(), PacketSize { lower: 0, upper: 100 });
        assert_eq!(PacketSize::parse("10 - 200").unwrap(), PacketSize { lower: 10, upper: 200 });
    }

    #[test]
    fn size_merge_is_union() {
        let a = PacketSize { lower: 10, upper: 100 };
        let b = PacketSize { lower: 0, upper: 50 };
        assert_eq!(a.merge(&b), PacketSize { lower: 0, upper: 100 });
    }

    #[test]
    fn duration_parses_units_and_rounds_up() {
        assert_eq!(parse_duration_micros("2 seconds").unwrap(), 2_000_000);
        assert_eq!(parse_duration_micros("1.5 ms").unwrap(), 1_500);
        assert_eq!(parse_duration_micros("10").unwrap(), 10_000_000);
        assert_eq!(parse_duration_micros("0.0001 seconds").unwrap(), 100);
    }

    #[test]
    fn counter_base_and_backward_detection() {
        let default_only = DirectionalCounter { default: Some(3), fwd: None, bwd: None };
        assert!(default_only.is_base_for(false));
        assert!(!default_only.is_base_for(true));
        assert!(default_only.is_backward_for(true));

        let fwd_bwd = DirectionalCounter { default: None, fwd: Some(3), bwd: Some(1) };
        assert!(fwd_bwd.is_base_for(false));
        assert!(fwd_bwd.is_base_for(true));
        assert!(!fwd_bwd.is_backward_for(true));
    }
}

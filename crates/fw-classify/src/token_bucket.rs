//! Token-bucket rate limiting (spec §4.4). A transient policy's rate is
//! a per-packet admission gate, not a windowed cap (§9 open question,
//! resolved in SPEC_FULL.md §4.4): every arriving packet either finds a
//! token and is admitted, or doesn't and is dropped — there is no
//! separate notion of "the rate window has expired, reset the count".

use fw_profile::stats::{BurstUnit, Rate};
use std::time::Instant;

#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
    /// Whether the bucket measures packets or bytes; an unlimited rate
    /// (`refill_per_sec == 0` is never constructed — see
    /// [`TokenBucket::unlimited`]) always admits without consuming.
    unit: BurstUnit,
}

impl TokenBucket {
    /// Builds a bucket from a profile rate literal. The burst value (if
    /// present) is the bucket's capacity; with no explicit burst, the
    /// capacity defaults to one unit of the rate itself (a bucket that
    /// can hold exactly one second's worth of allowance).
    pub fn from_rate(rate: &Rate) -> Option<Self> {
        if rate.is_unlimited() {
            return None;
        }
        let refill_per_sec = rate.per_second();
        let (capacity, unit) = match rate.burst {
            Some(burst) => (burst.value as f64, burst.unit),
            None => (refill_per_sec.max(1.0), BurstUnit::Packets),
        };
        Some(TokenBucket {
            capacity,
            tokens: capacity,
            refill_per_sec,
            last_refill: Instant::now(),
            unit,
        })
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Attempts to admit a packet of the given wire length. Returns
    /// whether the packet is admitted; on admission, the matching
    /// number of tokens (1 for a packet-denominated bucket, `wire_len`
    /// for a byte-denominated one) is consumed.
    pub fn try_admit(&mut self, wire_len: u32) -> bool {
        self.refill();
        let cost = match self.unit {
            BurstUnit::Packets => 1.0,
            BurstUnit::Bytes => wire_len as f64,
        };
        if self.tokens >= cost {
            self.tokens -= cost;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fw_profile::stats::Rate;

    #[test]
    fn unlimited_rate_builds_no_bucket() {
        let rate = Rate::parse("0").unwrap();
        assert!(TokenBucket::from_rate(&rate).is_none());
    }

    #[test]
    fn admits_up_to_burst_then_rejects() {
        let rate = Rate::parse("1/second burst 2 packets").unwrap();
        let mut bucket = TokenBucket::from_rate(&rate).unwrap();
        assert!(bucket.try_admit(100));
        assert!(bucket.try_admit(100));
        assert!(!bucket.try_admit(100));
    }

    #[test]
    fn default_capacity_without_explicit_burst_is_one_second_of_rate() {
        let rate = Rate::parse("3/second").unwrap();
        let mut bucket = TokenBucket::from_rate(&rate).unwrap();
        for _ in 0..3 {
            assert!(bucket.try_admit(64));
        }
        assert!(!bucket.try_admit(64));
    }
}

//! Tracks which IP addresses a domain name currently resolves to, so a
//! `StatefulPredicate::IpAddrDomain` can be checked against live
//! traffic. Populated by observing DNS/mDNS responses pass through
//! their own queue; pruned both by TTL expiry and by the global entry
//! cap (`fw_common::DNS_MAP_MAX_ENTRIES`).

use fw_common::DNS_MAP_MAX_ENTRIES;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

struct Binding {
    addr: IpAddr,
    expires_at: Instant,
    inserted_at: Instant,
}

#[derive(Default)]
pub struct DnsMap {
    entries: HashMap<String, Vec<Binding>>,
}

impl DnsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `domain` resolved to `addr` for `ttl`. Expired
    /// bindings for the same domain are dropped opportunistically on
    /// insert.
    pub fn record(&mut self, domain: &str, addr: IpAddr, ttl: Duration) {
        let now = Instant::now();
        let bindings = self.entries.entry(domain.to_string()).or_default();
        bindings.retain(|b| b.expires_at > now);
        bindings.push(Binding {
            addr,
            expires_at: now + ttl,
            inserted_at: now,
        });
        self.prune_if_over_capacity();
    }

    /// Whether `addr` is currently a live binding for `domain` (exact
    /// match) or, when `suffix` is true, for any domain ending in it.
    pub fn resolves(&self, domain_name: &str, suffix: bool, addr: IpAddr) -> bool {
        let now = Instant::now();
        self.entries.iter().any(|(name, bindings)| {
            let name_matches = if suffix {
                name.ends_with(domain_name)
            } else {
                name == domain_name
            };
            name_matches
                && bindings
                    .iter()
                    .any(|b| b.expires_at > now && b.addr == addr)
        })
    }

    fn total_entries(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Evicts the globally oldest bindings until the map is back under
    /// `DNS_MAP_MAX_ENTRIES`, after TTL pruning has already run once.
    fn prune_if_over_capacity(&mut self) {
        if self.total_entries() <= DNS_MAP_MAX_ENTRIES {
            return;
        }
        loop {
            let oldest = self
                .entries
                .iter()
                .flat_map(|(name, bindings)| {
                    bindings
                        .iter()
                        .enumerate()
                        .map(move |(i, b)| (b.inserted_at, name.clone(), i))
                })
                .min_by_key(|(inserted_at, _, _)| *inserted_at);
            let Some((_, name, idx)) = oldest else { break };
            if let Some(bindings) = self.entries.get_mut(&name) {
                bindings.remove(idx);
                if bindings.is_empty() {
                    self.entries.remove(&name);
                }
            }
            if self.total_entries() <= DNS_MAP_MAX_ENTRIES {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn records_and_resolves_exact_domain() {
        let mut map = DnsMap::new();
        let addr = IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8));
        map.record("example.com", addr, Duration::from_secs(60));
        assert!(map.resolves("example.com", false, addr));
        assert!(!map.resolves("other.com", false, addr));
    }

    #[test]
    fn suffix_lookup_matches_subdomains() {
        let mut map = DnsMap::new();
        let addr = IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4));
        map.record("api.example.org", addr, Duration::from_secs(60));
        assert!(map.resolves(".example.org", true, addr));
    }

    #[test]
    fn expired_binding_no_longer_resolves() {
        let mut map = DnsMap::new();
        let addr = IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1));
        map.record("example.com", addr, Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(!map.resolves("example.com", false, addr));
    }
}

use serde::{Deserialize, Serialize};

/// Network-wide address aliases a profile can reference (`local`,
/// `external`, `gateway`, `broadcast`). Not part of the original closed
/// per-household constant tables in `original_source/src/translator/
/// protocols/ip.py` — those were hardcoded for one test LAN. Making them
/// a small sibling block next to `device-info` is this implementation's
/// answer to "how does a generic build learn its own LAN's boundaries"
/// (see DESIGN.md).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// LAN CIDR, e.g. `192.168.0.0/16`. Backs both the `local` alias and
    /// the `external` alias (`external` is its nftables negation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lan_v4: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lan_v6: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_mac: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_v4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_v6: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast_v4: Option<String>,
}

impl NetworkInfo {
    pub fn broadcast_v4(&self) -> &str {
        self.broadcast_v4.as_deref().unwrap_or("255.255.255.255")
    }
}

/// Well-known multicast groups, fixed regardless of LAN (spec §4.2:
/// "well-known multicast groups (mDNS, SSDP, CoAP, IGMP all-hosts)").
pub mod multicast {
    pub const MDNS_V4: &str = "224.0.0.251";
    pub const MDNS_V6: &str = "ff02::fb";
    pub const SSDP_V4: &str = "239.255.255.250";
    pub const COAP_V4: &str = "224.0.1.187";
    pub const COAP_V6: &str = "ff02::158";
    pub const IGMP_ALL_HOSTS_V4: &str = "224.0.0.1";
    pub const IGMPV3_ALL_ROUTERS_V4: &str = "224.0.0.22";
    pub const ICMPV6_ALL_NODES: &str = "ff02::1";
    pub const ICMPV6_ALL_ROUTERS: &str = "ff02::2";
    pub const ICMPV6_ALL_MLDV2_ROUTERS: &str = "ff02::16";

    pub fn by_name_v4(name: &str) -> Option<&'static str> {
        match name {
            "all" => Some(IGMP_ALL_HOSTS_V4),
            "mdns" => Some(MDNS_V4),
            "ssdp" => Some(SSDP_V4),
            "coap" => Some(COAP_V4),
            _ => None,
        }
    }

    pub fn by_name_v6(name: &str) -> Option<&'static str> {
        match name {
            "all-nodes" => Some(ICMPV6_ALL_NODES),
            "all-routers" => Some(ICMPV6_ALL_ROUTERS),
            "all-mldv2-routers" => Some(ICMPV6_ALL_MLDV2_ROUTERS),
            "mdns" => Some(MDNS_V6),
            "coap" => Some(COAP_V6),
            _ => None,
        }
    }
}

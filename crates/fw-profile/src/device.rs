use serde::{Deserialize, Serialize};

/// `device-info` block: the profiled device's own identity, referenced
/// implicitly by the token `self` anywhere an address appears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub mac: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
}

impl DeviceInfo {
    /// Resolves `self` in the context of the given protocol family
    /// (`"arp"` and `"mac"` both mean the MAC address; `"ipv4"`/`"ipv6"`
    /// mean the respective IP literal).
    pub fn self_address(&self, protocol: &str) -> Option<&str> {
        match protocol {
            "arp" | "mac" => Some(self.mac.as_str()),
            "ipv4" => self.ipv4.as_deref(),
            "ipv6" => self.ipv6.as_deref(),
            _ => None,
        }
    }
}

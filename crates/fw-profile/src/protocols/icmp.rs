//! ICMP (spec §6: `type`), grounded on
//! `original_source/src/translator/protocols/icmp.py`. Only the
//! request/reply pairs (echo, timestamp) have a meaningful backward
//! flip; other types (destination-unreachable, time-exceeded, ...) are
//! passed through unchanged.

use super::{field_string, ParseContext, ParsedClause, StatelessMatch};
use crate::error::Result;
use serde_yaml::Mapping;

fn flip_icmp_type(icmp_type: &str) -> String {
    match icmp_type {
        "echo-request" => "echo-reply".to_string(),
        "echo-reply" => "echo-request".to_string(),
        "timestamp-request" => "timestamp-reply".to_string(),
        "timestamp-reply" => "timestamp-request".to_string(),
        "info-request" => "info-reply".to_string(),
        "info-reply" => "info-request".to_string(),
        other => other.to_string(),
    }
}

pub(super) fn parse(data: &Mapping, ctx: &ParseContext<'_>) -> Result<ParsedClause> {
    let mut out = ParsedClause::default();

    if let Some(icmp_type) = field_string(data, "type") {
        let value = if ctx.is_backward {
            flip_icmp_type(&icmp_type)
        } else {
            icmp_type
        };
        out.stateless.push(StatelessMatch::new("icmp type {}", value));
    }

    if let Some(code) = field_string(data, "code") {
        out.stateless.push(StatelessMatch::new("icmp code {}", code));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceInfo;
    use crate::network::NetworkInfo;
    use serde_yaml::Value;

    #[test]
    fn echo_request_flips_to_reply_on_backward() {
        let device = DeviceInfo {
            name: "d".into(),
            mac: "aa:bb:cc:dd:ee:ff".into(),
            ipv4: None,
            ipv6: None,
        };
        let network = NetworkInfo::default();
        let ctx = ParseContext {
            device: &device,
            network: &network,
            is_backward: true,
            initiator: None,
        };
        let mut data = Mapping::new();
        data.insert(Value::String("type".into()), Value::String("echo-request".into()));
        let parsed = parse(&data, &ctx).unwrap();
        assert!(parsed.stateless.iter().any(|m| m.rendered == "icmp type echo-reply"));
    }

    #[test]
    fn unreachable_is_unaffected_by_direction() {
        let device = DeviceInfo {
            name: "d".into(),
            mac: "aa:bb:cc:dd:ee:ff".into(),
            ipv4: None,
            ipv6: None,
        };
        let network = NetworkInfo::default();
        let ctx = ParseContext {
            device: &device,
            network: &network,
            is_backward: true,
            initiator: None,
        };
        let mut data = Mapping::new();
        data.insert(
            Value::String("type".into()),
            Value::String("destination-unreachable".into()),
        );
        let parsed = parse(&data, &ctx).unwrap();
        assert!(parsed
            .stateless
            .iter()
            .any(|m| m.rendered == "icmp type destination-unreachable"));
    }
}

//! HTTP (spec §6: `method`, `uri`, `request`), grounded on
//! `original_source/src/translator/protocols/http.py`. Like DNS, the
//! request/response orientation always flips on a backward clause.

use super::{field_string, ParseContext, ParsedClause, StatefulPredicate, UriMatch};
use crate::error::Result;
use serde_yaml::Mapping;

pub(super) fn parse(data: &Mapping, ctx: &ParseContext<'_>) -> Result<ParsedClause> {
    let mut out = ParsedClause::default();

    if let Some(request) = super::field_bool(data, "request") {
        let is_request = if ctx.is_backward { !request } else { request };
        out.stateful.push(StatefulPredicate::HttpIsRequest(is_request));
    }

    if let Some(method) = field_string(data, "method") {
        out.stateful.push(StatefulPredicate::HttpMethod(method));
    }

    if let Some(uri) = field_string(data, "uri") {
        out.stateful.push(StatefulPredicate::HttpUri(UriMatch::parse(&uri)));
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
    fn request_flips_on_backward() {
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
        data.insert(Value::String("request".into()), Value::Bool(true));
        let parsed = parse(&data, &ctx).unwrap();
        assert_eq!(parsed.stateful[0], StatefulPredicate::HttpIsRequest(false));
    }

    #[test]
    fn uri_with_trailing_marker_is_prefix() {
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
            is_backward: false,
            initiator: None,
        };
        let mut data = Mapping::new();
        data.insert(Value::String("uri".into()), Value::String("/api/*".into()));
        let parsed = parse(&data, &ctx).unwrap();
        match &parsed.stateful[0] {
            StatefulPredicate::HttpUri(m) => assert!(m.prefix),
            _ => panic!("expected HttpUri"),
        }
    }
}

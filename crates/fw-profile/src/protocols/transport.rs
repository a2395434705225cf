//! TCP/UDP (spec §6: `sport`, `dport`), grounded on
//! `original_source/src/translator/protocols/Transport.py`, the shared
//! base both `tcp.py` and `udp.py` subclass. Ports are always stateless:
//! they never depend on a resolved domain or interaction state.

use super::{field_string, Direction, ParseContext, ParsedClause, StatelessMatch};
use crate::error::{ProfileError, Result};
use serde_yaml::Mapping;

fn side_keyword(dir: Direction, is_backward: bool) -> &'static str {
    let dir = if is_backward { dir.other() } else { dir };
    match dir {
        Direction::Src => "sport",
        Direction::Dst => "dport",
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    raw.parse::<u16>()
        .map_err(|_| ProfileError::UnknownAddress(format!("invalid port literal: {raw}")))
}

pub(super) fn parse(data: &Mapping, ctx: &ParseContext<'_>, l4: &str) -> Result<ParsedClause> {
    let mut out = ParsedClause::default();

    if let Some(sport) = field_string(data, "sport") {
        parse_port(&sport)?;
        let keyword = side_keyword(Direction::Src, ctx.is_backward);
        out.stateless
            .push(StatelessMatch::new(format!("{l4} {keyword} {{}}"), sport));
    }

    if let Some(dport) = field_string(data, "dport") {
        parse_port(&dport)?;
        let keyword = side_keyword(Direction::Dst, ctx.is_backward);
        out.stateless
            .push(StatelessMatch::new(format!("{l4} {keyword} {{}}"), dport));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceInfo;
    use crate::network::NetworkInfo;
    use serde_yaml::Value;

    fn ctx(device: &DeviceInfo, network: &NetworkInfo, backward: bool) -> ParseContext<'_> {
        ParseContext {
            device,
            network,
            is_backward: backward,
            initiator: None,
        }
    }

    #[test]
    fn dport_swaps_to_sport_on_backward() {
        let device = DeviceInfo {
            name: "d".into(),
            mac: "aa:bb:cc:dd:ee:ff".into(),
            ipv4: None,
            ipv6: None,
        };
        let network = NetworkInfo::default();
        let mut data = Mapping::new();
        data.insert(Value::String("dport".into()), Value::String("443".into()));
        let forward = parse(&data, &ctx(&device, &network, false), "tcp").unwrap();
        assert_eq!(forward.stateless[0].rendered, "tcp dport 443");
        let backward = parse(&data, &ctx(&device, &network, true), "tcp").unwrap();
        assert_eq!(backward.stateless[0].rendered, "tcp sport 443");
    }

    #[test]
    fn rejects_non_numeric_port() {
        let device = DeviceInfo {
            name: "d".into(),
            mac: "aa:bb:cc:dd:ee:ff".into(),
            ipv4: None,
            ipv6: None,
        };
        let network = NetworkInfo::default();
        let mut data = Mapping::new();
        data.insert(Value::String("dport".into()), Value::String("https".into()));
        assert!(parse(&data, &ctx(&device, &network, false), "tcp").is_err());
    }
}

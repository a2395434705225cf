//! IPv4/IPv6 (spec §6: `src`, `dst`), grounded on
//! `original_source/src/translator/protocols/ip.py`. Shared between the
//! two address families; the only difference is which `DeviceInfo`
//! field backs `self` and which nftables family keyword is emitted.

use super::{field_string, Direction, ParseContext, ParsedClause, StatefulPredicate};
use crate::device::DeviceInfo;
use crate::error::{ProfileError, Result};
use crate::network::{multicast, NetworkInfo};
use serde_yaml::Mapping;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V4,
    V6,
}

impl Version {
    fn nft_family(self) -> &'static str {
        match self {
            Version::V4 => "ip",
            Version::V6 => "ip6",
        }
    }

    fn self_address<'a>(self, device: &'a DeviceInfo) -> Option<&'a str> {
        match self {
            Version::V4 => device.ipv4.as_deref(),
            Version::V6 => device.ipv6.as_deref(),
        }
    }

    fn protocol_name(self) -> &'static str {
        match self {
            Version::V4 => "ipv4",
            Version::V6 => "ipv6",
        }
    }
}

/// An address literal resolves to one of these; a name that is none of
/// them is treated as a domain, handled statefully after DNS resolution.
enum Resolved {
    Literal(String),
    Unresolved,
}

fn resolve_alias(addr: &str, version: Version, network: &NetworkInfo) -> Resolved {
    match (addr, version) {
        ("local", Version::V4) => network
            .lan_v4
            .clone()
            .map(Resolved::Literal)
            .unwrap_or(Resolved::Unresolved),
        ("local", Version::V6) => network
            .lan_v6
            .first()
            .cloned()
            .map(Resolved::Literal)
            .unwrap_or(Resolved::Unresolved),
        ("gateway", Version::V4) => network
            .gateway_v4
            .clone()
            .map(Resolved::Literal)
            .unwrap_or(Resolved::Unresolved),
        ("gateway", Version::V6) => network
            .gateway_v6
            .clone()
            .map(Resolved::Literal)
            .unwrap_or(Resolved::Unresolved),
        ("broadcast", Version::V4) => Resolved::Literal(network.broadcast_v4().to_string()),
        (name, Version::V4) => multicast::by_name_v4(name)
            .map(|s| Resolved::Literal(s.to_string()))
            .unwrap_or(Resolved::Unresolved),
        (name, Version::V6) => multicast::by_name_v6(name)
            .map(|s| Resolved::Literal(s.to_string()))
            .unwrap_or(Resolved::Unresolved),
    }
}

/// `external` is the LAN's negation, not a literal; it needs its own
/// template (`!= <lan> `) rather than a plain equality.
fn is_external(addr: &str) -> bool {
    addr == "external"
}

fn looks_like_literal(addr: &str, version: Version) -> bool {
    match version {
        Version::V4 => addr.parse::<std::net::Ipv4Addr>().is_ok() || addr.contains('/'),
        Version::V6 => addr.parse::<std::net::Ipv6Addr>().is_ok() || addr.contains('/'),
    }
}

fn resolve_one(
    addr: &str,
    version: Version,
    ctx: &ParseContext<'_>,
) -> Result<Option<String>> {
    if addr == "self" {
        return version
            .self_address(ctx.device)
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| ProfileError::MissingSelfAddress {
                protocol: version.protocol_name().to_string(),
            });
    }
    if looks_like_literal(addr, version) {
        return Ok(Some(addr.to_string()));
    }
    match resolve_alias(addr, version, ctx.network) {
        Resolved::Literal(v) => Ok(Some(v)),
        Resolved::Unresolved => Ok(None),
    }
}

fn side_keyword(version: Version, dir: Direction, is_backward: bool) -> &'static str {
    let dir = if is_backward { dir.other() } else { dir };
    match (version, dir) {
        (_, Direction::Src) => "saddr",
        (_, Direction::Dst) => "daddr",
    }
}

fn push_address_match(
    out: &mut ParsedClause,
    family: &str,
    side: &str,
    is_external_alias: bool,
    value: &str,
) {
    let template = if is_external_alias {
        format!("{family} {side} != {{}}")
    } else {
        format!("{family} {side} {{}}")
    };
    out.stateless
        .push(super::StatelessMatch::new(template, value));
}

fn parse_side(
    data: &Mapping,
    key: &str,
    dir: Direction,
    version: Version,
    ctx: &ParseContext<'_>,
    out: &mut ParsedClause,
) -> Result<()> {
    let Some(addr) = field_string(data, key) else {
        return Ok(());
    };
    let family = version.nft_family();
    let side = side_keyword(version, dir, ctx.is_backward);

    if is_external(&addr) {
        let lan = match version {
            Version::V4 => ctx.network.lan_v4.clone(),
            Version::V6 => ctx.network.lan_v6.first().cloned(),
        };
        let Some(lan) = lan else {
            return Err(ProfileError::UnknownAddress(addr));
        };
        push_address_match(out, family, side, true, &lan);
        return Ok(());
    }

    match resolve_one(&addr, version, ctx)? {
        Some(literal) => {
            push_address_match(out, family, side, false, &literal);
            Ok(())
        }
        None => {
            let domain = crate::protocols::DomainName::parse(&addr)?;
            let effective_dir = if ctx.is_backward { dir.other() } else { dir };
            out.stateful.push(StatefulPredicate::IpAddrDomain {
                dir: effective_dir,
                domain,
            });
            Ok(())
        }
    }
}

pub(super) fn parse(data: &Mapping, ctx: &ParseContext<'_>, version: Version) -> Result<ParsedClause> {
    let mut out = ParsedClause::default();
    parse_side(data, "src", Direction::Src, version, ctx, &mut out)?;
    parse_side(data, "dst", Direction::Dst, version, ctx, &mut out)?;
    Ok(out)
}

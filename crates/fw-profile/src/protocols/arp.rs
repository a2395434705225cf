//! ARP (spec §6: `type`, `sha`, `tha`, `spa`, `tpa`), grounded on
//! `original_source/src/translator/protocols/arp.py`.

use super::{field_string, ParseContext, ParsedClause, StatelessMatch};
use crate::error::{ProfileError, Result};
use serde_yaml::Mapping;

fn explicit_mac(addr: &str, ctx: &ParseContext<'_>) -> Result<String> {
    if addr == "self" {
        return Ok(ctx.device.mac.clone());
    }
    Ok(addr.to_string())
}

fn explicit_ipv4(addr: &str, ctx: &ParseContext<'_>) -> Result<String> {
    if addr == "self" {
        return ctx
            .device
            .ipv4
            .clone()
            .ok_or_else(|| ProfileError::MissingSelfAddress {
                protocol: "arp".to_string(),
            });
    }
    Ok(addr.to_string())
}

fn flip_arp_type(arp_type: &str) -> String {
    match arp_type {
        "request" => "reply".to_string(),
        "reply" => "request".to_string(),
        other => other.to_string(),
    }
}

pub(super) fn parse(data: &Mapping, ctx: &ParseContext<'_>) -> Result<ParsedClause> {
    let mut out = ParsedClause::default();

    if let Some(arp_type) = field_string(data, "type") {
        let value = if ctx.is_backward {
            flip_arp_type(&arp_type)
        } else {
            arp_type
        };
        out.stateless
            .push(StatelessMatch::new("arp operation {}", value));
    }

    if let Some(sha) = field_string(data, "sha") {
        let (template, value) = if ctx.is_backward {
            ("arp daddr ether {}", explicit_mac(&sha, ctx)?)
        } else {
            ("arp saddr ether {}", explicit_mac(&sha, ctx)?)
        };
        out.stateless.push(StatelessMatch::new(template, value));
    }

    if let Some(tha) = field_string(data, "tha") {
        let (template, value) = if ctx.is_backward {
            ("arp saddr ether {}", explicit_mac(&tha, ctx)?)
        } else {
            ("arp daddr ether {}", explicit_mac(&tha, ctx)?)
        };
        out.stateless.push(StatelessMatch::new(template, value));
    }

    if let Some(spa) = field_string(data, "spa") {
        let (template, value) = if ctx.is_backward {
            ("arp daddr ip {}", explicit_ipv4(&spa, ctx)?)
        } else {
            ("arp saddr ip {}", explicit_ipv4(&spa, ctx)?)
        };
        out.stateless.push(StatelessMatch::new(template, value));
    }

    if let Some(tpa) = field_string(data, "tpa") {
        let (template, value) = if ctx.is_backward {
            ("arp saddr ip {}", explicit_ipv4(&tpa, ctx)?)
        } else {
            ("arp daddr ip {}", explicit_ipv4(&tpa, ctx)?)
        };
        out.stateless.push(StatelessMatch::new(template, value));
    }

    Ok(out)
}

//! DHCP (spec §6: `type`, `client-mac`), grounded on
//! `original_source/src/translator/protocols/dhcp.py`. `client-mac`
//! resolves `self` the same way ARP's `sha`/`tha` do, since a DHCP
//! client always identifies itself by link-layer address rather than
//! by an IP it doesn't have yet.

use super::{field_string, ParseContext, ParsedClause, StatefulPredicate};
use crate::error::Result;
use serde_yaml::Mapping;

pub(super) fn parse(data: &Mapping, ctx: &ParseContext<'_>) -> Result<ParsedClause> {
    let mut out = ParsedClause::default();

    if let Some(message_type) = field_string(data, "type") {
        out.stateful.push(StatefulPredicate::DhcpMessageType(message_type));
    }

    if let Some(client_mac) = field_string(data, "client-mac") {
        let resolved = if client_mac == "self" {
            ctx.device.mac.clone()
        } else {
            client_mac
        };
        out.stateful.push(StatefulPredicate::DhcpClientMac(resolved));
    }

    Ok(out)
}

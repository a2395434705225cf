//! CoAP (spec §6: `type`, `method`, `uri`), grounded on
//! `original_source/src/translator/protocols/coap.py`. Unlike HTTP,
//! CoAP's request/response orientation is carried by message `type`
//! (CON/NON/ACK/RST) rather than a single boolean, so there is no flip
//! table here — the type is matched as given.

use super::{field_string, ParseContext, ParsedClause, StatefulPredicate};
use crate::error::Result;
use serde_yaml::Mapping;

pub(super) fn parse(data: &Mapping, ctx: &ParseContext<'_>) -> Result<ParsedClause> {
    let mut out = ParsedClause::default();
    let _ = ctx;

    if let Some(coap_type) = field_string(data, "type") {
        out.stateful.push(StatefulPredicate::CoapType(coap_type));
    }

    if let Some(method) = field_string(data, "method") {
        out.stateful.push(StatefulPredicate::CoapMethod(method));
    }

    if let Some(uri) = field_string(data, "uri") {
        out.stateful.push(StatefulPredicate::CoapUri(uri));
    }

    Ok(out)
}

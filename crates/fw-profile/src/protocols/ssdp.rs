//! SSDP (spec §6: `method`, `request`), grounded on
//! `original_source/src/translator/protocols/ssdp.py`. Shares the same
//! request/response flip rule as HTTP and DNS.

use super::{field_string, ParseContext, ParsedClause, StatefulPredicate};
use crate::error::Result;
use serde_yaml::Mapping;

pub(super) fn parse(data: &Mapping, ctx: &ParseContext<'_>) -> Result<ParsedClause> {
    let mut out = ParsedClause::default();

    if let Some(request) = super::field_bool(data, "request") {
        let is_request = if ctx.is_backward { !request } else { request };
        out.stateful.push(StatefulPredicate::SsdpIsRequest(is_request));
    }

    if let Some(method) = field_string(data, "method") {
        out.stateful.push(StatefulPredicate::SsdpMethod(method));
    }

    Ok(out)
}

//! DNS and mDNS (spec §6: `qtype`, `qname`, `query`), grounded on
//! `original_source/src/translator/protocols/dns.py` and its mDNS
//! sibling, which share the same question-section fields. The QR bit
//! always flips between forward and backward regardless of which side
//! of the clause declared itself the query: a backward response is a
//! query and vice versa.

use super::{field_string, DomainName, ParseContext, ParsedClause, StatefulPredicate};
use crate::error::Result;
use serde_yaml::Mapping;

pub(super) fn parse(data: &Mapping, ctx: &ParseContext<'_>) -> Result<ParsedClause> {
    let mut out = ParsedClause::default();

    if let Some(query) = super::field_bool(data, "query") {
        let is_query = if ctx.is_backward { !query } else { query };
        out.stateful.push(StatefulPredicate::DnsQr { response: !is_query });
    }

    if let Some(qtype) = field_string(data, "qtype") {
        out.stateful.push(StatefulPredicate::DnsQtype(qtype));
    }

    if let Some(qname) = field_string(data, "qname") {
        let domain = DomainName::parse(&qname)?;
        out.stateful.push(StatefulPredicate::DnsQuestionName(domain));
    }

    Ok(out)
}

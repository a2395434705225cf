//! ICMPv6 (spec §6): no configurable clause fields, grounded on
//! `original_source/src/translator/protocols/icmpv6.py` — the profile
//! only ever uses this protocol to reach the fixed NDP/MLD multicast
//! groups already carried by an enclosing `ipv6` clause's `dst`. The
//! parser exists purely so `Protocol::Icmpv6` has a match arm; it emits
//! the bare `meta l4proto ipv6-icmp` gate and nothing direction-dependent.

use super::{ParseContext, ParsedClause, StatelessMatch};
use crate::error::Result;

pub(super) fn parse(_ctx: &ParseContext<'_>) -> Result<ParsedClause> {
    let mut out = ParsedClause::default();
    out.stateless
        .push(StatelessMatch::new("meta l4proto {}", "ipv6-icmp"));
    Ok(out)
}

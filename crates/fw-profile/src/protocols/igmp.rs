//! IGMP (spec §6: `type`, `group`), grounded on
//! `original_source/src/translator/protocols/igmp.py`. The message type
//! is matched statelessly (it is visible without deep parsing), but the
//! multicast group is resolved through `StatefulPredicate::IgmpGroup`
//! so a symbolic alias (`all`) can be resolved the same way address
//! aliases are.

use super::{field_string, ParseContext, ParsedClause, StatefulPredicate};
use crate::error::Result;
use crate::network::multicast;
use serde_yaml::Mapping;

pub(super) fn parse(data: &Mapping, ctx: &ParseContext<'_>) -> Result<ParsedClause> {
    let mut out = ParsedClause::default();

    if let Some(message_type) = field_string(data, "type") {
        out.stateful.push(StatefulPredicate::IgmpMessageType(message_type));
    }

    if let Some(group) = field_string(data, "group") {
        let resolved = multicast::by_name_v4(&group)
            .map(str::to_string)
            .unwrap_or(group);
        out.stateful.push(StatefulPredicate::IgmpGroup(resolved));
    }

    let _ = ctx;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceInfo;
    use crate::network::NetworkInfo;
    use serde_yaml::Value;

    #[test]
    fn resolves_well_known_group_alias() {
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
        data.insert(Value::String("type".into()), Value::String("membership-report".into()));
        data.insert(Value::String("group".into()), Value::String("all".into()));
        let parsed = parse(&data, &ctx).unwrap();
        assert!(parsed
            .stateful
            .contains(&StatefulPredicate::IgmpGroup("224.0.0.1".to_string())));
    }
}

//! nftables ruleset text emission, grounded on
//! `original_source/src/translator/NFQueue.py`'s rule-string assembly
//! and `translator.py`'s chain/table scaffolding.

use fw_common::log::LogType;
use fw_common::ACCEPT_DIRECT_QUEUE;

/// One compiled rule: a family/chain-qualified stateless match string
/// and its disposition (either a direct accept or a queue handoff), plus
/// the `interaction#policy` name a CSV log prefix identifies it by.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub stateless_matches: Vec<String>,
    pub queue_id: i32,
    pub interaction_name: String,
    pub policy_name: String,
}

impl CompiledRule {
    /// Matches `Policy.build_nft_rule`'s log-action rendering: a CSV log
    /// type gets a `log prefix "interaction#policy,,VERDICT" group N`
    /// clause, a PCAP log type just `log group N`, directly before the
    /// terminal accept/queue verdict.
    fn render(&self, log_type: LogType, log_group: u16) -> String {
        let matches = self.stateless_matches.join(" ");
        let is_queue = self.queue_id != ACCEPT_DIRECT_QUEUE;
        let verdict_word = if is_queue { "QUEUE" } else { "ACCEPT" };

        let log_clause = match log_type {
            LogType::None => String::new(),
            LogType::Csv => format!(
                "log prefix \"{}#{},,{}\" group {log_group} ",
                self.interaction_name, self.policy_name, verdict_word
            ),
            LogType::Pcap => format!("log group {log_group} "),
        };

        let verdict = if is_queue {
            format!("queue num {}", self.queue_id)
        } else {
            "accept".to_string()
        };

        if matches.is_empty() {
            format!("{log_clause}{verdict}")
        } else {
            format!("{matches} {log_clause}{verdict}")
        }
    }
}

/// Renders a full chain body: one rule per compiled step, terminated by
/// the default-drop policy (spec §3: an unmatched packet is always
/// dropped, never implicitly accepted).
pub fn render_chain(
    table: &str,
    chain: &str,
    rules: &[CompiledRule],
    log_type: LogType,
    log_group: u16,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("table inet {table} {{\n"));
    out.push_str(&format!("\tchain {chain} {{\n"));
    out.push_str("\t\ttype filter hook input priority 0; policy drop;\n");
    for rule in rules {
        out.push_str(&format!("\t\t{}\n", rule.render(log_type, log_group)));
    }
    out.push_str("\t}\n}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(queue_id: i32) -> CompiledRule {
        CompiledRule {
            stateless_matches: vec!["ip daddr 8.8.8.8".to_string(), "tcp dport 443".to_string()],
            queue_id,
            interaction_name: "single".to_string(),
            policy_name: "dns-query".to_string(),
        }
    }

    #[test]
    fn renders_queue_rule_with_matches() {
        assert_eq!(
            rule(100).render(LogType::None, 100),
            "ip daddr 8.8.8.8 tcp dport 443 queue num 100"
        );
    }

    #[test]
    fn renders_direct_accept_without_queue() {
        let mut r = rule(ACCEPT_DIRECT_QUEUE);
        r.stateless_matches = vec!["ip daddr 8.8.8.8".to_string()];
        assert_eq!(r.render(LogType::None, 100), "ip daddr 8.8.8.8 accept");
    }

    #[test]
    fn csv_log_type_adds_prefixed_log_clause_before_verdict() {
        let rendered = rule(100).render(LogType::Csv, 200);
        assert_eq!(
            rendered,
            "ip daddr 8.8.8.8 tcp dport 443 log prefix \"single#dns-query,,QUEUE\" group 200 queue num 100"
        );
    }

    #[test]
    fn pcap_log_type_adds_bare_group_clause() {
        let rendered = rule(ACCEPT_DIRECT_QUEUE).render(LogType::Pcap, 50);
        assert!(rendered.ends_with("log group 50 accept"));
    }

    #[test]
    fn chain_ends_with_implicit_drop_policy() {
        let rendered = render_chain("firewall", "input", &[], LogType::None, 100);
        assert!(rendered.contains("policy drop"));
    }
}

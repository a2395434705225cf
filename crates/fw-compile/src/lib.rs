//! Compiles a loaded [`fw_profile::Profile`] into an nftables ruleset
//! and a [`classifier_config::ClassifierConfig`] artifact (spec §4.3).
//! Grounded on `original_source/src/translator/translator.py` (overall
//! walk order: single policies first, then each interaction in turn)
//! and `NFQueue.py` (grouping/numbering).

pub mod classifier_config;
pub mod error;
pub mod queue;
pub mod ruleset;

use classifier_config::{ClassifierConfig, QueueEntry};
use error::Result;
use fw_common::log::LogType;
use fw_common::Verdict;
use fw_profile::policy::Policy;
use fw_profile::{DeviceInfo, NetworkInfo, Profile, UnsupportedProtocol};
use ruleset::CompiledRule;

pub struct CompileOutput {
    pub ruleset: String,
    pub config: ClassifierConfig,
    pub unsupported: Vec<UnsupportedProtocol>,
}

struct StepInput<'a> {
    policy: &'a Policy,
    is_backward: bool,
}

fn compile_group(
    device: &DeviceInfo,
    network: &NetworkInfo,
    interaction_name: &str,
    base: u16,
    steps: &[StepInput<'_>],
    unsupported: &mut Vec<UnsupportedProtocol>,
) -> Result<(Vec<CompiledRule>, Vec<QueueEntry>, u16)> {
    let mut clauses = Vec::with_capacity(steps.len());
    let mut forces = Vec::with_capacity(steps.len());
    let mut kinds = Vec::with_capacity(steps.len());
    let mut bidirectional = Vec::with_capacity(steps.len());
    for step in steps {
        let clause = step
            .policy
            .parse_protocols(device, network, step.is_backward, unsupported)?;
        let has_rate = step
            .policy
            .stats
            .rate
            .as_ref()
            .map(|r| !r.is_unlimited())
            .unwrap_or(false);
        let has_size = step.policy.stats.packet_size.is_some();
        forces.push(has_rate || has_size);
        kinds.push(step.policy.kind);
        bidirectional.push(step.policy.is_bidirectional);
        clauses.push(clause);
    }

    let is_multi_policy_interaction = interaction_name != "single" && steps.len() > 1;
    let (queue_ids, next_base) = queue::assign_queues(
        base,
        &clauses,
        &forces,
        is_multi_policy_interaction,
        &kinds,
        &bidirectional,
    );

    let mut rules = Vec::with_capacity(steps.len());
    let mut entries = Vec::new();
    let mut seen_queues = std::collections::HashSet::new();

    for ((step, clause), queue_id) in steps.iter().zip(clauses.into_iter()).zip(queue_ids) {
        let stateless_matches = clause.stateless.iter().map(|m| m.rendered.clone()).collect();
        rules.push(CompiledRule {
            stateless_matches,
            queue_id,
            interaction_name: interaction_name.to_string(),
            policy_name: step.policy.name.clone(),
        });

        if queue_id != fw_common::ACCEPT_DIRECT_QUEUE && seen_queues.insert(queue_id) {
            entries.push(QueueEntry {
                queue_id,
                interaction_name: interaction_name.to_string(),
                policy_name: step.policy.name.clone(),
                is_transient: step.policy.is_transient(),
                is_periodic: step.policy.is_periodic(),
                is_backward: step.is_backward,
                predicates: clause.stateful,
                rate: step.policy.stats.rate,
                packet_size: step.policy.stats.packet_size,
                packet_count: step.policy.stats.packet_count,
                duration_micros: step.policy.stats.duration_micros,
                on_match: Verdict::Accept,
            });
        }
    }

    Ok((rules, entries, next_base))
}

/// Compiles a full profile. Single policies all share one queue-numbering
/// pool starting at 0; each interaction then gets its own pool starting
/// at the next free base (spec §4.3: "+10 per interaction, shared
/// counter for single policies").
pub fn compile(
    profile: &Profile,
    table: &str,
    chain: &str,
    log_type: LogType,
    log_group: u16,
) -> Result<CompileOutput> {
    let mut unsupported = Vec::new();
    let mut all_rules = Vec::new();
    let mut all_entries = Vec::new();
    let mut base: u16 = 0;

    let single_steps: Vec<StepInput<'_>> = profile
        .single_policies
        .iter()
        .map(|policy| StepInput {
            policy,
            is_backward: false,
        })
        .collect();
    let (rules, entries, next_base) = compile_group(
        &profile.device,
        &profile.network,
        "single",
        base,
        &single_steps,
        &mut unsupported,
    )?;
    all_rules.extend(rules);
    all_entries.extend(entries);
    base = next_base;

    for interaction in &profile.interactions {
        let steps: Vec<StepInput<'_>> = interaction
            .steps
            .iter()
            .map(|s| StepInput {
                policy: &s.policy,
                is_backward: s.is_backward,
            })
            .collect();
        let (rules, entries, next_base) = compile_group(
            &profile.device,
            &profile.network,
            &interaction.name,
            base,
            &steps,
            &mut unsupported,
        )?;
        all_rules.extend(rules);
        all_entries.extend(entries);
        base = next_base;
    }

    let ruleset = ruleset::render_chain(table, chain, &all_rules, log_type, log_group);
    let config = ClassifierConfig {
        device_name: profile.device.name.clone(),
        queues: all_entries,
    };

    Ok(CompileOutput {
        ruleset,
        config,
        unsupported,
    })
}

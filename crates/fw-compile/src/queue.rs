//! Queue grouping and numbering (spec §4.3). Grounded on
//! `original_source/src/translator/NFQueue.py`'s
//! `contains_policy_matches` (the grouping key) and `translator.py`'s
//! per-interaction queue-base allocation.

use fw_common::{ACCEPT_DIRECT_QUEUE, QUEUE_ID_STEP};
use fw_profile::policy::PolicyKind;
use fw_profile::protocols::ParsedClause;
use std::collections::HashMap;

/// A step's queue-grouping key: the rendered stateless match text
/// (sorted, so order in the profile doesn't matter), as a multiset of
/// rendered `(template, value)` pairs. Two steps share one NFQUEUE
/// number iff this key is equal — stateful predicates play no part in
/// the comparison (spec §4.3 step 3: "order-independent equality over
/// the rendered text, not structural equality over the unrendered
/// fragments").
fn grouping_key(clause: &ParsedClause) -> Vec<String> {
    let mut stateless: Vec<String> = clause.stateless.iter().map(|m| m.rendered.clone()).collect();
    stateless.sort();
    stateless
}

/// Does this step need userspace processing at all, or can the kernel
/// accept/drop it purely on the stateless match (spec §4.3's exact
/// NFQ-usage boolean)? A policy bypasses NFQUEUE only when it has no
/// stateful predicate, no match-producing rate/packet-size statistic, is
/// not part of a multi-policy interaction, and its kind/direction is one
/// of the two bypass-eligible shapes: periodic, or a unidirectional
/// one-off. Every other case — including a transient policy, which is
/// neither periodic nor one-off and so is never bypass-eligible —
/// requires NFQUEUE.
pub fn needs_nfqueue(
    clause: &ParsedClause,
    has_rate: bool,
    has_packet_size: bool,
    is_multi_policy_interaction: bool,
    kind: PolicyKind,
    is_bidirectional: bool,
) -> bool {
    if !clause.stateful.is_empty() || has_rate || has_packet_size || is_multi_policy_interaction {
        return true;
    }
    let bypass_eligible =
        kind == PolicyKind::Periodic || (kind == PolicyKind::OneOff && !is_bidirectional);
    !bypass_eligible
}

/// Assigns NFQUEUE numbers to a sequence of steps belonging to one
/// interaction (or to the shared single-policy pool), starting at
/// `base`. `is_multi_policy_interaction` is a property of the whole
/// group (true iff it is a real interaction with more than one step;
/// always false for the single-policy pool, since those policies never
/// chain into one sequence). Steps whose grouping key repeats an earlier
/// step in the same call reuse that step's queue number; steps that
/// don't need NFQUEUE at all get [`fw_common::ACCEPT_DIRECT_QUEUE`].
/// Returns the assigned numbers in input order, plus the next free base
/// for the caller's following interaction (`base + QUEUE_ID_STEP`,
/// unconditionally: the numbering reserves one step of headroom per
/// interaction even when every member shared a single queue).
pub fn assign_queues(
    base: u16,
    clauses: &[ParsedClause],
    stats_forces_queue: &[bool],
    is_multi_policy_interaction: bool,
    kinds: &[PolicyKind],
    bidirectional: &[bool],
) -> (Vec<i32>, u16) {
    let mut seen: HashMap<Vec<String>, i32> = HashMap::new();
    let mut next_offset: u16 = 0;
    let mut out = Vec::with_capacity(clauses.len());

    for (((clause, &forces), &kind), &is_bidirectional) in clauses
        .iter()
        .zip(stats_forces_queue)
        .zip(kinds)
        .zip(bidirectional)
    {
        if !needs_nfqueue(clause, forces, false, is_multi_policy_interaction, kind, is_bidirectional) {
            out.push(ACCEPT_DIRECT_QUEUE);
            continue;
        }
        let key = grouping_key(clause);
        let queue = *seen.entry(key).or_insert_with(|| {
            let assigned = base as i32 + next_offset as i32;
            next_offset += 1;
            assigned
        });
        out.push(queue);
    }

    (out, base + QUEUE_ID_STEP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fw_profile::protocols::StatelessMatch;

    fn clause_with(rendered: &str) -> ParsedClause {
        ParsedClause {
            stateless: vec![StatelessMatch::new("{}", rendered)],
            stateful: Vec::new(),
        }
    }

    #[test]
    fn identical_groups_share_one_queue_number() {
        let clauses = vec![clause_with("a"), clause_with("a"), clause_with("b")];
        let kinds = [PolicyKind::Periodic; 3];
        let (queues, next_base) =
            assign_queues(100, &clauses, &[true, true, true], false, &kinds, &[false, false, false]);
        assert_eq!(queues[0], queues[1]);
        assert_ne!(queues[0], queues[2]);
        assert_eq!(next_base, 110);
    }

    #[test]
    fn stateless_only_unidirectional_one_off_skips_the_queue() {
        let clauses = vec![clause_with("a")];
        let (queues, _) =
            assign_queues(100, &clauses, &[false], false, &[PolicyKind::OneOff], &[false]);
        assert_eq!(queues[0], ACCEPT_DIRECT_QUEUE);
    }

    #[test]
    fn transient_policy_is_never_bypass_eligible() {
        let clauses = vec![clause_with("a")];
        let (queues, _) =
            assign_queues(100, &clauses, &[false], false, &[PolicyKind::Transient], &[false]);
        assert_ne!(queues[0], ACCEPT_DIRECT_QUEUE);
    }

    #[test]
    fn multi_policy_interaction_forces_a_queue_even_for_a_bypass_eligible_kind() {
        let clauses = vec![clause_with("a")];
        let (queues, _) =
            assign_queues(100, &clauses, &[false], true, &[PolicyKind::Periodic], &[false]);
        assert_ne!(queues[0], ACCEPT_DIRECT_QUEUE);
    }

    #[test]
    fn bidirectional_one_off_forces_a_queue() {
        let clauses = vec![clause_with("a")];
        let (queues, _) =
            assign_queues(100, &clauses, &[false], false, &[PolicyKind::OneOff], &[true]);
        assert_ne!(queues[0], ACCEPT_DIRECT_QUEUE);
    }
}

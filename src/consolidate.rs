//! Rule consolidation.
//!
//! Final barrier over the whole document's rule set. Two passes:
//!
//! 1. rules of consolidatable kinds (field-state and copy actions, whose
//!    destination sets are commutative) sharing `(action, sources,
//!    condition operator, condition values)` merge into the lowest-id rule
//!    with the union of their destination sets;
//! 2. exact duplicates over `(action, sources, destinations, condition)`
//!    collapse to their first occurrence.
//!
//! Verification and extraction rules are never consolidated — their
//! destination arrays are ordinal-mapped, not sets. Successor references
//! to a removed rule are rewritten to its survivor so the chain invariant
//! holds by construction; a dangling id after this pass is a compiler bug
//! and fails graph finalization.

use std::collections::HashMap;

use tracing::debug;

use formrule_types::{ActionKind, FieldId, RuleCondition, RuleId, RuleInstance, RuleOperator};

#[derive(Debug, PartialEq, Eq, Hash)]
struct GroupKey {
    action: ActionKind,
    sources: Vec<FieldId>,
    operator: Option<RuleOperator>,
    values: Vec<String>,
}

impl GroupKey {
    fn of(rule: &RuleInstance) -> Self {
        let mut sources = rule.source_ids.clone();
        sources.sort_unstable();
        let (operator, mut values) = match &rule.condition {
            Some(c) => (Some(c.operator), c.values.clone()),
            None => (None, Vec::new()),
        };
        values.sort_unstable();
        Self {
            action: rule.action,
            sources,
            operator,
            values,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct ExactKey {
    action: ActionKind,
    sources: Vec<FieldId>,
    destinations: Vec<FieldId>,
    condition: Option<RuleCondition>,
}

impl ExactKey {
    fn of(rule: &RuleInstance) -> Self {
        Self {
            action: rule.action,
            sources: rule.source_ids.clone(),
            destinations: rule.destination_ids.clone(),
            condition: rule.condition.clone(),
        }
    }
}

/// Merge and deduplicate the assembled rule set, preserving relative order
/// of the survivors.
pub fn consolidate(rules: Vec<RuleInstance>) -> Vec<RuleInstance> {
    let before = rules.len();
    // removed id → surviving id, for successor rewriting
    let mut remap: HashMap<RuleId, RuleId> = HashMap::new();

    // Pass 1: condition-group merge.
    let mut kept: Vec<RuleInstance> = Vec::with_capacity(rules.len());
    let mut groups: HashMap<GroupKey, usize> = HashMap::new();
    for rule in rules {
        if !rule.action.is_consolidatable() {
            kept.push(rule);
            continue;
        }
        let key = GroupKey::of(&rule);
        match groups.get(&key) {
            Some(&slot) => {
                let survivor = &mut kept[slot];
                remap.insert(rule.id, survivor.id);
                for dest in rule.destination_ids {
                    if !survivor.destination_ids.contains(&dest) {
                        survivor.destination_ids.push(dest);
                    }
                }
                survivor.destination_ids.sort_unstable();
                for succ in rule.trigger_successors {
                    survivor.add_successor(succ);
                }
            }
            None => {
                groups.insert(key, kept.len());
                let mut rule = rule;
                // Destination sets of consolidatable rules are unordered;
                // normalize for deterministic output.
                rule.destination_ids.sort_unstable();
                rule.destination_ids.dedup();
                kept.push(rule);
            }
        }
    }

    // Pass 2: exact-duplicate removal.
    let mut deduped: Vec<RuleInstance> = Vec::with_capacity(kept.len());
    let mut seen: HashMap<ExactKey, RuleId> = HashMap::new();
    for rule in kept {
        match seen.get(&ExactKey::of(&rule)) {
            Some(&survivor_id) => {
                remap.insert(rule.id, survivor_id);
            }
            None => {
                seen.insert(ExactKey::of(&rule), rule.id);
                deduped.push(rule);
            }
        }
    }

    // Rewrite successor references to removed rules onto their survivors.
    if !remap.is_empty() {
        for rule in &mut deduped {
            let mut rewritten: Vec<RuleId> = Vec::with_capacity(rule.trigger_successors.len());
            for succ in rule.trigger_successors.drain(..) {
                let mut target = succ;
                while let Some(&next) = remap.get(&target) {
                    target = next;
                }
                if target != rule.id && !rewritten.contains(&target) {
                    rewritten.push(target);
                }
            }
            rule.trigger_successors = rewritten;
        }
    }

    debug!(before, after = deduped.len(), "consolidated rule set");
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;
    use formrule_types::Locality;
    use serde_json::Map;

    fn vis_rule(id: RuleId, destination: FieldId) -> RuleInstance {
        RuleInstance {
            id,
            action: ActionKind::MakeVisible,
            field_id: destination,
            source_ids: vec![10],
            destination_ids: vec![destination],
            condition: Some(RuleCondition::new(
                RuleOperator::In,
                vec!["Registered".to_string()],
            )),
            trigger_successors: Vec::new(),
            locality: Locality::Client,
            params: Map::new(),
        }
    }

    #[test]
    fn shared_condition_rules_merge_destinations() {
        // Trade Name (21) and Legal Name (22) under the same condition.
        let merged = consolidate(vec![vis_rule(1, 21), vis_rule(2, 22)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, 1);
        assert_eq!(merged[0].destination_ids, vec![21, 22]);
    }

    #[test]
    fn union_has_no_duplicate_ids() {
        let merged = consolidate(vec![vis_rule(1, 21), vis_rule(2, 21), vis_rule(3, 22)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].destination_ids, vec![21, 22]);
    }

    #[test]
    fn different_condition_values_do_not_merge() {
        let mut other = vis_rule(2, 22);
        other.condition = Some(RuleCondition::new(
            RuleOperator::In,
            vec!["Unregistered".to_string()],
        ));
        let merged = consolidate(vec![vis_rule(1, 21), other]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn different_operators_do_not_merge() {
        let mut other = vis_rule(2, 22);
        other.condition = Some(RuleCondition::new(
            RuleOperator::NotIn,
            vec!["Registered".to_string()],
        ));
        let merged = consolidate(vec![vis_rule(1, 21), other]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn verification_rules_are_never_consolidated() {
        let verify = |id: RuleId| RuleInstance {
            id,
            action: ActionKind::Verify,
            field_id: 31,
            source_ids: vec![31, 32],
            destination_ids: vec![31],
            condition: None,
            trigger_successors: Vec::new(),
            locality: Locality::Server,
            params: Map::new(),
        };
        // Same sources but distinct ids: group pass must not touch them.
        let mut a = verify(1);
        a.destination_ids = vec![31];
        let mut b = verify(2);
        b.destination_ids = vec![33];
        let merged = consolidate(vec![a, b]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn exact_duplicates_collapse_and_successors_rewrite() {
        let dup_a = vis_rule(2, 21);
        let dup_b = vis_rule(3, 21);
        let producer = RuleInstance {
            id: 1,
            action: ActionKind::Extract,
            field_id: 30,
            source_ids: vec![30],
            destination_ids: vec![10],
            condition: None,
            trigger_successors: vec![2, 3],
            locality: Locality::Server,
            params: Map::new(),
        };

        let merged = consolidate(vec![producer, dup_a, dup_b]);
        assert_eq!(merged.len(), 2);
        // Both successor references now point at the surviving duplicate.
        assert_eq!(merged[0].trigger_successors, vec![2]);
    }

    #[test]
    fn consolidation_is_idempotent() {
        let once = consolidate(vec![vis_rule(1, 21), vis_rule(2, 22)]);
        let twice = consolidate(once.clone());
        assert_eq!(once, twice);
    }
}

//! Property tests for the consolidation pass.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use formrule::consolidate::consolidate;
use formrule::{ActionKind, Locality, RuleCondition, RuleInstance, RuleOperator};

type GroupKey = (Vec<i64>, RuleOperator, Vec<String>);

fn group_key(rule: &RuleInstance) -> GroupKey {
    let mut sources = rule.source_ids.clone();
    sources.sort_unstable();
    let cond = rule.condition.as_ref().expect("generated rules carry conditions");
    let mut values = cond.values.clone();
    values.sort_unstable();
    (sources, cond.operator, values)
}

fn arb_rules() -> impl Strategy<Value = Vec<RuleInstance>> {
    prop::collection::vec(
        (
            10..13i64,
            prop::collection::vec(20..26i64, 1..4),
            prop::bool::ANY,
            prop::sample::select(vec!["Registered", "Unregistered", "Composition"]),
        ),
        0..20,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (source, destinations, negated, value))| RuleInstance {
                id: i as i64 + 1,
                action: ActionKind::MakeVisible,
                field_id: destinations[0],
                source_ids: vec![source],
                destination_ids: destinations,
                condition: Some(RuleCondition::new(
                    if negated {
                        RuleOperator::NotIn
                    } else {
                        RuleOperator::In
                    },
                    vec![value.to_string()],
                )),
                trigger_successors: Vec::new(),
                locality: Locality::Client,
                params: serde_json::Map::new(),
            })
            .collect()
    })
}

proptest! {
    /// Each surviving rule's destination set is the exact union of its
    /// group's input destinations, with no duplicates, and no group is
    /// lost or invented.
    #[test]
    fn destination_union_is_exact(rules in arb_rules()) {
        let mut expected: BTreeMap<GroupKey, BTreeSet<i64>> = BTreeMap::new();
        for rule in &rules {
            expected
                .entry(group_key(rule))
                .or_default()
                .extend(rule.destination_ids.iter().copied());
        }

        let out = consolidate(rules);

        let mut actual: BTreeMap<GroupKey, BTreeSet<i64>> = BTreeMap::new();
        for rule in &out {
            // one surviving rule per group
            let key = group_key(rule);
            prop_assert!(
                actual.insert(key, rule.destination_ids.iter().copied().collect()).is_none()
            );
            // no duplicate destination ids
            let unique: BTreeSet<i64> = rule.destination_ids.iter().copied().collect();
            prop_assert_eq!(unique.len(), rule.destination_ids.len());
        }
        prop_assert_eq!(actual, expected);
    }

    /// Consolidation is idempotent.
    #[test]
    fn consolidation_is_idempotent(rules in arb_rules()) {
        let once = consolidate(rules);
        let twice = consolidate(once.clone());
        prop_assert_eq!(once, twice);
    }
}

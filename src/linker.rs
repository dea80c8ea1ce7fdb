//! Trigger-chain linking.
//!
//! A pure post-processing pass over the assembled rule set: producer rules
//! (extraction, value copy) that write a field id gain trigger-successor
//! edges to every rule that reads that id as a source. No new field
//! resolution happens here, and appends are idempotent.

use std::collections::HashMap;

use tracing::debug;

use formrule_types::{FieldId, RuleId, RuleInstance, UNMAPPED_FIELD};

pub struct ChainLinker;

impl ChainLinker {
    /// Wire producers to their consumers in place. Iteration is in rule
    /// order throughout, so successor lists come out deterministic.
    pub fn link(rules: &mut [RuleInstance]) {
        let mut readers: HashMap<FieldId, Vec<RuleId>> = HashMap::new();
        for rule in rules.iter() {
            for &source in &rule.source_ids {
                if source != UNMAPPED_FIELD {
                    readers.entry(source).or_default().push(rule.id);
                }
            }
        }

        let mut edges = 0usize;
        for rule in rules.iter_mut() {
            if !rule.action.is_producer() {
                continue;
            }
            let written: Vec<FieldId> = rule.mapped_destinations().collect();
            let producer_id = rule.id;
            for field in written {
                if let Some(consumers) = readers.get(&field) {
                    for &consumer in consumers {
                        if consumer != producer_id {
                            rule.add_successor(consumer);
                            edges += 1;
                        }
                    }
                }
            }
        }
        debug!(edges, "linked trigger chains");
    }
}

//! Multi-slot verification builder.
//!
//! Resolves each declared source slot independently. If any mandatory
//! slot cannot be resolved the instance is failed outright — downstream
//! consumers reject rules with missing mandatory sources, so a partial
//! rule must never reach the graph. Optional slots that do not resolve
//! keep the sentinel at their ordinal.

use serde_json::Map;
use tracing::warn;

use super::AssemblyContext;
use crate::catalog::TemplateSpec;
use crate::report::{CompilationFailure, CompilationReport};
use formrule_types::{ActionKind, Locality, RuleInstance, UNMAPPED_FIELD};

pub(super) fn build(
    ctx: &AssemblyContext<'_>,
    report: &mut CompilationReport,
) -> Vec<RuleInstance> {
    let TemplateSpec::Verification { source_slots } = &ctx.template.spec else {
        return Vec::new();
    };

    let mut source_ids = vec![UNMAPPED_FIELD; source_slots.len()];
    for slot in source_slots {
        match ctx.resolve_slot(&slot.name) {
            Some(id) => source_ids[slot.ordinal] = id,
            None if slot.mandatory => {
                warn!(
                    field = ctx.field.canonical_id,
                    template = %ctx.template.template_id,
                    slot = %slot.name,
                    "mandatory source slot unresolved, dropping verification rule"
                );
                report.record(CompilationFailure::MissingMandatorySlot {
                    field_id: ctx.field.canonical_id,
                    template_id: ctx.template.template_id.clone(),
                    slot: slot.name.clone(),
                });
                return Vec::new();
            }
            None => {}
        }
    }

    vec![RuleInstance {
        id: ctx.ids.next_id(),
        action: ActionKind::Verify,
        field_id: ctx.field.canonical_id,
        source_ids,
        destination_ids: vec![ctx.field.canonical_id],
        condition: None,
        trigger_successors: Vec::new(),
        locality: Locality::Server,
        params: Map::new(),
    }]
}

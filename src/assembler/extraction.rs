//! Extraction builder.
//!
//! One upload-style source field; destinations are mapped through the
//! template's ordinal positions, with the sentinel at every ordinal whose
//! slot found no field. An extraction that resolves no destination at all
//! is dropped and reported rather than emitted as an all-sentinel rule.

use serde_json::Map;
use tracing::debug;

use super::AssemblyContext;
use crate::catalog::TemplateSpec;
use crate::report::{CompilationFailure, CompilationReport};
use formrule_types::{ActionKind, Locality, RuleInstance, UNMAPPED_FIELD};

pub(super) fn build(
    ctx: &AssemblyContext<'_>,
    report: &mut CompilationReport,
) -> Vec<RuleInstance> {
    let TemplateSpec::Extraction {
        destination_slots, ..
    } = &ctx.template.spec
    else {
        return Vec::new();
    };

    let mut destination_ids = vec![UNMAPPED_FIELD; destination_slots.len()];
    let mut mapped = 0usize;
    for slot in destination_slots {
        if let Some(id) = ctx.resolve_slot(&slot.name) {
            destination_ids[slot.ordinal] = id;
            mapped += 1;
        }
    }

    if mapped == 0 {
        report.record(CompilationFailure::UnmatchedAnnotation {
            field_id: ctx.field.canonical_id,
            field_name: ctx.field.display_name.clone(),
            detail: format!(
                "extraction template '{}' resolved no destination fields",
                ctx.template.template_id
            ),
        });
        return Vec::new();
    }

    debug!(
        field = ctx.field.canonical_id,
        template = %ctx.template.template_id,
        mapped,
        total = destination_ids.len(),
        "assembled extraction rule"
    );

    vec![RuleInstance {
        id: ctx.ids.next_id(),
        action: ActionKind::Extract,
        field_id: ctx.field.canonical_id,
        source_ids: vec![ctx.field.canonical_id],
        destination_ids,
        condition: None,
        trigger_successors: Vec::new(),
        locality: Locality::Server,
        params: Map::new(),
    }]
}

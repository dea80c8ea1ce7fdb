//! Conditional field-state builder.
//!
//! Handles visibility, mandatory-control, editability and value-copy
//! directives. For each condition clause it emits the stated-branch rule
//! and, when the annotation carried an `otherwise` branch, the paired
//! inverse rule — same values, inverted operator.

use serde_json::Map;
use tracing::debug;

use super::AssemblyContext;
use crate::report::{CompilationFailure, CompilationReport};
use formrule_types::{
    ActionKind, FieldId, RuleCondition, RuleInstance, RuleOperator,
};

pub(super) fn build(
    ctx: &AssemblyContext<'_>,
    report: &mut CompilationReport,
) -> Vec<RuleInstance> {
    let mut rules = Vec::new();

    if ctx.annotation.clauses.is_empty() {
        build_unconditional(ctx, report, &mut rules);
        return rules;
    }

    for clause in &ctx.annotation.clauses {
        let Some(source) = ctx.resolver.resolve(&clause.condition.field_ref, ctx.index) else {
            report.record(CompilationFailure::UnresolvedFieldReference {
                field_id: ctx.field.canonical_id,
                reference: clause.condition.field_ref.clone(),
            });
            continue;
        };

        let stated_action = clause.then_action.unwrap_or(ctx.matched.action);
        let condition = RuleCondition::new(
            RuleOperator::from(clause.condition.operator),
            vec![clause.condition.value.clone()],
        );

        rules.push(state_rule(
            ctx,
            stated_action,
            vec![source.canonical_id],
            Some(condition.clone()),
        ));

        if let Some(inverse_action) = clause.otherwise_action {
            rules.push(state_rule(
                ctx,
                inverse_action,
                vec![source.canonical_id],
                Some(condition.inverted()),
            ));
        }
    }

    debug!(
        field = ctx.field.canonical_id,
        emitted = rules.len(),
        "assembled conditional state rules"
    );
    rules
}

/// No condition clause: either a copy directive sourcing another field, or
/// an unconditional state change.
fn build_unconditional(
    ctx: &AssemblyContext<'_>,
    report: &mut CompilationReport,
    rules: &mut Vec<RuleInstance>,
) {
    if ctx.matched.action == ActionKind::CopyValue {
        let Some(reference) = ctx.annotation.field_refs.first() else {
            report.record(CompilationFailure::UnmatchedAnnotation {
                field_id: ctx.field.canonical_id,
                field_name: ctx.field.display_name.clone(),
                detail: "copy directive names no source field".to_string(),
            });
            return;
        };
        match ctx.resolver.resolve(reference, ctx.index) {
            Some(source) => rules.push(state_rule(
                ctx,
                ActionKind::CopyValue,
                vec![source.canonical_id],
                None,
            )),
            None => report.record(CompilationFailure::UnresolvedFieldReference {
                field_id: ctx.field.canonical_id,
                reference: reference.clone(),
            }),
        }
        return;
    }

    rules.push(state_rule(ctx, ctx.matched.action, Vec::new(), None));
}

fn state_rule(
    ctx: &AssemblyContext<'_>,
    action: ActionKind,
    source_ids: Vec<FieldId>,
    condition: Option<RuleCondition>,
) -> RuleInstance {
    RuleInstance {
        id: ctx.ids.next_id(),
        action,
        field_id: ctx.field.canonical_id,
        source_ids,
        destination_ids: vec![ctx.field.canonical_id],
        condition,
        trigger_successors: Vec::new(),
        locality: action.locality(),
        params: Map::new(),
    }
}

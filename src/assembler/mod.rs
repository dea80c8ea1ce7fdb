//! Rule assembly.
//!
//! One builder per rule family turns a matched template plus resolved
//! slots into concrete rule instances. Builders report recoverable
//! failures (unresolved references, missing mandatory slots) into the
//! compilation report and emit nothing for the affected clause; an
//! emitted instance whose destination array disagrees with its template's
//! arity is a programming-contract violation that aborts the document.

mod conditional;
mod extraction;
mod lookup;
mod verification;

use crate::annotation::ParsedAnnotation;
use crate::catalog::{RuleTemplate, TemplateSpec};
use crate::error::StructuralError;
use crate::ids::IdAllocator;
use crate::matching::MatchResult;
use crate::report::CompilationReport;
use crate::resolver::{FieldIndex, FieldResolver};
use formrule_types::{FieldDescriptor, FieldId, RuleInstance};

/// Everything a builder needs for one matched field.
pub(crate) struct AssemblyContext<'a> {
    pub field: &'a FieldDescriptor,
    pub annotation: &'a ParsedAnnotation,
    pub matched: &'a MatchResult,
    pub template: &'a RuleTemplate,
    pub index: &'a FieldIndex<'a>,
    pub resolver: &'a FieldResolver,
    pub ids: &'a IdAllocator,
}

impl AssemblyContext<'_> {
    /// A slot assignment from the semantic capability, accepted only if it
    /// points at a real field in this document.
    fn slot_assignment(&self, slot_name: &str) -> Option<FieldId> {
        self.matched
            .slot_assignments
            .get(slot_name)
            .copied()
            .filter(|&id| self.index.by_id(id).is_some())
    }

    /// Resolve a template slot to a field id: capability assignment first,
    /// then name resolution against the document's field set.
    fn resolve_slot(&self, slot_name: &str) -> Option<FieldId> {
        self.slot_assignment(slot_name).or_else(|| {
            self.resolver
                .resolve(slot_name, self.index)
                .map(|f| f.canonical_id)
        })
    }
}

/// Build the rule instances for one matched field.
pub(crate) fn assemble(
    ctx: &AssemblyContext<'_>,
    report: &mut CompilationReport,
) -> Result<Vec<RuleInstance>, StructuralError> {
    let rules = match &ctx.template.spec {
        TemplateSpec::ConditionalState => conditional::build(ctx, report),
        TemplateSpec::Verification { .. } => verification::build(ctx, report),
        TemplateSpec::Extraction { .. } => extraction::build(ctx, report),
        TemplateSpec::ExternalOptions => lookup::build(ctx, report),
    };

    let expected = ctx.template.destination_arity();
    for rule in &rules {
        if rule.destination_ids.len() != expected {
            return Err(StructuralError::DestinationArity {
                rule_id: rule.id,
                template_id: ctx.template.template_id.clone(),
                expected,
                found: rule.destination_ids.len(),
            });
        }
    }
    Ok(rules)
}

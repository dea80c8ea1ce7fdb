//! Externally-sourced option-list builder.
//!
//! Emits a rule only when the annotation explicitly names an external
//! table, reference, or list — never inferred from the field's declared
//! type alone. The data-source name travels in the rule's parameter
//! payload.

use serde_json::{Map, Value};

use super::AssemblyContext;
use crate::report::{CompilationFailure, CompilationReport};
use formrule_types::{ActionKind, Locality, RuleInstance};

pub(super) fn build(
    ctx: &AssemblyContext<'_>,
    report: &mut CompilationReport,
) -> Vec<RuleInstance> {
    let Some(source) = &ctx.annotation.external_source else {
        report.record(CompilationFailure::UnmatchedAnnotation {
            field_id: ctx.field.canonical_id,
            field_name: ctx.field.display_name.clone(),
            detail: "option-list annotation names no external data source".to_string(),
        });
        return Vec::new();
    };

    let mut params = Map::new();
    params.insert("data_source".to_string(), Value::String(source.clone()));

    vec![RuleInstance {
        id: ctx.ids.next_id(),
        action: ActionKind::ExternalOptions,
        field_id: ctx.field.canonical_id,
        source_ids: Vec::new(),
        destination_ids: vec![ctx.field.canonical_id],
        condition: None,
        trigger_successors: Vec::new(),
        locality: Locality::Server,
        params,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationParser;
    use crate::assembler::test_support::match_result;
    use crate::catalog::SchemaCatalog;
    use crate::ids::IdAllocator;
    use crate::resolver::{FieldIndex, FieldResolver};
    use formrule_types::{FieldDescriptor, FieldType};

    #[test]
    fn explicit_source_emits_parameterized_rule() {
        let catalog = SchemaCatalog::builtin().unwrap();
        let fields = vec![FieldDescriptor::new(50, "State", FieldType::Dropdown)];
        let index = FieldIndex::new(&fields);
        let resolver = FieldResolver::default();
        let ids = IdAllocator::new();
        let parsed =
            AnnotationParser::new().parse("Dropdown values from the State Code master");
        let matched = match_result("options.external", ActionKind::ExternalOptions);
        let ctx = AssemblyContext {
            field: &fields[0],
            annotation: &parsed,
            matched: &matched,
            template: catalog.get("options.external").unwrap(),
            index: &index,
            resolver: &resolver,
            ids: &ids,
        };
        let mut report = crate::report::CompilationReport::new("test", 1);

        let rules = build(&ctx, &mut report);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].params["data_source"], "State Code");
        assert_eq!(rules[0].destination_ids, vec![50]);
    }

    #[test]
    fn dropdown_without_named_source_emits_nothing() {
        let catalog = SchemaCatalog::builtin().unwrap();
        let fields = vec![FieldDescriptor::new(50, "State", FieldType::Dropdown)];
        let index = FieldIndex::new(&fields);
        let resolver = FieldResolver::default();
        let ids = IdAllocator::new();
        // Mentions a reference table keyword but names no source.
        let parsed = AnnotationParser::new().parse("Populated via reference data");
        let matched = match_result("options.external", ActionKind::ExternalOptions);
        let ctx = AssemblyContext {
            field: &fields[0],
            annotation: &parsed,
            matched: &matched,
            template: catalog.get("options.external").unwrap(),
            index: &index,
            resolver: &resolver,
            ids: &ids,
        };
        let mut report = crate::report::CompilationReport::new("test", 1);

        let rules = build(&ctx, &mut report);
        assert!(rules.is_empty());
        assert!(report.has_failures());
    }
}

//! Annotation parsing.
//!
//! Turns one field's free-text business-logic annotation into a
//! [`ParsedAnnotation`]: keyword categories, action hints, condition
//! clauses, a source-document hint, and reference extractions, plus a
//! weighted confidence score. Parsing never fails — malformed or empty
//! text yields an annotation with empty sets and confidence 0. The output
//! is consumed immediately by the matching pipeline and never persisted.

mod conditions;
mod keywords;

use std::collections::BTreeSet;

pub use conditions::ConditionClause;
pub use keywords::KeywordCategory;

use formrule_types::{ActionKind, Condition};

/// Weighted components of the annotation confidence score.
const WEIGHT_KEYWORD: f32 = 0.4;
const WEIGHT_CONDITION: f32 = 0.3;
const WEIGHT_REFERENCE: f32 = 0.2;
const WEIGHT_ACTION: f32 = 0.1;

/// Structured view of one annotation. Ephemeral: one per field per
/// compilation pass.
#[derive(Debug, Clone, Default)]
pub struct ParsedAnnotation {
    pub keywords: BTreeSet<KeywordCategory>,
    pub action_hints: BTreeSet<ActionKind>,
    pub clauses: Vec<ConditionClause>,
    pub document_type_hint: Option<String>,
    /// References outside condition clauses (copy/prefill sources).
    pub field_refs: Vec<String>,
    /// Named external data source for option-list annotations.
    pub external_source: Option<String>,
    reference_resolved: bool,
}

impl ParsedAnnotation {
    /// The condition clauses' conditions, in order of appearance.
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.clauses.iter().map(|c| &c.condition)
    }

    /// Every field reference the annotation makes, conditional or not.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.clauses
            .iter()
            .map(|c| c.condition.field_ref.as_str())
            .chain(self.field_refs.iter().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
            && self.action_hints.is_empty()
            && self.clauses.is_empty()
            && self.document_type_hint.is_none()
    }

    /// Recorded by the compiler once the field index exists and the
    /// annotation's references have all been resolved.
    pub fn mark_reference_resolved(&mut self) {
        self.reference_resolved = true;
    }

    /// Weighted confidence: keyword presence 40%, condition extracted 30%,
    /// field reference resolved 20%, action identified 10%.
    pub fn confidence(&self) -> f32 {
        let mut score = 0.0;
        if !self.keywords.is_empty() {
            score += WEIGHT_KEYWORD;
        }
        if !self.clauses.is_empty() {
            score += WEIGHT_CONDITION;
        }
        if self.reference_resolved {
            score += WEIGHT_REFERENCE;
        }
        if !self.action_hints.is_empty() {
            score += WEIGHT_ACTION;
        }
        score
    }
}

/// Stateless annotation parser over the fixed vocabulary.
#[derive(Debug, Clone, Default)]
pub struct AnnotationParser;

impl AnnotationParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, text: &str) -> ParsedAnnotation {
        let text = text.trim();
        if text.is_empty() {
            return ParsedAnnotation::default();
        }

        let clauses = conditions::parse_clauses(text);
        let mut action_hints = keywords::action_hints(text);
        for clause in &clauses {
            action_hints.extend(clause.then_action);
            action_hints.extend(clause.otherwise_action);
        }

        ParsedAnnotation {
            keywords: keywords::keyword_categories(text),
            action_hints,
            clauses,
            document_type_hint: keywords::document_type_hint(text),
            field_refs: keywords::copy_references(text),
            external_source: keywords::external_source(text),
            reference_resolved: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formrule_types::ConditionOperator;

    #[test]
    fn empty_annotation_yields_zero_confidence() {
        let parsed = AnnotationParser::new().parse("   ");
        assert!(parsed.is_empty());
        assert_eq!(parsed.confidence(), 0.0);
    }

    #[test]
    fn scenario_a_annotation_parses_fully() {
        let parsed = AnnotationParser::new()
            .parse("if field 'GST Option' is 'Registered' then visible otherwise invisible");

        assert!(parsed.keywords.contains(&KeywordCategory::Visibility));
        assert_eq!(parsed.clauses.len(), 1);
        let clause = &parsed.clauses[0];
        assert_eq!(clause.condition.field_ref, "GST Option");
        assert_eq!(clause.condition.operator, ConditionOperator::Equals);
        assert_eq!(clause.condition.value, "Registered");
        assert!(parsed.action_hints.contains(&ActionKind::MakeVisible));
        assert!(parsed.action_hints.contains(&ActionKind::MakeInvisible));

        // keyword + condition + action, reference not yet resolved
        assert!((parsed.confidence() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn confidence_includes_resolution_component() {
        let mut parsed = AnnotationParser::new()
            .parse("if 'GST Option' is 'Registered' then mandatory");
        let before = parsed.confidence();
        parsed.mark_reference_resolved();
        assert!((parsed.confidence() - before - 0.2).abs() < 1e-6);
    }

    #[test]
    fn extraction_annotation_gets_doc_hint() {
        let parsed = AnnotationParser::new()
            .parse("Auto-filled from the uploaded PAN card; verified against NSDL");

        assert!(parsed.keywords.contains(&KeywordCategory::Extraction));
        assert_eq!(parsed.document_type_hint.as_deref(), Some("PAN_CARD"));
        assert!(parsed.action_hints.contains(&ActionKind::Extract));
    }

    #[test]
    fn copy_annotation_extracts_reference() {
        let parsed = AnnotationParser::new().parse("Same as 'Legal Name'.");
        assert!(parsed.keywords.contains(&KeywordCategory::DataCopy));
        assert_eq!(parsed.field_refs, vec!["Legal Name".to_string()]);
        assert_eq!(
            parsed.references().collect::<Vec<_>>(),
            vec!["Legal Name"]
        );
    }

    #[test]
    fn option_list_annotation_extracts_source() {
        let parsed =
            AnnotationParser::new().parse("Dropdown values from the State Code master");
        assert!(parsed.keywords.contains(&KeywordCategory::ExternalOptions));
        assert_eq!(parsed.external_source.as_deref(), Some("State Code"));
    }
}

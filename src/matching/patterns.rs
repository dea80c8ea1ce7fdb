//! Tier-1 deterministic pattern catalog.
//!
//! A fixed table of keyword/condition shapes with static confidence
//! scores; the first entry whose requirements the parsed annotation
//! satisfies wins. Entries are ordered most-specific first, so
//! document-backed and conditional shapes shadow their generic fallbacks.
//! Unconditional state shapes score below the escalation threshold on
//! purpose: alone they are too ambiguous, and the pipeline hands them to
//! the semantic capability.

use crate::annotation::{KeywordCategory, ParsedAnnotation};
use formrule_types::ActionKind;

#[derive(Debug, Clone, Copy)]
pub(crate) enum PatternAction {
    /// The entry names the action directly.
    Fixed(ActionKind),
    /// The action comes from the first condition clause's stated branch.
    FromConditionBranch,
    /// The action comes from the annotation's strongest action hint.
    FromActionHint,
}

#[derive(Debug)]
pub(crate) struct PatternEntry {
    pub id: &'static str,
    pub requires: &'static [KeywordCategory],
    pub needs_condition: bool,
    pub needs_doc_hint: bool,
    pub action: PatternAction,
    pub confidence: f32,
}

pub(crate) static PATTERNS: &[PatternEntry] = &[
    PatternEntry {
        id: "extraction.document",
        requires: &[KeywordCategory::Extraction],
        needs_condition: false,
        needs_doc_hint: true,
        action: PatternAction::Fixed(ActionKind::Extract),
        confidence: 0.95,
    },
    PatternEntry {
        id: "extraction.generic",
        requires: &[KeywordCategory::Extraction],
        needs_condition: false,
        needs_doc_hint: false,
        action: PatternAction::Fixed(ActionKind::Extract),
        confidence: 0.85,
    },
    PatternEntry {
        id: "verification.document",
        requires: &[KeywordCategory::Verification],
        needs_condition: false,
        needs_doc_hint: true,
        action: PatternAction::Fixed(ActionKind::Verify),
        confidence: 0.92,
    },
    PatternEntry {
        id: "verification.generic",
        requires: &[KeywordCategory::Verification],
        needs_condition: false,
        needs_doc_hint: false,
        action: PatternAction::Fixed(ActionKind::Verify),
        confidence: 0.88,
    },
    PatternEntry {
        id: "options.external",
        requires: &[KeywordCategory::ExternalOptions],
        needs_condition: false,
        needs_doc_hint: false,
        action: PatternAction::Fixed(ActionKind::ExternalOptions),
        confidence: 0.90,
    },
    PatternEntry {
        id: "copy.value",
        requires: &[KeywordCategory::DataCopy],
        needs_condition: false,
        needs_doc_hint: false,
        action: PatternAction::Fixed(ActionKind::CopyValue),
        confidence: 0.88,
    },
    PatternEntry {
        id: "state.visibility.conditional",
        requires: &[KeywordCategory::Visibility],
        needs_condition: true,
        needs_doc_hint: false,
        action: PatternAction::FromConditionBranch,
        confidence: 0.92,
    },
    PatternEntry {
        id: "state.mandatory.conditional",
        requires: &[KeywordCategory::MandatoryControl],
        needs_condition: true,
        needs_doc_hint: false,
        action: PatternAction::FromConditionBranch,
        confidence: 0.90,
    },
    PatternEntry {
        id: "state.editability.conditional",
        requires: &[KeywordCategory::Editability],
        needs_condition: true,
        needs_doc_hint: false,
        action: PatternAction::FromConditionBranch,
        confidence: 0.88,
    },
    PatternEntry {
        id: "state.visibility.unconditional",
        requires: &[KeywordCategory::Visibility],
        needs_condition: false,
        needs_doc_hint: false,
        action: PatternAction::FromActionHint,
        confidence: 0.60,
    },
    PatternEntry {
        id: "state.mandatory.unconditional",
        requires: &[KeywordCategory::MandatoryControl],
        needs_condition: false,
        needs_doc_hint: false,
        action: PatternAction::FromActionHint,
        confidence: 0.60,
    },
    PatternEntry {
        id: "state.editability.unconditional",
        requires: &[KeywordCategory::Editability],
        needs_condition: false,
        needs_doc_hint: false,
        action: PatternAction::FromActionHint,
        confidence: 0.55,
    },
];

/// First table entry the annotation's shape satisfies, with the concrete
/// action it implies.
pub(crate) fn first_match(
    annotation: &ParsedAnnotation,
) -> Option<(&'static PatternEntry, ActionKind)> {
    for entry in PATTERNS {
        if !entry
            .requires
            .iter()
            .all(|cat| annotation.keywords.contains(cat))
        {
            continue;
        }
        if entry.needs_condition && annotation.clauses.is_empty() {
            continue;
        }
        if entry.needs_doc_hint && annotation.document_type_hint.is_none() {
            continue;
        }

        let action = match entry.action {
            PatternAction::Fixed(action) => Some(action),
            PatternAction::FromConditionBranch => {
                annotation.clauses.iter().find_map(|c| c.then_action)
            }
            PatternAction::FromActionHint => annotation.action_hints.iter().next().copied(),
        };
        if let Some(action) = action {
            return Some((entry, action));
        }
    }
    None
}

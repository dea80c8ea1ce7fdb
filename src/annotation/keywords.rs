//! Fixed keyword vocabulary for annotation classification.
//!
//! Word-boundary regex tables, compiled once. Category patterns decide
//! which rule families an annotation gestures at; action patterns map a
//! phrase (or a condition clause's then/otherwise branch) to a concrete
//! action kind. Order matters in the action table: negated and more
//! specific forms are listed before their general counterparts.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use formrule_types::ActionKind;

/// Vocabulary category an annotation keyword belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum KeywordCategory {
    Visibility,
    MandatoryControl,
    Editability,
    Verification,
    Extraction,
    ExternalOptions,
    DataCopy,
}

static CATEGORY_PATTERNS: LazyLock<Vec<(KeywordCategory, Regex)>> = LazyLock::new(|| {
    vec![
        (
            KeywordCategory::Visibility,
            Regex::new(r"(?i)\b(visible|invisible|hidden|hide|show|shown|display(ed)?)\b")
                .unwrap(),
        ),
        (
            KeywordCategory::MandatoryControl,
            Regex::new(r"(?i)\b(mandatory|required|compulsory|optional|non[- ]?mandatory)\b")
                .unwrap(),
        ),
        (
            KeywordCategory::Editability,
            Regex::new(
                r"(?i)\b(editable|read[- ]?only|readonly|non[- ]?editable|disabled?|enabled?|greyed out|locked)\b",
            )
            .unwrap(),
        ),
        (
            KeywordCategory::Verification,
            Regex::new(
                r"(?i)\b(verify|verified|verification|validated?|validation|cross[- ]?check(ed)?|match(es|ed)? against)\b",
            )
            .unwrap(),
        ),
        (
            KeywordCategory::Extraction,
            Regex::new(
                r"(?i)\b(extract(ed|ion)?|auto[- ]?fill(ed)?|auto[- ]?populated?|populated? from|fetch(ed)? from|ocr)\b",
            )
            .unwrap(),
        ),
        (
            KeywordCategory::ExternalOptions,
            Regex::new(
                r"(?i)\b(master|reference (table|list|data)|lookup table|external (table|list|source))\b",
            )
            .unwrap(),
        ),
        (
            KeywordCategory::DataCopy,
            Regex::new(r"(?i)\b(copy|copied|same as|prefill(ed)?( from)?|carry (over|forward))\b")
                .unwrap(),
        ),
    ]
});

static ACTION_PATTERNS: LazyLock<Vec<(Regex, ActionKind)>> = LazyLock::new(|| {
    vec![
        (
            Regex::new(r"(?i)\b(invisible|hidden|hide|not (be )?(visible|shown|displayed))\b")
                .unwrap(),
            ActionKind::MakeInvisible,
        ),
        (
            Regex::new(r"(?i)\b(visible|show|shown|displayed?)\b").unwrap(),
            ActionKind::MakeVisible,
        ),
        (
            Regex::new(r"(?i)\b(optional|non[- ]?mandatory|not (be )?(mandatory|required))\b")
                .unwrap(),
            ActionKind::MakeOptional,
        ),
        (
            Regex::new(r"(?i)\b(mandatory|required|compulsory)\b").unwrap(),
            ActionKind::MakeMandatory,
        ),
        (
            Regex::new(r"(?i)\b(read[- ]?only|readonly|non[- ]?editable|disabled|greyed out|locked)\b")
                .unwrap(),
            ActionKind::MakeReadonly,
        ),
        (
            Regex::new(r"(?i)\b(editable|enabled|unlocked)\b").unwrap(),
            ActionKind::MakeEditable,
        ),
        (
            Regex::new(r"(?i)\b(verify|verified|verification|validated?|validation)\b").unwrap(),
            ActionKind::Verify,
        ),
        (
            Regex::new(r"(?i)\b(extract(ed|ion)?|auto[- ]?fill(ed)?|auto[- ]?populated?|populated? from|ocr)\b")
                .unwrap(),
            ActionKind::Extract,
        ),
        (
            Regex::new(
                r"(?i)\b(master|reference (table|list|data)|lookup table|external (table|list|source))\b",
            )
            .unwrap(),
            ActionKind::ExternalOptions,
        ),
        (
            Regex::new(r"(?i)\b(copy|copied|same as|prefill(ed)?)\b").unwrap(),
            ActionKind::CopyValue,
        ),
    ]
});

/// Known source-document aliases, mapped to catalog document type codes.
static DOC_TYPE_ALIASES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?i)\bpan\b").unwrap(), "PAN_CARD"),
        (Regex::new(r"(?i)\baadha?ar\b").unwrap(), "AADHAAR"),
        (
            Regex::new(r"(?i)\b(certificate of incorporation|incorporation certificate|coi)\b")
                .unwrap(),
            "CERT_INCORPORATION",
        ),
        (
            Regex::new(r"(?i)\b(bank statement|cancelled cheque|passbook)\b").unwrap(),
            "BANK_STATEMENT",
        ),
        (Regex::new(r"(?i)\bphoto(graph)?\b").unwrap(), "PHOTOGRAPH"),
    ]
});

/// "options from the State Code master", "values from GSTIN_STATUS list".
static EXTERNAL_SOURCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\bfrom\s+(?:the\s+)?['"]?([A-Za-z0-9_][A-Za-z0-9_ ]*?)['"]?\s+(?:master|reference table|reference list|lookup table|table|list)\b"#,
    )
    .unwrap()
});

/// "same as 'Legal Name'", "copied from the Trade Name field".
static COPY_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b(?:same as|cop(?:y|ied)\s+from|prefill(?:ed)?\s+from|carry\s+forward\s+from)\s+(?:the\s+)?['"]?([^'".,;]+?)['"]?(?:\s+field)?\s*(?:[.,;]|$)"#,
    )
    .unwrap()
});

/// All vocabulary categories present in the text.
pub(crate) fn keyword_categories(text: &str) -> BTreeSet<KeywordCategory> {
    CATEGORY_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(cat, _)| *cat)
        .collect()
}

/// All action kinds hinted anywhere in the text.
pub(crate) fn action_hints(text: &str) -> BTreeSet<ActionKind> {
    ACTION_PATTERNS
        .iter()
        .filter(|(re, _)| re.is_match(text))
        .map(|(_, action)| *action)
        .collect()
}

/// The action a short branch phrase ("visible", "read only") maps to.
/// First pattern wins, so negated forms shadow their positive stems.
pub(crate) fn action_for_phrase(phrase: &str) -> Option<ActionKind> {
    ACTION_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(phrase))
        .map(|(_, action)| *action)
}

/// Catalog document-type code hinted by the text, if any.
pub(crate) fn document_type_hint(text: &str) -> Option<String> {
    DOC_TYPE_ALIASES
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, code)| (*code).to_string())
}

/// Named external data source for option-list annotations.
pub(crate) fn external_source(text: &str) -> Option<String> {
    EXTERNAL_SOURCE_RE
        .captures(text)
        .map(|c| c[1].trim().to_string())
}

/// Field references in copy/prefill directives.
pub(crate) fn copy_references(text: &str) -> Vec<String> {
    COPY_REF_RE
        .captures_iter(text)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_detected_with_word_boundaries() {
        let cats = keyword_categories("Field becomes visible and mandatory when GST applies");
        assert!(cats.contains(&KeywordCategory::Visibility));
        assert!(cats.contains(&KeywordCategory::MandatoryControl));
        assert!(!cats.contains(&KeywordCategory::Extraction));
    }

    #[test]
    fn invisible_does_not_trigger_visible() {
        assert_eq!(
            action_for_phrase("invisible"),
            Some(ActionKind::MakeInvisible)
        );
        assert_eq!(action_for_phrase("visible"), Some(ActionKind::MakeVisible));
        assert_eq!(
            action_for_phrase("not visible"),
            Some(ActionKind::MakeInvisible)
        );
    }

    #[test]
    fn doc_type_aliases_map_to_codes() {
        assert_eq!(
            document_type_hint("Auto-filled from the uploaded PAN card"),
            Some("PAN_CARD".to_string())
        );
        assert_eq!(
            document_type_hint("verified against Aadhar"),
            Some("AADHAAR".to_string())
        );
        assert_eq!(document_type_hint("nothing relevant"), None);
    }

    #[test]
    fn external_source_extracted_from_phrase() {
        assert_eq!(
            external_source("Dropdown values from the State Code master"),
            Some("State Code".to_string())
        );
        assert_eq!(
            external_source("options from GSTIN_STATUS list"),
            Some("GSTIN_STATUS".to_string())
        );
        assert_eq!(external_source("plain dropdown"), None);
    }

    #[test]
    fn copy_reference_extracted() {
        assert_eq!(
            copy_references("Same as 'Legal Name'."),
            vec!["Legal Name".to_string()]
        );
        assert_eq!(
            copy_references("Copied from the Trade Name field."),
            vec!["Trade Name".to_string()]
        );
    }
}

//! Error handling for the rule compiler.
//!
//! Errors split along the recovery boundary the compiler guarantees:
//! per-field, per-clause conditions (unresolved references, unmatched
//! annotations, missing mandatory slots) are *report items*, never `Err`s —
//! they are collected in [`crate::report::CompilationReport`] and do not
//! abort the document. The enums here cover the conditions that do abort:
//! catalog load failures (process-fatal), structural contract violations
//! (document-fatal), and transport failures from the semantic-resolution
//! capability (recovered by the matching pipeline, surfaced here only so
//! callers of the capability itself see typed errors).

use thiserror::Error;

use formrule_types::{GraphError, RuleId};

/// Top-level error type for the compiler.
#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("semantic resolution error: {0}")]
    Semantic(#[from] SemanticError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Load-time inconsistencies in the rule-template catalog.
///
/// These are fatal at process startup, before any document is compiled.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("template '{template_id}': duplicate ordinal {ordinal} in {slot_kind} slots")]
    DuplicateOrdinal {
        template_id: String,
        slot_kind: &'static str,
        ordinal: usize,
    },

    #[error(
        "template '{template_id}': {slot_kind} slot ordinals are not contiguous from 0 \
         (expected {expected}, found {found})"
    )]
    NonContiguousOrdinals {
        template_id: String,
        slot_kind: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("template '{template_id}': duplicate slot name '{slot}'")]
    DuplicateSlotName { template_id: String, slot: String },

    #[error("duplicate template id '{0}'")]
    DuplicateTemplateId(String),

    #[error("templates '{first}' and '{second}' both registered for ({action}, {doc_type:?})")]
    DuplicateTemplateKey {
        first: String,
        second: String,
        action: String,
        doc_type: Option<String>,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
}

/// Internal contract violations.
///
/// Raising one of these aborts compilation of the affected document; it
/// indicates a compiler bug, not bad input.
#[derive(Error, Debug)]
pub enum StructuralError {
    #[error(
        "rule {rule_id} built from template '{template_id}' has {found} destination ids, \
         template declares {expected}"
    )]
    DestinationArity {
        rule_id: RuleId,
        template_id: String,
        expected: usize,
        found: usize,
    },

    #[error("rule graph finalization failed: {0}")]
    Graph(#[from] GraphError),
}

/// Failures of the injected semantic-resolution capability.
///
/// The matching pipeline recovers from these (the field is marked
/// unmatched); they surface as `Err` only to direct callers of the
/// capability.
#[derive(Error, Debug)]
pub enum SemanticError {
    #[error("semantic resolution timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("semantic resolution transport failure: {0}")]
    Transport(String),

    #[error("semantic resolution returned an unusable response: {0}")]
    Malformed(String),
}

/// Convenience result alias used throughout the compiler.
pub type Result<T> = std::result::Result<T, CompilerError>;

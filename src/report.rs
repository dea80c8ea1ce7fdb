//! Itemized compilation report.
//!
//! Per-field failures are recovered locally (skip + log) and recorded here
//! rather than raised, so a caller always learns exactly which annotations
//! produced no rules and why. The report travels with the finalized graph
//! in [`crate::compiler::CompilationOutcome`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use formrule_types::{ActionKind, FieldId};

/// One recoverable failure, attached to the field whose annotation
/// triggered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompilationFailure {
    /// Neither the pattern catalog nor the semantic capability produced a
    /// usable match for a non-empty annotation.
    UnmatchedAnnotation {
        field_id: FieldId,
        field_name: String,
        detail: String,
    },

    /// A condition clause or copy directive referenced a field name that
    /// did not resolve against the document's field set.
    UnresolvedFieldReference { field_id: FieldId, reference: String },

    /// A multi-slot template declared a mandatory source slot that could
    /// not be resolved; the rule instance was not emitted.
    MissingMandatorySlot {
        field_id: FieldId,
        template_id: String,
        slot: String,
    },

    /// An action matched but the catalog has no template for the
    /// (action, source document type) pair.
    TemplateNotFound {
        field_id: FieldId,
        action: ActionKind,
        source_doc_type: Option<String>,
    },
}

impl CompilationFailure {
    pub fn field_id(&self) -> FieldId {
        match self {
            CompilationFailure::UnmatchedAnnotation { field_id, .. }
            | CompilationFailure::UnresolvedFieldReference { field_id, .. }
            | CompilationFailure::MissingMandatorySlot { field_id, .. }
            | CompilationFailure::TemplateNotFound { field_id, .. } => *field_id,
        }
    }
}

/// Summary of one compilation pass over a document's field set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationReport {
    pub run_id: Uuid,
    pub catalog_version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub fields_total: usize,
    /// Fields with a non-empty annotation that produced at least one rule.
    pub fields_matched: usize,
    pub rules_emitted: usize,
    pub failures: Vec<CompilationFailure>,
}

impl CompilationReport {
    pub fn new(catalog_version: impl Into<String>, fields_total: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            catalog_version: catalog_version.into(),
            started_at: Utc::now(),
            finished_at: None,
            fields_total,
            fields_matched: 0,
            rules_emitted: 0,
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, failure: CompilationFailure) {
        self.failures.push(failure);
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failures_for_field(&self, field_id: FieldId) -> impl Iterator<Item = &CompilationFailure> {
        self.failures.iter().filter(move |f| f.field_id() == field_id)
    }

    pub fn finish(&mut self, rules_emitted: usize) {
        self.rules_emitted = rules_emitted;
        self.finished_at = Some(Utc::now());
    }
}

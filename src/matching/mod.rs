//! Two-tier annotation → template matching.
//!
//! Tier 1 consults the deterministic pattern catalog; results below the
//! escalation threshold (or whose action has no catalog template) go to
//! Tier 2, the injected semantic-resolution capability, under a bounded
//! timeout. A Tier-2 answer is re-validated against the chosen template's
//! slot invariants exactly as a Tier-1 result would be — failure at any
//! point degrades to an unmatched outcome, never an error.

pub mod http;
mod patterns;
mod semantic;

pub use http::{HttpSemanticResolver, SemanticHttpConfig};
pub use semantic::{
    CandidateTemplate, FieldContext, SemanticRequest, SemanticResolution, SemanticResolver,
};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::annotation::ParsedAnnotation;
use crate::catalog::{RuleTemplate, SchemaCatalog};
use crate::config::MatchingConfig;
use formrule_types::{ActionKind, FieldDescriptor, FieldId};

/// Which tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Pattern,
    Semantic,
}

/// A resolved (annotation, template) pairing ready for assembly.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub template_id: String,
    pub action: ActionKind,
    pub confidence: f32,
    pub tier: MatchTier,
    /// Slot name → field id assignments supplied by the semantic
    /// capability. Empty for Tier-1 matches; builders resolve slots
    /// themselves where this is empty.
    pub slot_assignments: HashMap<String, FieldId>,
}

/// Why an annotation ended up unmatched.
#[derive(Debug, Clone)]
pub enum UnmatchedReason {
    /// No pattern entry applied and no semantic result was usable.
    NoPattern,
    /// A tier-1 action matched but the catalog has no template for it.
    TemplateNotFound {
        action: ActionKind,
        source_doc_type: Option<String>,
    },
    /// The semantic capability failed or timed out.
    SemanticFailed(String),
    /// The semantic capability answered, but the answer failed structural
    /// validation.
    SemanticRejected(String),
}

/// Outcome of matching one field's annotation.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Matched(MatchResult),
    Unmatched(UnmatchedReason),
    /// The field carries no annotation text; nothing to do, not a failure.
    NoAnnotation,
}

/// The two-tier matcher. One instance per compilation pass; Tier-2
/// outcomes are memoized for the life of the pass.
pub struct MatchingPipeline {
    catalog: Arc<SchemaCatalog>,
    config: MatchingConfig,
    semantic: Option<Arc<dyn SemanticResolver>>,
    memo: Mutex<HashMap<(FieldId, String), MatchOutcome>>,
}

impl MatchingPipeline {
    pub fn new(
        catalog: Arc<SchemaCatalog>,
        config: MatchingConfig,
        semantic: Option<Arc<dyn SemanticResolver>>,
    ) -> Self {
        Self {
            catalog,
            config,
            semantic,
            memo: Mutex::new(HashMap::new()),
        }
    }

    #[instrument(skip_all, fields(field = field.canonical_id))]
    pub async fn match_annotation(
        &self,
        annotation: &ParsedAnnotation,
        field: &FieldDescriptor,
    ) -> MatchOutcome {
        if field.annotation_text.trim().is_empty() {
            return MatchOutcome::NoAnnotation;
        }

        if let Some((entry, action)) = patterns::first_match(annotation) {
            if entry.confidence >= self.config.escalation_threshold {
                match self
                    .catalog
                    .find_template(action, annotation.document_type_hint.as_deref())
                {
                    Some(template) => {
                        debug!(pattern = entry.id, template = %template.template_id, "tier-1 match");
                        return MatchOutcome::Matched(MatchResult {
                            template_id: template.template_id.clone(),
                            action,
                            confidence: entry.confidence,
                            tier: MatchTier::Pattern,
                            slot_assignments: HashMap::new(),
                        });
                    }
                    None => {
                        debug!(pattern = entry.id, %action, "no template for tier-1 action, escalating");
                        return self
                            .escalate(
                                annotation,
                                field,
                                UnmatchedReason::TemplateNotFound {
                                    action,
                                    source_doc_type: annotation.document_type_hint.clone(),
                                },
                            )
                            .await;
                    }
                }
            }
            debug!(
                pattern = entry.id,
                confidence = entry.confidence,
                "tier-1 confidence below threshold, escalating"
            );
        }

        self.escalate(annotation, field, UnmatchedReason::NoPattern)
            .await
    }

    /// Tier-2: hand the annotation to the semantic capability, bounded by
    /// the configured timeout, and validate whatever comes back.
    async fn escalate(
        &self,
        annotation: &ParsedAnnotation,
        field: &FieldDescriptor,
        fallback: UnmatchedReason,
    ) -> MatchOutcome {
        let Some(resolver) = &self.semantic else {
            return MatchOutcome::Unmatched(fallback);
        };

        let key = (field.canonical_id, field.annotation_text.clone());
        if let Some(hit) = self.memo.lock().unwrap().get(&key) {
            return hit.clone();
        }

        let request = self.build_request(annotation, field);
        let timeout = Duration::from_secs(self.config.semantic_timeout_seconds);
        let outcome = match tokio::time::timeout(timeout, resolver.resolve(request)).await {
            Err(_) => {
                warn!(
                    field = field.canonical_id,
                    timeout_s = self.config.semantic_timeout_seconds,
                    "semantic resolution timed out"
                );
                MatchOutcome::Unmatched(UnmatchedReason::SemanticFailed(format!(
                    "timed out after {}s",
                    self.config.semantic_timeout_seconds
                )))
            }
            Ok(Err(e)) => {
                warn!(field = field.canonical_id, error = %e, "semantic resolution failed");
                MatchOutcome::Unmatched(UnmatchedReason::SemanticFailed(e.to_string()))
            }
            Ok(Ok(resolution)) => self.validate_resolution(resolution),
        };

        self.memo.lock().unwrap().insert(key, outcome.clone());
        outcome
    }

    fn build_request(
        &self,
        annotation: &ParsedAnnotation,
        field: &FieldDescriptor,
    ) -> SemanticRequest {
        // Offer templates for hinted actions when the annotation gave us
        // hints; otherwise the whole catalog.
        let candidates: Vec<CandidateTemplate> = if annotation.action_hints.is_empty() {
            self.catalog.templates().map(candidate_of).collect()
        } else {
            annotation
                .action_hints
                .iter()
                .flat_map(|&action| self.catalog.templates_for_action(action))
                .map(candidate_of)
                .collect()
        };

        SemanticRequest {
            annotation_text: field.annotation_text.clone(),
            field: FieldContext::from(field),
            candidate_templates: candidates,
        }
    }

    /// Structural validation of a Tier-2 answer — identical standards to a
    /// Tier-1 result: the template must exist, confidence must clear the
    /// floor, and every assigned slot name must belong to the template.
    fn validate_resolution(&self, resolution: SemanticResolution) -> MatchOutcome {
        let Some(template) = self.catalog.get(&resolution.template_id) else {
            return MatchOutcome::Unmatched(UnmatchedReason::SemanticRejected(format!(
                "unknown template '{}'",
                resolution.template_id
            )));
        };

        if resolution.confidence < self.config.semantic_confidence_floor {
            return MatchOutcome::Unmatched(UnmatchedReason::SemanticRejected(format!(
                "confidence {:.2} below floor {:.2}",
                resolution.confidence, self.config.semantic_confidence_floor
            )));
        }

        let slot_names = self
            .catalog
            .ordinal_map(&resolution.template_id)
            .unwrap_or_default();
        let total_slots = slot_names.len();
        if resolution.destination_slot_assignments.len() > total_slots {
            return MatchOutcome::Unmatched(UnmatchedReason::SemanticRejected(format!(
                "{} slot assignments for a template with {} slots",
                resolution.destination_slot_assignments.len(),
                total_slots
            )));
        }
        for name in resolution.destination_slot_assignments.keys() {
            if !slot_names.contains_key(name) {
                return MatchOutcome::Unmatched(UnmatchedReason::SemanticRejected(format!(
                    "assignment for unknown slot '{name}'"
                )));
            }
        }

        MatchOutcome::Matched(MatchResult {
            template_id: resolution.template_id,
            action: template.action,
            confidence: resolution.confidence,
            tier: MatchTier::Semantic,
            slot_assignments: resolution.destination_slot_assignments,
        })
    }
}

fn candidate_of(template: &RuleTemplate) -> CandidateTemplate {
    CandidateTemplate {
        template_id: template.template_id.clone(),
        action: template.action,
        source_doc_type: template.source_doc_type.clone(),
        destination_slots: template
            .destination_slots()
            .iter()
            .map(|s| s.name.clone())
            .collect(),
        mandatory_source_slots: template
            .source_slots()
            .iter()
            .filter(|s| s.mandatory)
            .map(|s| s.name.clone())
            .collect(),
    }
}

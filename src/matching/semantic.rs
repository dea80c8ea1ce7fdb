//! Semantic-resolution capability contract.
//!
//! Tier-2 of the matching pipeline is an injected, opaque capability —
//! possibly slow, possibly unavailable. It sees the annotation text, the
//! field's context, and the candidate templates, and answers with a chosen
//! template plus destination-slot assignments. Its output receives exactly
//! the same structural validation as a deterministic Tier-1 match; it has
//! no authoritative bypass.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SemanticError;
use formrule_types::{ActionKind, FieldDescriptor, FieldId, FieldType};

/// Context of the field whose annotation is being resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldContext {
    pub id: FieldId,
    pub display_name: String,
    pub declared_type: FieldType,
    pub panel: String,
}

impl From<&FieldDescriptor> for FieldContext {
    fn from(field: &FieldDescriptor) -> Self {
        Self {
            id: field.canonical_id,
            display_name: field.display_name.clone(),
            declared_type: field.declared_type,
            panel: field.panel.clone(),
        }
    }
}

/// A template offered to the capability as a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateTemplate {
    pub template_id: String,
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_doc_type: Option<String>,
    pub destination_slots: Vec<String>,
    pub mandatory_source_slots: Vec<String>,
}

/// Input contract of the capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticRequest {
    pub annotation_text: String,
    pub field: FieldContext,
    pub candidate_templates: Vec<CandidateTemplate>,
}

/// Output contract of the capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticResolution {
    pub template_id: String,
    /// Slot name → canonical field id.
    #[serde(default)]
    pub destination_slot_assignments: HashMap<String, FieldId>,
    pub confidence: f32,
}

/// The injected semantic-resolution capability.
#[async_trait]
pub trait SemanticResolver: Send + Sync {
    async fn resolve(&self, request: SemanticRequest) -> Result<SemanticResolution, SemanticError>;
}

//! Rule-template catalog.
//!
//! Loads the versioned template catalog from YAML (the embedded built-in
//! resource or an external file), validates its slot schemas, and indexes
//! templates by `(action, source document type)` for O(1) lookup and by
//! action alone for enumeration. Ordinal inconsistencies are load-time
//! failures — a catalog that passes loading cannot produce a rule with a
//! malformed destination array.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use smallvec::SmallVec;
use tracing::info;

use crate::error::CatalogError;
use formrule_types::ActionKind;

const BUILTIN_CATALOG: &str = include_str!("templates.yaml");

/// A named, ordered source position in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSlot {
    pub name: String,
    pub ordinal: usize,
    #[serde(default)]
    pub mandatory: bool,
}

/// A named, ordered destination position in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationSlot {
    pub name: String,
    pub ordinal: usize,
}

/// Slot schema per rule family. A closed set: every action kind maps onto
/// one of these variants, and each variant's schema is validated when the
/// catalog loads rather than at each use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum TemplateSpec {
    /// Conditional field-state change (visibility, mandatory, editability,
    /// value copy). One controlling source, one destination.
    ConditionalState,

    /// Cross-field verification over named source slots.
    Verification { source_slots: Vec<SourceSlot> },

    /// Document extraction: one upload source, ordinal-mapped destinations.
    Extraction {
        source_slot: SourceSlot,
        destination_slots: Vec<DestinationSlot>,
    },

    /// Option list fed from an external reference table.
    ExternalOptions,
}

/// One rule template from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTemplate {
    pub template_id: String,
    pub action: ActionKind,
    #[serde(default)]
    pub source_doc_type: Option<String>,
    #[serde(flatten)]
    pub spec: TemplateSpec,
}

impl RuleTemplate {
    /// Declared source slots, if this family has any.
    pub fn source_slots(&self) -> &[SourceSlot] {
        match &self.spec {
            TemplateSpec::Verification { source_slots } => source_slots,
            TemplateSpec::Extraction { source_slot, .. } => std::slice::from_ref(source_slot),
            _ => &[],
        }
    }

    /// Declared destination slots, if this family has any.
    pub fn destination_slots(&self) -> &[DestinationSlot] {
        match &self.spec {
            TemplateSpec::Extraction {
                destination_slots, ..
            } => destination_slots,
            _ => &[],
        }
    }

    /// Required length of a built instance's destination id array.
    pub fn destination_arity(&self) -> usize {
        match &self.spec {
            TemplateSpec::Extraction {
                destination_slots, ..
            } => destination_slots.len(),
            _ => 1,
        }
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let sources: Vec<(String, usize)> = self
            .source_slots()
            .iter()
            .map(|s| (s.name.clone(), s.ordinal))
            .collect();
        validate_slot_list(&self.template_id, "source", &sources)?;

        let destinations: Vec<(String, usize)> = self
            .destination_slots()
            .iter()
            .map(|s| (s.name.clone(), s.ordinal))
            .collect();
        validate_slot_list(&self.template_id, "destination", &destinations)?;
        Ok(())
    }
}

/// Ordinals within a slot list must be unique and contiguous from 0, and
/// slot names unique.
fn validate_slot_list(
    template_id: &str,
    slot_kind: &'static str,
    slots: &[(String, usize)],
) -> Result<(), CatalogError> {
    let mut seen_names = std::collections::HashSet::new();
    for (name, _) in slots {
        if !seen_names.insert(name.as_str()) {
            return Err(CatalogError::DuplicateSlotName {
                template_id: template_id.to_string(),
                slot: name.clone(),
            });
        }
    }

    let mut ordinals: Vec<usize> = slots.iter().map(|(_, o)| *o).collect();
    ordinals.sort_unstable();
    for pair in ordinals.windows(2) {
        if pair[0] == pair[1] {
            return Err(CatalogError::DuplicateOrdinal {
                template_id: template_id.to_string(),
                slot_kind,
                ordinal: pair[0],
            });
        }
    }
    for (expected, &found) in ordinals.iter().enumerate() {
        if found != expected {
            return Err(CatalogError::NonContiguousOrdinals {
                template_id: template_id.to_string(),
                slot_kind,
                expected,
                found,
            });
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    version: String,
    templates: Vec<RuleTemplate>,
}

/// Indexed, validated template catalog.
#[derive(Debug)]
pub struct SchemaCatalog {
    version: String,
    content_hash: String,
    templates: HashMap<String, RuleTemplate>,
    by_action_and_doc: HashMap<(ActionKind, Option<String>), String>,
    by_action: HashMap<ActionKind, SmallVec<[String; 4]>>,
}

impl SchemaCatalog {
    /// Load the embedded built-in catalog.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml(BUILTIN_CATALOG)
    }

    /// Load a catalog from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a catalog from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;

        let mut templates = HashMap::with_capacity(file.templates.len());
        let mut by_action_and_doc: HashMap<(ActionKind, Option<String>), String> = HashMap::new();
        let mut by_action: HashMap<ActionKind, SmallVec<[String; 4]>> = HashMap::new();

        for template in file.templates {
            template.validate()?;

            let key = (template.action, template.source_doc_type.clone());
            if let Some(existing) = by_action_and_doc.get(&key) {
                return Err(CatalogError::DuplicateTemplateKey {
                    first: existing.clone(),
                    second: template.template_id.clone(),
                    action: template.action.to_string(),
                    doc_type: template.source_doc_type.clone(),
                });
            }
            by_action_and_doc.insert(key, template.template_id.clone());
            by_action
                .entry(template.action)
                .or_default()
                .push(template.template_id.clone());

            if templates
                .insert(template.template_id.clone(), template.clone())
                .is_some()
            {
                return Err(CatalogError::DuplicateTemplateId(template.template_id));
            }
        }

        let content_hash = hex::encode(Sha256::digest(yaml.as_bytes()));
        info!(
            version = %file.version,
            templates = templates.len(),
            hash = %&content_hash[..12],
            "loaded rule-template catalog"
        );

        Ok(Self {
            version: file.version,
            content_hash,
            templates,
            by_action_and_doc,
            by_action,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Deterministic SHA-256 over the catalog source; changes exactly when
    /// the catalog content changes.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn get(&self, template_id: &str) -> Option<&RuleTemplate> {
        self.templates.get(template_id)
    }

    /// Find the template for an action and source document type. Falls back
    /// to the action's generic (no document type) template.
    pub fn find_template(
        &self,
        action: ActionKind,
        source_doc_type: Option<&str>,
    ) -> Option<&RuleTemplate> {
        if let Some(doc) = source_doc_type {
            if let Some(id) = self
                .by_action_and_doc
                .get(&(action, Some(doc.to_string())))
            {
                return self.templates.get(id);
            }
        }
        self.by_action_and_doc
            .get(&(action, None))
            .and_then(|id| self.templates.get(id))
    }

    /// Every template in the catalog, in no particular order.
    pub fn templates(&self) -> impl Iterator<Item = &RuleTemplate> {
        self.templates.values()
    }

    /// All templates registered for an action kind.
    pub fn templates_for_action(
        &self,
        action: ActionKind,
    ) -> impl Iterator<Item = &RuleTemplate> {
        self.by_action
            .get(&action)
            .into_iter()
            .flatten()
            .filter_map(|id| self.templates.get(id))
    }

    /// Slot-name → ordinal map for a template (sources and destinations;
    /// names are unique within a template).
    pub fn ordinal_map(&self, template_id: &str) -> Option<HashMap<String, usize>> {
        let template = self.templates.get(template_id)?;
        let mut map = HashMap::new();
        for slot in template.source_slots() {
            map.insert(slot.name.clone(), slot.ordinal);
        }
        for slot in template.destination_slots() {
            map.insert(slot.name.clone(), slot.ordinal);
        }
        Some(map)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

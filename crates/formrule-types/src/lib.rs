//! Shared data model for the formrule compiler.
//!
//! These types define the contract between the compiler and its
//! collaborators: the document-parsing stage that produces
//! [`FieldDescriptor`]s, and the downstream form-fill runtime that consumes
//! the serialized [`RuleGraph`]. Engine-internal types (parsed annotations,
//! match results, report items) live in the `formrule` crate; everything
//! here is part of the wire shape and is serde-derived.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Canonical identifier of a form field, assigned by the document parser.
pub type FieldId = i64;

/// Identifier of a compiled rule instance, allocated monotonically from 1.
pub type RuleId = i64;

/// Sentinel marking an ordinal destination position with no resolved field.
pub const UNMAPPED_FIELD: FieldId = -1;

/// Declared input type of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Dropdown,
    Checkbox,
    Radio,
    Upload,
}

/// One form field as extracted from the source requirement document.
///
/// Produced once by the external document-parsing collaborator and treated
/// as read-only by the compiler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub canonical_id: FieldId,
    pub display_name: String,
    pub declared_type: FieldType,
    /// Free-text business-logic annotation; may be empty.
    #[serde(default)]
    pub annotation_text: String,
    /// Panel / section grouping from the source document.
    #[serde(default)]
    pub panel: String,
}

impl FieldDescriptor {
    pub fn new(
        canonical_id: FieldId,
        display_name: impl Into<String>,
        declared_type: FieldType,
    ) -> Self {
        Self {
            canonical_id,
            display_name: display_name.into(),
            declared_type,
            annotation_text: String::new(),
            panel: String::new(),
        }
    }

    pub fn with_annotation(mut self, text: impl Into<String>) -> Self {
        self.annotation_text = text.into();
        self
    }

    pub fn with_panel(mut self, panel: impl Into<String>) -> Self {
        self.panel = panel.into();
        self
    }
}

/// Where a compiled rule executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Locality {
    Client,
    Server,
}

/// The action a rule performs when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    MakeVisible,
    MakeInvisible,
    MakeMandatory,
    MakeOptional,
    MakeEditable,
    MakeReadonly,
    CopyValue,
    Verify,
    Extract,
    ExternalOptions,
}

impl ActionKind {
    /// Logical inverse for paired conditional-state rules, where one exists.
    pub fn inverse(self) -> Option<ActionKind> {
        match self {
            ActionKind::MakeVisible => Some(ActionKind::MakeInvisible),
            ActionKind::MakeInvisible => Some(ActionKind::MakeVisible),
            ActionKind::MakeMandatory => Some(ActionKind::MakeOptional),
            ActionKind::MakeOptional => Some(ActionKind::MakeMandatory),
            ActionKind::MakeEditable => Some(ActionKind::MakeReadonly),
            ActionKind::MakeReadonly => Some(ActionKind::MakeEditable),
            _ => None,
        }
    }

    /// Whether rules of this kind are commutative over destination sets and
    /// may be merged by the consolidation pass.
    pub fn is_consolidatable(self) -> bool {
        matches!(
            self,
            ActionKind::MakeVisible
                | ActionKind::MakeInvisible
                | ActionKind::MakeMandatory
                | ActionKind::MakeOptional
                | ActionKind::MakeEditable
                | ActionKind::MakeReadonly
                | ActionKind::CopyValue
        )
    }

    /// Whether rules of this kind produce a field value that other rules may
    /// consume (the producer side of a trigger chain).
    pub fn is_producer(self) -> bool {
        matches!(self, ActionKind::Extract | ActionKind::CopyValue)
    }

    pub fn locality(self) -> Locality {
        match self {
            ActionKind::Verify | ActionKind::Extract | ActionKind::ExternalOptions => {
                Locality::Server
            }
            _ => Locality::Client,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::MakeVisible => "MAKE_VISIBLE",
            ActionKind::MakeInvisible => "MAKE_INVISIBLE",
            ActionKind::MakeMandatory => "MAKE_MANDATORY",
            ActionKind::MakeOptional => "MAKE_OPTIONAL",
            ActionKind::MakeEditable => "MAKE_EDITABLE",
            ActionKind::MakeReadonly => "MAKE_READONLY",
            ActionKind::CopyValue => "COPY_VALUE",
            ActionKind::Verify => "VERIFY",
            ActionKind::Extract => "EXTRACT",
            ActionKind::ExternalOptions => "EXTERNAL_OPTIONS",
        };
        f.write_str(s)
    }
}

/// Comparison operator as written in an annotation's condition clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
}

/// A condition clause extracted from an annotation, prior to assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Natural-language reference to the controlling field, unresolved.
    pub field_ref: String,
    pub operator: ConditionOperator,
    pub value: String,
}

/// Operator vocabulary of the downstream rule engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleOperator {
    In,
    NotIn,
}

impl RuleOperator {
    pub fn inverse(self) -> RuleOperator {
        match self {
            RuleOperator::In => RuleOperator::NotIn,
            RuleOperator::NotIn => RuleOperator::In,
        }
    }
}

impl From<ConditionOperator> for RuleOperator {
    fn from(op: ConditionOperator) -> Self {
        match op {
            ConditionOperator::Equals | ConditionOperator::Contains => RuleOperator::In,
            ConditionOperator::NotEquals => RuleOperator::NotIn,
        }
    }
}

/// Compiled condition block attached to a rule instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleCondition {
    pub operator: RuleOperator,
    pub values: Vec<String>,
}

impl RuleCondition {
    pub fn new(operator: RuleOperator, values: Vec<String>) -> Self {
        Self { operator, values }
    }

    /// Same values, inverted operator.
    pub fn inverted(&self) -> RuleCondition {
        RuleCondition {
            operator: self.operator.inverse(),
            values: self.values.clone(),
        }
    }
}

/// One compiled, executable rule.
///
/// Created by the assembler, mutated only by the chain linker (successor
/// appends) and the consolidator (destination union, duplicate removal),
/// then frozen into a [`RuleGraph`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleInstance {
    pub id: RuleId,
    /// Serialized as `actionKind`, the key the form-fill runtime reads.
    #[serde(rename = "actionKind")]
    pub action: ActionKind,
    /// The field whose annotation this rule was compiled from.
    pub field_id: FieldId,
    pub source_ids: Vec<FieldId>,
    /// Fixed length per template; unmapped ordinals carry [`UNMAPPED_FIELD`].
    pub destination_ids: Vec<FieldId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<RuleCondition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trigger_successors: Vec<RuleId>,
    pub locality: Locality,
    /// Extra payload, e.g. the external data-source name for option-list
    /// rules.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl RuleInstance {
    /// Append a trigger successor, ignoring duplicates.
    pub fn add_successor(&mut self, id: RuleId) {
        if !self.trigger_successors.contains(&id) {
            self.trigger_successors.push(id);
        }
    }

    /// Destination ids that resolved to real fields.
    pub fn mapped_destinations(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.destination_ids
            .iter()
            .copied()
            .filter(|&id| id != UNMAPPED_FIELD)
    }
}

/// Structural violation detected while freezing a rule graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("rule {rule_id} references trigger successor {successor_id}, which is not in the graph")]
    DanglingSuccessor { rule_id: RuleId, successor_id: RuleId },

    #[error("duplicate rule id {0}")]
    DuplicateRuleId(RuleId),
}

/// The finalized, ordered rule set for one document.
///
/// Construction validates the chain invariant: every id in any rule's
/// `trigger_successors` must resolve to a rule in the same graph. A dangling
/// reference here is an internal compiler bug, not a recoverable input
/// condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGraph {
    rules: Vec<RuleInstance>,
}

impl RuleGraph {
    pub fn try_new(rules: Vec<RuleInstance>) -> Result<Self, GraphError> {
        let mut ids = HashSet::with_capacity(rules.len());
        for rule in &rules {
            if !ids.insert(rule.id) {
                return Err(GraphError::DuplicateRuleId(rule.id));
            }
        }
        for rule in &rules {
            for &succ in &rule.trigger_successors {
                if !ids.contains(&succ) {
                    return Err(GraphError::DanglingSuccessor {
                        rule_id: rule.id,
                        successor_id: succ,
                    });
                }
            }
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[RuleInstance] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: RuleId) -> Option<&RuleInstance> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Rules compiled from a given field's annotation.
    pub fn rules_for_field(&self, field_id: FieldId) -> impl Iterator<Item = &RuleInstance> {
        self.rules.iter().filter(move |r| r.field_id == field_id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RuleInstance> {
        self.rules.iter()
    }
}

impl IntoIterator for RuleGraph {
    type Item = RuleInstance;
    type IntoIter = std::vec::IntoIter<RuleInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.into_iter()
    }
}

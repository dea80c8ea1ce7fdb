//! Field-reference resolution.
//!
//! Two-stage approach, in the manner of the fuzzy lookup services this
//! engine descends from:
//! 1. exact match on normalized names via a prebuilt index
//! 2. Jaro-Winkler ranking over all candidates, accepted only above a
//!    configurable similarity floor
//!
//! Resolution failure is a `None`, never an error — callers decide whether
//! an unresolved reference is fatal for their clause.

use std::collections::HashMap;

use unicode_normalization::UnicodeNormalization;

use crate::config::ResolverConfig;
use formrule_types::{FieldDescriptor, FieldId};

/// Normalize a field name or reference for comparison: NFKC, lowercased,
/// punctuation and underscores folded to single spaces. This makes slot
/// names like `pan_number` line up with display names like "PAN Number".
pub(crate) fn normalize(name: &str) -> String {
    let folded: String = name
        .nfkc()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Prebuilt lookup index over one document's field set.
#[derive(Debug)]
pub struct FieldIndex<'a> {
    fields: &'a [FieldDescriptor],
    by_name: HashMap<String, usize>,
    by_id: HashMap<FieldId, usize>,
}

impl<'a> FieldIndex<'a> {
    pub fn new(fields: &'a [FieldDescriptor]) -> Self {
        let mut by_name = HashMap::with_capacity(fields.len());
        let mut by_id = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            // First occurrence wins on name collisions.
            by_name.entry(normalize(&field.display_name)).or_insert(i);
            by_id.entry(field.canonical_id).or_insert(i);
        }
        Self {
            fields,
            by_name,
            by_id,
        }
    }

    pub fn fields(&self) -> &'a [FieldDescriptor] {
        self.fields
    }

    pub fn by_id(&self, id: FieldId) -> Option<&'a FieldDescriptor> {
        self.by_id.get(&id).map(|&i| &self.fields[i])
    }

    fn exact(&self, normalized: &str) -> Option<&'a FieldDescriptor> {
        self.by_name.get(normalized).map(|&i| &self.fields[i])
    }
}

/// Resolves natural-language field references to canonical fields.
#[derive(Debug, Clone)]
pub struct FieldResolver {
    config: ResolverConfig,
}

impl FieldResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Resolve a reference against the document's field set. Exact
    /// normalized match first; otherwise the best Jaro-Winkler candidate
    /// above the similarity floor, ties broken by shortest display name.
    pub fn resolve<'a>(
        &self,
        reference: &str,
        index: &FieldIndex<'a>,
    ) -> Option<&'a FieldDescriptor> {
        let needle = normalize(reference);
        if needle.is_empty() {
            return None;
        }

        if let Some(field) = index.exact(&needle) {
            return Some(field);
        }

        let mut best: Option<(&FieldDescriptor, f64)> = None;
        for field in index.fields() {
            let score = strsim::jaro_winkler(&needle, &normalize(&field.display_name));
            if score < self.config.similarity_floor {
                continue;
            }
            best = match best {
                None => Some((field, score)),
                Some((current, current_score)) => {
                    if score > current_score
                        || (score == current_score
                            && field.display_name.len() < current.display_name.len())
                    {
                        Some((field, score))
                    } else {
                        Some((current, current_score))
                    }
                }
            };
        }

        best.map(|(field, _)| field)
    }
}

impl Default for FieldResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

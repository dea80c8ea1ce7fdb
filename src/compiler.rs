//! Compilation orchestration.
//!
//! Ties the phases together for one document:
//!
//! 1. per-field: parse annotation → score → match (Tier-2 capable, so this
//!    phase is async and joined concurrently);
//! 2. per-field assembly, sequential in input order so instance ids are
//!    deterministic for a fixed input ordering;
//! 3. barrier passes over the whole rule set: chain linking, then
//!    consolidation;
//! 4. finalization, which freezes the graph and enforces the chain
//!    invariant.
//!
//! Per-field failures land in the report; only catalog, structural, and
//! finalization errors abort.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::annotation::{AnnotationParser, ParsedAnnotation};
use crate::assembler::{assemble, AssemblyContext};
use crate::catalog::SchemaCatalog;
use crate::config::CompilerConfig;
use crate::consolidate::consolidate;
use crate::error::{CompilerError, Result, StructuralError};
use crate::ids::IdAllocator;
use crate::linker::ChainLinker;
use crate::matching::{MatchOutcome, MatchingPipeline, SemanticResolver, UnmatchedReason};
use crate::report::{CompilationFailure, CompilationReport};
use crate::resolver::{FieldIndex, FieldResolver};
use formrule_types::{FieldDescriptor, RuleGraph, RuleInstance};

/// The finalized graph plus the itemized report of what did not compile.
#[derive(Debug)]
pub struct CompilationOutcome {
    pub graph: RuleGraph,
    pub report: CompilationReport,
}

/// The rule compiler. One instance may compile any number of documents;
/// each `compile` call is an independent pass with its own id sequence and
/// report.
pub struct RuleCompiler {
    catalog: Arc<SchemaCatalog>,
    config: CompilerConfig,
    parser: AnnotationParser,
    resolver: FieldResolver,
    semantic: Option<Arc<dyn SemanticResolver>>,
}

impl RuleCompiler {
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self::with_config(catalog, CompilerConfig::default())
    }

    pub fn with_config(catalog: Arc<SchemaCatalog>, config: CompilerConfig) -> Self {
        let resolver = FieldResolver::new(config.resolver.clone());
        Self {
            catalog,
            config,
            parser: AnnotationParser::new(),
            resolver,
            semantic: None,
        }
    }

    /// Inject the Tier-2 semantic-resolution capability.
    pub fn with_semantic_resolver(mut self, resolver: Arc<dyn SemanticResolver>) -> Self {
        self.semantic = Some(resolver);
        self
    }

    /// Compile one document's field set into a rule graph.
    #[instrument(skip_all, fields(fields = fields.len(), catalog = %self.catalog.version()))]
    pub async fn compile(&self, fields: &[FieldDescriptor]) -> Result<CompilationOutcome> {
        let mut report = CompilationReport::new(self.catalog.version(), fields.len());
        let index = FieldIndex::new(fields);
        let pipeline = MatchingPipeline::new(
            Arc::clone(&self.catalog),
            self.config.matching.clone(),
            self.semantic.clone(),
        );

        // Phase 1: parse annotations and score reference resolution.
        let annotations: Vec<ParsedAnnotation> = fields
            .iter()
            .map(|field| {
                let mut parsed = self.parser.parse(&field.annotation_text);
                let all_resolved = {
                    let mut refs = parsed.references().peekable();
                    refs.peek().is_some()
                        && parsed
                            .references()
                            .all(|r| self.resolver.resolve(r, &index).is_some())
                };
                if all_resolved {
                    parsed.mark_reference_resolved();
                }
                parsed
            })
            .collect();

        // Phase 2: match, concurrently but order-preserving.
        let outcomes = futures::future::join_all(
            fields
                .iter()
                .zip(&annotations)
                .map(|(field, annotation)| pipeline.match_annotation(annotation, field)),
        )
        .await;

        // Phase 3: assemble in input order with one id sequence.
        let ids = IdAllocator::new();
        let mut rules: Vec<RuleInstance> = Vec::new();
        for ((field, annotation), outcome) in fields.iter().zip(&annotations).zip(outcomes) {
            match outcome {
                MatchOutcome::NoAnnotation => {}
                MatchOutcome::Unmatched(reason) => record_unmatched(&mut report, field, reason),
                MatchOutcome::Matched(matched) => {
                    let Some(template) = self.catalog.get(&matched.template_id) else {
                        report.record(CompilationFailure::TemplateNotFound {
                            field_id: field.canonical_id,
                            action: matched.action,
                            source_doc_type: annotation.document_type_hint.clone(),
                        });
                        continue;
                    };
                    let ctx = AssemblyContext {
                        field,
                        annotation,
                        matched: &matched,
                        template,
                        index: &index,
                        resolver: &self.resolver,
                        ids: &ids,
                    };
                    let built = assemble(&ctx, &mut report)?;
                    if !built.is_empty() {
                        report.fields_matched += 1;
                    }
                    rules.extend(built);
                }
            }
        }

        // Barrier passes: both need the complete per-field rule set.
        ChainLinker::link(&mut rules);
        let rules = consolidate(rules);

        let graph = RuleGraph::try_new(rules)
            .map_err(|e| CompilerError::Structural(StructuralError::Graph(e)))?;
        report.finish(graph.len());
        info!(
            rules = graph.len(),
            matched = report.fields_matched,
            failures = report.failures.len(),
            "compilation finished"
        );
        Ok(CompilationOutcome { graph, report })
    }
}

fn record_unmatched(
    report: &mut CompilationReport,
    field: &FieldDescriptor,
    reason: UnmatchedReason,
) {
    let failure = match reason {
        UnmatchedReason::TemplateNotFound {
            action,
            source_doc_type,
        } => CompilationFailure::TemplateNotFound {
            field_id: field.canonical_id,
            action,
            source_doc_type,
        },
        UnmatchedReason::NoPattern => CompilationFailure::UnmatchedAnnotation {
            field_id: field.canonical_id,
            field_name: field.display_name.clone(),
            detail: "no pattern matched and no usable semantic resolution".to_string(),
        },
        UnmatchedReason::SemanticFailed(message) => CompilationFailure::UnmatchedAnnotation {
            field_id: field.canonical_id,
            field_name: field.display_name.clone(),
            detail: format!("semantic resolution failed: {message}"),
        },
        UnmatchedReason::SemanticRejected(message) => CompilationFailure::UnmatchedAnnotation {
            field_id: field.canonical_id,
            field_name: field.display_name.clone(),
            detail: format!("semantic resolution rejected: {message}"),
        },
    };
    report.record(failure);
}

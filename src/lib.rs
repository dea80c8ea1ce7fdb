//! formrule - business-logic annotation compiler for form-fill runtimes.
//!
//! Compiles field-level, free-text business-logic annotations into a
//! normalized, machine-executable rule graph. The pipeline for one
//! document:
//!
//! ```text
//! FieldDescriptor[] ── AnnotationParser ──► ParsedAnnotation (per field)
//!                          │
//!                          ▼
//!                  MatchingPipeline            tier 1: pattern catalog
//!                          │                   tier 2: semantic capability
//!                          ▼
//!                  RuleAssembler builders  ──► RuleInstance*
//!                          │
//!              ── barrier ─┼─ ChainLinker      producer → consumer edges
//!                          ├─ Consolidator     destination-set union, dedup
//!                          ▼
//!                      RuleGraph + CompilationReport
//! ```
//!
//! Per-field failures (unresolved references, unmatched annotations,
//! missing mandatory slots) are collected into the report and never abort
//! a document; catalog and structural errors do.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use formrule::{RuleCompiler, SchemaCatalog};
//!
//! let catalog = Arc::new(SchemaCatalog::builtin()?);
//! let compiler = RuleCompiler::new(catalog);
//! let outcome = compiler.compile(&fields).await?;
//! println!("{} rules, {} failures", outcome.graph.len(), outcome.report.failures.len());
//! ```

// Core error handling
pub mod error;

// Compilation report with itemized failures
pub mod report;

// Explicit configuration (similarity floor, escalation threshold, timeout)
pub mod config;

// Rule-instance identifier allocation
pub mod ids;

// Annotation parsing (keywords, condition clauses, document hints)
pub mod annotation;

// Rule-template catalog
pub mod catalog;

// Field-reference resolution
pub mod resolver;

// Two-tier annotation → template matching
pub mod matching;

// Builder family turning matches into rule instances
mod assembler;

// Barrier passes
pub mod consolidate;
pub mod linker;

// Orchestration
pub mod compiler;

pub use compiler::{CompilationOutcome, RuleCompiler};
pub use config::{CompilerConfig, MatchingConfig, ResolverConfig};
pub use error::{CatalogError, CompilerError, Result, SemanticError, StructuralError};
pub use report::{CompilationFailure, CompilationReport};

pub use annotation::{AnnotationParser, ParsedAnnotation};
pub use catalog::SchemaCatalog;
pub use ids::IdAllocator;
pub use matching::{
    HttpSemanticResolver, MatchOutcome, MatchResult, MatchTier, MatchingPipeline,
    SemanticHttpConfig, SemanticRequest, SemanticResolution, SemanticResolver,
};
pub use resolver::{FieldIndex, FieldResolver};

// Re-export the shared data model.
pub use formrule_types::{
    ActionKind, Condition, ConditionOperator, FieldDescriptor, FieldId, FieldType, GraphError,
    Locality, RuleCondition, RuleGraph, RuleId, RuleInstance, RuleOperator, UNMAPPED_FIELD,
};

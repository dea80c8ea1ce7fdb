//! End-to-end compilation scenarios over the public API.
//!
//! Each test compiles a small document field set and asserts the exact
//! structural shape of the resulting rule graph and report.

use std::sync::Arc;

use formrule::{
    ActionKind, CompilationFailure, FieldDescriptor, FieldType, RuleCompiler, RuleOperator,
    SchemaCatalog, UNMAPPED_FIELD,
};

fn catalog() -> Arc<SchemaCatalog> {
    init_tracing();
    Arc::new(SchemaCatalog::builtin().expect("builtin catalog loads"))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn field(id: i64, name: &str, ty: FieldType, annotation: &str) -> FieldDescriptor {
    FieldDescriptor::new(id, name, ty).with_annotation(annotation)
}

/// Scenario A: a conditional visibility annotation compiles to exactly the
/// stated rule and its inverse.
#[tokio::test]
async fn conditional_visibility_emits_paired_rules() {
    let fields = vec![
        field(10, "GST Option", FieldType::Dropdown, ""),
        field(
            20,
            "GSTIN",
            FieldType::Text,
            "if field 'GST Option' is 'Registered' then visible otherwise invisible",
        ),
    ];

    let outcome = RuleCompiler::new(catalog()).compile(&fields).await.unwrap();
    assert!(!outcome.report.has_failures());

    let rules = outcome.graph.rules();
    assert_eq!(rules.len(), 2);

    let visible = rules
        .iter()
        .find(|r| r.action == ActionKind::MakeVisible)
        .unwrap();
    assert_eq!(visible.source_ids, vec![10]);
    assert_eq!(visible.destination_ids, vec![20]);
    let cond = visible.condition.as_ref().unwrap();
    assert_eq!(cond.operator, RuleOperator::In);
    assert_eq!(cond.values, vec!["Registered".to_string()]);

    let invisible = rules
        .iter()
        .find(|r| r.action == ActionKind::MakeInvisible)
        .unwrap();
    assert_eq!(invisible.source_ids, vec![10]);
    assert_eq!(invisible.destination_ids, vec![20]);
    let cond = invisible.condition.as_ref().unwrap();
    assert_eq!(cond.operator, RuleOperator::NotIn);
    assert_eq!(cond.values, vec!["Registered".to_string()]);
}

/// Scenario B: two fields under an identical condition consolidate into
/// one rule whose destination set is the union.
#[tokio::test]
async fn identical_conditions_consolidate_destinations() {
    let fields = vec![
        field(10, "GST Option", FieldType::Dropdown, ""),
        field(
            21,
            "Trade Name",
            FieldType::Text,
            "if field 'GST Option' is 'Registered' then visible",
        ),
        field(
            22,
            "Legal Name",
            FieldType::Text,
            "if field 'GST Option' is 'Registered' then visible",
        ),
    ];

    let outcome = RuleCompiler::new(catalog()).compile(&fields).await.unwrap();
    let visible: Vec<_> = outcome
        .graph
        .rules()
        .iter()
        .filter(|r| r.action == ActionKind::MakeVisible)
        .collect();

    assert_eq!(visible.len(), 1, "expected one consolidated rule");
    assert_eq!(visible[0].source_ids, vec![10]);
    assert_eq!(visible[0].destination_ids, vec![21, 22]);
}

/// Scenario C: an extraction rule populating a field that a verification
/// rule reads gains a trigger-successor edge to it.
#[tokio::test]
async fn extraction_chains_into_verification() {
    let fields = vec![
        field(
            30,
            "PAN Upload",
            FieldType::Upload,
            "Auto-filled from the uploaded PAN card",
        ),
        field(31, "PAN Number", FieldType::Text, "Verified against PAN"),
        field(32, "Holder Name", FieldType::Text, ""),
    ];

    let outcome = RuleCompiler::new(catalog()).compile(&fields).await.unwrap();
    let rules = outcome.graph.rules();

    let extract = rules
        .iter()
        .find(|r| r.action == ActionKind::Extract)
        .expect("extraction rule emitted");
    let verify = rules
        .iter()
        .find(|r| r.action == ActionKind::Verify)
        .expect("verification rule emitted");

    // Ordinal invariant: pan_number → 31, holder_name → 32,
    // date_of_birth unmapped.
    assert_eq!(extract.source_ids, vec![30]);
    assert_eq!(extract.destination_ids, vec![31, 32, UNMAPPED_FIELD]);

    assert_eq!(verify.source_ids, vec![31, 32]);
    assert!(extract.trigger_successors.contains(&verify.id));
}

/// Scenario D: a two-source verification where one mandatory source is
/// missing emits nothing and reports the unresolved slot by name.
#[tokio::test]
async fn missing_mandatory_slot_is_reported_not_emitted() {
    let fields = vec![field(
        40,
        "Account Number",
        FieldType::Text,
        "Verified against the bank statement",
    )];

    let outcome = RuleCompiler::new(catalog()).compile(&fields).await.unwrap();
    assert_eq!(outcome.graph.len(), 0);

    assert!(matches!(
        outcome.report.failures.as_slice(),
        [CompilationFailure::MissingMandatorySlot {
            field_id: 40,
            slot,
            ..
        }] if slot == "ifsc_code"
    ));
}

/// Compiling the same input twice yields structurally identical graphs,
/// ids included.
#[tokio::test]
async fn compilation_is_deterministic() {
    let fields = vec![
        field(10, "GST Option", FieldType::Dropdown, ""),
        field(
            20,
            "GSTIN",
            FieldType::Text,
            "if field 'GST Option' is 'Registered' then visible otherwise invisible",
        ),
        field(
            30,
            "PAN Upload",
            FieldType::Upload,
            "Auto-filled from the uploaded PAN card",
        ),
        field(31, "PAN Number", FieldType::Text, "Verified against PAN"),
        field(32, "Holder Name", FieldType::Text, "Same as 'Legal Name'."),
        field(22, "Legal Name", FieldType::Text, ""),
    ];

    let compiler = RuleCompiler::new(catalog());
    let first = compiler.compile(&fields).await.unwrap();
    let second = compiler.compile(&fields).await.unwrap();

    assert_eq!(first.graph, second.graph);
}

/// Unmatchable annotations are reported per field and never abort the
/// document; annotation-free fields are not failures.
#[tokio::test]
async fn unmatched_annotations_are_reported_per_field() {
    let fields = vec![
        field(1, "Email", FieldType::Text, ""),
        field(2, "Remarks", FieldType::Text, "Applicant must sing the anthem"),
        field(
            10,
            "GST Option",
            FieldType::Dropdown,
            "",
        ),
        field(
            20,
            "GSTIN",
            FieldType::Text,
            "if field 'GST Option' is 'Registered' then mandatory",
        ),
    ];

    let outcome = RuleCompiler::new(catalog()).compile(&fields).await.unwrap();

    // The good annotation still compiled.
    assert_eq!(outcome.graph.len(), 1);
    assert_eq!(outcome.report.fields_matched, 1);

    // The gibberish one is itemized, attached to its field.
    let failures: Vec<_> = outcome.report.failures_for_field(2).collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0],
        CompilationFailure::UnmatchedAnnotation { field_id: 2, .. }
    ));
    // Empty annotations produced no failures.
    assert_eq!(outcome.report.failures_for_field(1).count(), 0);
}

/// The chain invariant holds on every finalized graph: all successor ids
/// resolve within the graph.
#[tokio::test]
async fn finalized_graph_has_no_dangling_successors() {
    let fields = vec![
        field(
            30,
            "PAN Upload",
            FieldType::Upload,
            "Auto-filled from the uploaded PAN card",
        ),
        field(31, "PAN Number", FieldType::Text, "Verified against PAN"),
        field(32, "Holder Name", FieldType::Text, ""),
        field(
            33,
            "Aadhaar Upload",
            FieldType::Upload,
            "Auto-populated from Aadhaar",
        ),
        field(34, "Aadhaar Number", FieldType::Text, "Validated against Aadhaar"),
    ];

    let outcome = RuleCompiler::new(catalog()).compile(&fields).await.unwrap();
    let graph = &outcome.graph;
    for rule in graph.rules() {
        for succ in &rule.trigger_successors {
            assert!(
                graph.get(*succ).is_some(),
                "rule {} references missing successor {}",
                rule.id,
                succ
            );
        }
    }
}

/// Catalogs load from external files too, with identical validation.
#[test]
fn catalog_loads_from_file() {
    let yaml = r#"
version: "file-test"
templates:
  - template_id: state.visibility
    action: MAKE_VISIBLE
    family: conditional_state
"#;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("templates.yaml");
    std::fs::write(&path, yaml).unwrap();

    let catalog = SchemaCatalog::load(&path).unwrap();
    assert_eq!(catalog.version(), "file-test");
    assert!(catalog
        .find_template(ActionKind::MakeVisible, None)
        .is_some());
}

//! Tests for calculated-field evaluation over a whole entity

use fieldcalc::prelude::*;
use fieldcalc::{EvalError, FormulaError};
use pretty_assertions::assert_eq;

fn invoice_fields() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition::new("price", FieldType::Number),
        FieldDefinition::new("qty", FieldType::Number),
        FieldDefinition::new("discount", FieldType::Number).with_default(0),
        // Declared before the fields it depends on
        FieldDefinition::calculated("grand_total", "net + tax"),
        FieldDefinition::calculated("tax", "net * 0.25"),
        FieldDefinition::calculated("net", "price * qty - discount"),
        FieldDefinition::new("notes", FieldType::Text),
    ]
}

fn values(pairs: &[(&str, Value)]) -> FieldValues {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Test dependency-ordered evaluation
#[test]
fn test_evaluate_project_formulas() {
    let service = FormulaService::new();
    let vals = values(&[("price", 20.into()), ("qty", 3.into())]);

    let calculated = service
        .evaluate_project_formulas(&invoice_fields(), &vals)
        .unwrap();

    assert_eq!(
        calculated.field_ids().collect::<Vec<_>>(),
        vec!["net", "tax", "grand_total"]
    );
    assert_eq!(calculated.get("net"), Some(&Value::Number(60.0)));
    assert_eq!(calculated.get("tax"), Some(&Value::Number(15.0)));
    assert_eq!(calculated.get("grand_total"), Some(&Value::Number(75.0)));
    assert_eq!(calculated.get("price"), None);
}

/// Test the total/double example ordering
#[test]
fn test_calculation_order() {
    let fields = vec![
        FieldDefinition::calculated("double", "total * 2"),
        FieldDefinition::calculated("total", "field1 + field2"),
        FieldDefinition::new("field1", FieldType::Number),
        FieldDefinition::new("field2", FieldType::Number),
    ];
    let service = FormulaService::new();
    assert_eq!(
        service.calculation_order(&fields).unwrap(),
        vec!["total", "double"]
    );

    let calculated = service
        .evaluate_project_formulas(
            &fields,
            &values(&[("field1", 1.into()), ("field2", 2.into())]),
        )
        .unwrap();
    assert_eq!(
        calculated.into_iter().collect::<Vec<_>>(),
        vec![
            ("total".to_string(), Value::Number(3.0)),
            ("double".to_string(), Value::Number(6.0)),
        ]
    );
}

/// Test that supplied values for calculated fields are recomputed
#[test]
fn test_stale_calculated_value_is_replaced() {
    let service = FormulaService::new();
    let vals = values(&[("price", 1.into()), ("qty", 1.into()), ("net", 999.into())]);
    let calculated = service
        .evaluate_project_formulas(&invoice_fields(), &vals)
        .unwrap();
    assert_eq!(calculated.get("net"), Some(&Value::Number(1.0)));
    assert_eq!(calculated.get("grand_total"), Some(&Value::Number(1.25)));
}

/// Test that missing inputs start from their default value
#[test]
fn test_missing_fields_are_seeded() {
    let fields = vec![
        FieldDefinition::new("nickname", FieldType::Text),
        FieldDefinition::calculated("display", "coalesce(nickname, 'anonymous')"),
    ];
    let calculated = FormulaService::new()
        .evaluate_project_formulas(&fields, &FieldValues::new())
        .unwrap();
    assert_eq!(calculated.get("display"), Some(&Value::string("anonymous")));
}

/// Test circular dependency detection
#[test]
fn test_circular_dependency() {
    let fields = vec![
        FieldDefinition::calculated("a", "b"),
        FieldDefinition::calculated("b", "a"),
    ];
    let err = FormulaService::new()
        .evaluate_project_formulas(&fields, &FieldValues::new())
        .unwrap_err();

    assert_eq!(err.cycles(), Some(&["a -> b -> a".to_string()][..]));
    assert_eq!(
        err.to_string(),
        "Circular dependency detected: a -> b -> a"
    );
}

/// Test that the first failing field aborts the batch
#[test]
fn test_field_failure_aborts_batch() {
    let fields = vec![
        FieldDefinition::new("x", FieldType::Number),
        FieldDefinition::calculated("ratio", "10 / x"),
        FieldDefinition::calculated("after", "ratio + 1"),
    ];
    let err = FormulaService::new()
        .evaluate_project_formulas(&fields, &values(&[("x", 0.into())]))
        .unwrap_err();

    assert_eq!(err.field(), Some("ratio"));
    match err {
        Error::FieldEvaluation { source, .. } => {
            assert_eq!(source, FormulaError::Evaluation(EvalError::DivisionByZero));
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// Test that a malformed formula names its field
#[test]
fn test_parse_failure_names_field() {
    let fields = vec![FieldDefinition::calculated("broken", "1 +")];
    let err = FormulaService::new()
        .evaluate_project_formulas(&fields, &FieldValues::new())
        .unwrap_err();
    assert_eq!(err.field(), Some("broken"));
}

/// Test schema validation
#[test]
fn test_duplicate_field_ids_rejected() {
    let fields = vec![
        FieldDefinition::new("a", FieldType::Number),
        FieldDefinition::calculated("a", "1"),
    ];
    let err = FormulaService::new().calculation_order(&fields).unwrap_err();
    assert!(matches!(
        err,
        Error::Core(fieldcalc_core::Error::DuplicateFieldId(ref id)) if id == "a"
    ));
}

/// Test affected-field recalculation
#[test]
fn test_fields_affected_by() {
    let service = FormulaService::new();
    let fields = invoice_fields();

    assert_eq!(
        service.fields_affected_by(&fields, &["qty"]).unwrap(),
        vec!["net", "tax", "grand_total"]
    );
    assert_eq!(
        service.fields_affected_by(&fields, &["tax"]).unwrap(),
        vec!["grand_total"]
    );
    assert!(service
        .fields_affected_by(&fields, &["notes"])
        .unwrap()
        .is_empty());
}

/// Test that host functions are visible to calculated fields
#[test]
fn test_registered_function_in_project() {
    let mut service = FormulaService::new();
    service.register_function("percent", |args: &[Value]| match args {
        [Value::Number(part), Value::Number(whole)] if *whole != 0.0 => {
            Ok(Value::Number(part / whole * 100.0))
        }
        _ => Err("percent expects two numbers and a non-zero whole".to_string()),
    });

    let fields = vec![
        FieldDefinition::new("done", FieldType::Number),
        FieldDefinition::new("all", FieldType::Number),
        FieldDefinition::calculated("progress", "percent(done, all)"),
    ];
    let calculated = service
        .evaluate_project_formulas(&fields, &values(&[("done", 1.into()), ("all", 4.into())]))
        .unwrap();
    assert_eq!(calculated.get("progress"), Some(&Value::Number(25.0)));

    let err = service
        .evaluate_project_formulas(&fields, &values(&[("done", 1.into()), ("all", 0.into())]))
        .unwrap_err();
    assert!(err.to_string().contains("percent"));
}

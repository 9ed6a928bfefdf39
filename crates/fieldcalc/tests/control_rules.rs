//! Tests for control rule evaluation

use fieldcalc::prelude::*;
use pretty_assertions::assert_eq;

fn values(pairs: &[(&str, Value)]) -> FieldValues {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn rule(id: &str, condition: &str, effect: ControlEffect, priority: i32) -> ControlRule {
    ControlRule::new(id, condition, effect).with_priority(priority)
}

/// Test that both matching effects are returned and conflicts resolve to the higher priority
#[test]
fn test_same_target_priorities() {
    let show = ControlEffect::new(ControlType::Visibility, "spouse_name", true);
    let hide = ControlEffect::new(ControlType::Visibility, "spouse_name", false);
    let rules = vec![
        rule("hide_single", "status != 'married'", hide.clone(), 5),
        rule("show_married", "has_partner", show.clone(), 10),
    ];
    let vals = values(&[
        ("status", Value::string("single")),
        ("has_partner", true.into()),
    ]);

    let result = fieldcalc::evaluate_rules(&rules, &vals);
    assert!(result.errors.is_empty());
    assert_eq!(result.effects, vec![show.clone(), hide]);

    let resolved = ControlEffectEvaluator::resolve_conflicts(&result.effects);
    assert_eq!(resolved, vec![show]);
}

/// Test that a failing condition does not stop other rules
#[test]
fn test_failure_is_non_fatal() {
    let rules = vec![
        rule(
            "bad",
            "unknown_field == 1",
            ControlEffect::new(ControlType::Enabled, "a", false),
            100,
        ),
        rule(
            "good",
            "age < 18",
            ControlEffect::new(ControlType::Enabled, "alcohol", false),
            1,
        ),
    ];
    let result = fieldcalc::evaluate_rules(&rules, &values(&[("age", 16.into())]));

    assert_eq!(
        result.effects,
        vec![ControlEffect::new(ControlType::Enabled, "alcohol", false)]
    );
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("bad"));
    assert!(result.errors[0].contains("unknown_field"));
}

/// Test the non-short-circuit logical operators in conditions
#[test]
fn test_logical_operators_evaluate_both_sides() {
    let effect = ControlEffect::new(ControlType::Visibility, "x", true);
    let rules = vec![rule("guarded", "false and missing", effect, 0)];
    let result = fieldcalc::evaluate_rules(&rules, &FieldValues::new());

    assert!(result.effects.is_empty());
    assert_eq!(result.errors.len(), 1);
}

/// Test calculated values feeding rule conditions
#[test]
fn test_rules_over_calculated_values() {
    let fields = vec![
        FieldDefinition::new("income", FieldType::Number),
        FieldDefinition::calculated("tax", "income * 0.3"),
    ];
    let mut vals = values(&[("income", 100000.into())]);
    let calculated = FormulaService::new()
        .evaluate_project_formulas(&fields, &vals)
        .unwrap();
    vals.extend(calculated);

    let rules = vec![
        rule(
            "high_tax",
            "tax > 20000",
            ControlEffect::new(ControlType::SetValue, "bracket", "high"),
            0,
        ),
        rule(
            "lock",
            "tax > 20000",
            ControlEffect::new(ControlType::Enabled, "bracket", false),
            0,
        ),
    ];
    let result = fieldcalc::evaluate_rules(&rules, &vals);
    let states = ControlEffectEvaluator::field_states(&result.effects);

    assert_eq!(
        states.get("bracket"),
        Some(&FieldUiState {
            visible: true,
            enabled: false,
            value_override: Some(Value::string("high")),
        })
    );
}

//! # fieldcalc
//!
//! Formula evaluation for form-based entities.
//!
//! fieldcalc evaluates a small expression language over a snapshot of field
//! values. On top of single-formula evaluation it provides:
//!
//! - Calculated fields, evaluated once each in dependency order
//! - Circular dependency detection naming the cycle
//! - Prioritized condition rules producing UI effects (visibility, enabled, value)
//! - Built-in functions plus host-registered native functions
//!
//! ## Example
//!
//! ```rust
//! use fieldcalc::prelude::*;
//!
//! let mut values = FieldValues::new();
//! values.insert("field1".into(), Value::Number(10.0));
//! values.insert("field2".into(), Value::Number(5.0));
//!
//! assert_eq!(
//!     fieldcalc::evaluate_formula("field1 + field2 * 2", &values).unwrap(),
//!     Value::Number(20.0)
//! );
//!
//! let deps = fieldcalc::get_field_dependencies("field1 + field2").unwrap();
//! assert_eq!(deps.len(), 2);
//!
//! let rules = vec![ControlRule::new(
//!     "big",
//!     "field1 > 5",
//!     ControlEffect::new(ControlType::Visibility, "details", true),
//! )];
//! let result = fieldcalc::evaluate_rules(&rules, &values);
//! assert_eq!(result.effects.len(), 1);
//! ```

pub mod control;
pub mod error;
pub mod prelude;
pub mod service;

use std::collections::BTreeSet;

pub use control::ControlEffectEvaluator;
pub use error::{Error, Result};
pub use service::{CalculatedValues, CalculationOptions, FormulaService, FormulaValidation};

// Re-export core types
pub use fieldcalc_core::{
    validate_field_ids, ControlEffect, ControlRule, ControlType, EvaluationResult,
    FieldDefinition, FieldType, FieldUiState, FieldValues, Value,
};

// Re-export formula types
pub use fieldcalc_formula::{
    build_graph, evaluate, parse_formula, DependencyGraph, EvalError, EvaluationContext,
    FormulaError, FormulaExpr, FormulaResult, FunctionTable,
};

/// Evaluate a formula with the built-in functions
pub fn evaluate_formula(formula: &str, values: &FieldValues) -> Result<Value> {
    let ast = parse_formula(formula)?;
    let ctx = EvaluationContext::with_builtins(values);
    Ok(evaluate(&ast, &ctx)?)
}

/// Fields referenced by a formula; blank text has no dependencies
pub fn get_field_dependencies(formula: &str) -> Result<BTreeSet<String>> {
    if formula.trim().is_empty() {
        return Ok(BTreeSet::new());
    }
    Ok(fieldcalc_formula::extract_dependencies(&parse_formula(formula)?))
}

/// Evaluate control rules with the built-in functions
pub fn evaluate_rules(rules: &[ControlRule], values: &FieldValues) -> EvaluationResult {
    ControlEffectEvaluator::new().evaluate_rules(rules, values)
}

//! Rule-driven UI effects
//!
//! A [`ControlRule`] pairs a boolean condition formula with a
//! [`ControlEffect`]. [`ControlEffectEvaluator::evaluate_rules`] collects the
//! effects of every enabled rule whose condition holds, highest priority first.
//! Conflicting effects are kept; [`ControlEffectEvaluator::resolve_conflicts`]
//! is a separate step.

use fieldcalc_core::{ControlEffect, ControlRule, EvaluationResult, FieldUiState, FieldValues};
use fieldcalc_formula::{
    evaluate_condition, parse_formula, EvaluationContext, FormulaResult, FunctionTable,
};
use std::collections::{BTreeMap, HashSet};

/// Evaluates control rules against field values
#[derive(Debug, Clone)]
pub struct ControlEffectEvaluator {
    functions: FunctionTable,
}

impl Default for ControlEffectEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlEffectEvaluator {
    /// Create an evaluator using the built-in functions
    pub fn new() -> Self {
        Self::with_functions(FunctionTable::builtins().clone())
    }

    /// Create an evaluator using the given function table
    pub fn with_functions(functions: FunctionTable) -> Self {
        Self { functions }
    }

    /// Functions available to rule conditions
    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Evaluate rules in descending priority order
    ///
    /// Rules with equal priority keep their input order. Disabled rules are
    /// skipped. A rule whose condition fails to parse, fails to evaluate or
    /// does not yield a boolean is recorded in `errors` and the remaining rules
    /// are still evaluated.
    pub fn evaluate_rules(&self, rules: &[ControlRule], values: &FieldValues) -> EvaluationResult {
        let mut ordered: Vec<&ControlRule> = rules.iter().filter(|rule| rule.enabled).collect();
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut result = EvaluationResult::default();
        for rule in ordered {
            match self.check_condition(&rule.condition, values) {
                Ok(true) => {
                    tracing::trace!("Rule '{}' matched", rule.id);
                    result.effects.push(rule.effect.clone());
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Rule '{}' failed: {}", rule.id, e);
                    result
                        .errors
                        .push(format!("Error evaluating rule '{}': {}", rule.id, e));
                }
            }
        }

        tracing::debug!(
            "Evaluated {} rules: {} effects, {} errors",
            rules.len(),
            result.effects.len(),
            result.errors.len()
        );
        result
    }

    fn check_condition(&self, condition: &str, values: &FieldValues) -> FormulaResult<bool> {
        let ast = parse_formula(condition)?;
        let ctx = EvaluationContext::new(values, &self.functions);
        evaluate_condition(&ast, &ctx)
    }

    /// Keep only the first effect for each target field
    ///
    /// Applied to the output of [`evaluate_rules`](Self::evaluate_rules) this
    /// keeps the effect of the highest priority rule.
    pub fn resolve_conflicts(effects: &[ControlEffect]) -> Vec<ControlEffect> {
        let mut seen = HashSet::new();
        effects
            .iter()
            .filter(|effect| seen.insert(effect.target_field_id.as_str()))
            .cloned()
            .collect()
    }

    /// Fold effects into the UI state of each targeted field
    ///
    /// Effects are applied in order, so later effects win when they target
    /// the same aspect of a field. Fields no effect targets are absent.
    pub fn field_states(effects: &[ControlEffect]) -> BTreeMap<String, FieldUiState> {
        let mut states: BTreeMap<String, FieldUiState> = BTreeMap::new();
        for effect in effects {
            states
                .entry(effect.target_field_id.clone())
                .or_default()
                .apply(effect);
        }
        states
    }
}

//! Calculated-field evaluation
//!
//! [`FormulaService`] evaluates single formulas and whole entities: every
//! calculated field is evaluated once, in dependency order, against a snapshot
//! of the entity's current field values.
//!
//! # Example
//!
//! ```rust
//! use fieldcalc::prelude::*;
//!
//! let fields = vec![
//!     FieldDefinition::new("price", FieldType::Number),
//!     FieldDefinition::new("qty", FieldType::Number),
//!     FieldDefinition::calculated("total", "price * qty"),
//!     FieldDefinition::calculated("with_tax", "total * 1.2"),
//! ];
//!
//! let mut values = FieldValues::new();
//! values.insert("price".into(), Value::Number(10.0));
//! values.insert("qty".into(), Value::Number(3.0));
//!
//! let service = FormulaService::new();
//! let calculated = service.evaluate_project_formulas(&fields, &values).unwrap();
//!
//! assert_eq!(calculated.field_ids().collect::<Vec<_>>(), vec!["total", "with_tax"]);
//! assert_eq!(calculated.get("total"), Some(&Value::Number(30.0)));
//! ```

use crate::{Error, Result};
use fieldcalc_core::{validate_field_ids, FieldDefinition, FieldValues, Value};
use fieldcalc_formula::{
    evaluate, extract_dependencies, parse_formula, DependencyGraph, DependencyGraphBuilder,
    EvaluationContext, FormulaError, FormulaExpr, FunctionResult, FunctionTable,
};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Options for calculated-field evaluation
#[derive(Debug, Clone)]
pub struct CalculationOptions {
    /// Start from the built-in function table (default: true)
    pub include_builtin_functions: bool,
    /// Fields without a supplied value enter the snapshot with their default value
    /// (default: true). When disabled, formulas referencing them fail.
    pub seed_missing_fields: bool,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            include_builtin_functions: true,
            seed_missing_fields: true,
        }
    }
}

/// Calculated values in evaluation order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalculatedValues {
    entries: IndexMap<String, Value>,
}

impl CalculatedValues {
    /// Value calculated for a field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.entries.get(field)
    }

    /// Whether the field was calculated
    pub fn contains_key(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    /// Field ids in evaluation order
    pub fn field_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over `(field id, value)` in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.entries.iter().map(|(id, value)| (id.as_str(), value))
    }

    /// Number of calculated fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was calculated
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, field: String, value: Value) {
        self.entries.insert(field, value);
    }
}

impl IntoIterator for CalculatedValues {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Outcome of [`FormulaService::validate_formula`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormulaValidation {
    /// Every field the formula references
    pub dependencies: BTreeSet<String>,
    /// Referenced fields missing from the known set, sorted
    pub unknown_fields: Vec<String>,
}

impl FormulaValidation {
    /// Whether every reference is known
    pub fn is_valid(&self) -> bool {
        self.unknown_fields.is_empty()
    }
}

/// Formula evaluation service
#[derive(Debug, Clone)]
pub struct FormulaService {
    functions: FunctionTable,
    options: CalculationOptions,
}

impl Default for FormulaService {
    fn default() -> Self {
        Self::new()
    }
}

impl FormulaService {
    /// Create a service with default options and the built-in functions
    pub fn new() -> Self {
        Self::with_options(CalculationOptions::default())
    }

    /// Create a service with custom options
    pub fn with_options(options: CalculationOptions) -> Self {
        let functions = if options.include_builtin_functions {
            FunctionTable::builtins().clone()
        } else {
            FunctionTable::new()
        };
        Self { functions, options }
    }

    /// Add caller-supplied functions, overriding built-ins with the same name
    pub fn with_functions(mut self, functions: &FunctionTable) -> Self {
        self.functions.extend(functions);
        self
    }

    /// Register a single function
    pub fn register_function<S, F>(&mut self, name: S, function: F)
    where
        S: AsRef<str>,
        F: Fn(&[Value]) -> FunctionResult + Send + Sync + 'static,
    {
        self.functions.register(name, function);
    }

    /// Functions available to formulas
    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Options in effect
    pub fn options(&self) -> &CalculationOptions {
        &self.options
    }

    /// Parse and evaluate a single formula against the given values
    pub fn evaluate_formula(&self, formula: &str, values: &FieldValues) -> Result<Value> {
        let ast = parse_formula(formula)?;
        let ctx = EvaluationContext::new(values, &self.functions);
        Ok(evaluate(&ast, &ctx)?)
    }

    /// Fields referenced by a formula; blank text has no dependencies
    pub fn get_field_dependencies(&self, formula: &str) -> Result<BTreeSet<String>> {
        if formula.trim().is_empty() {
            return Ok(BTreeSet::new());
        }
        Ok(extract_dependencies(&parse_formula(formula)?))
    }

    /// Parse a formula and check its references against the known fields
    ///
    /// Syntax errors are returned as errors; unknown references are reported
    /// in the returned [`FormulaValidation`].
    pub fn validate_formula<I, S>(&self, formula: &str, known_fields: I) -> Result<FormulaValidation>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let dependencies = self.get_field_dependencies(formula)?;
        let known: HashSet<String> = known_fields
            .into_iter()
            .map(|f| f.as_ref().to_string())
            .collect();
        let unknown_fields = dependencies
            .iter()
            .filter(|dep| !known.contains(dep.as_str()))
            .cloned()
            .collect();
        Ok(FormulaValidation {
            dependencies,
            unknown_fields,
        })
    }

    /// Order in which the calculated fields of a schema are evaluated
    pub fn calculation_order(&self, fields: &[FieldDefinition]) -> Result<Vec<String>> {
        let formulas = parse_calculated_fields(fields)?;
        let graph = build_dependency_graph(&formulas);
        sorted_formula_fields(&graph, &formulas)
    }

    /// Calculated fields that must be recomputed after the given fields change,
    /// in evaluation order
    pub fn fields_affected_by(
        &self,
        fields: &[FieldDefinition],
        changed: &[&str],
    ) -> Result<Vec<String>> {
        let formulas = parse_calculated_fields(fields)?;
        let graph = build_dependency_graph(&formulas);
        let affected = graph.affected_by(changed).map_err(circular_or_formula)?;
        Ok(affected
            .into_iter()
            .filter(|f| formulas.contains_key(f))
            .collect())
    }

    /// Evaluate every calculated field of an entity
    ///
    /// The snapshot starts from `values`; fields with no supplied value take
    /// their default value. Each calculated field is evaluated once, in
    /// dependency order, and its result is visible to the fields after it.
    /// The first failure aborts the batch.
    pub fn evaluate_project_formulas(
        &self,
        fields: &[FieldDefinition],
        values: &FieldValues,
    ) -> Result<CalculatedValues> {
        let formulas = parse_calculated_fields(fields)?;
        let mut results = CalculatedValues::default();
        if formulas.is_empty() {
            tracing::debug!("No calculated fields to evaluate");
            return Ok(results);
        }

        let graph = build_dependency_graph(&formulas);
        let order = sorted_formula_fields(&graph, &formulas)?;
        tracing::debug!(
            "Evaluating {} calculated fields in order: {}",
            order.len(),
            order.join(", ")
        );

        let mut snapshot = values.clone();
        if self.options.seed_missing_fields {
            for field in fields {
                snapshot
                    .entry(field.id.clone())
                    .or_insert_with(|| field.default_value.clone());
            }
        }

        for field in order {
            let Some(ast) = formulas.get(&field) else {
                continue;
            };

            let ctx = EvaluationContext::new(&snapshot, &self.functions);
            let value = evaluate(ast, &ctx).map_err(|source| Error::FieldEvaluation {
                field: field.clone(),
                source,
            })?;
            tracing::trace!("{} = {:?}", field, value);

            snapshot.insert(field.clone(), value.clone());
            results.insert(field, value);
        }

        Ok(results)
    }
}

fn parse_calculated_fields(fields: &[FieldDefinition]) -> Result<HashMap<String, FormulaExpr>> {
    validate_field_ids(fields)?;

    let mut formulas = HashMap::new();
    for field in fields {
        let Some(text) = field.formula_text() else {
            continue;
        };
        let ast = parse_formula(text).map_err(|source| Error::FieldEvaluation {
            field: field.id.clone(),
            source,
        })?;
        formulas.insert(field.id.clone(), ast);
    }
    Ok(formulas)
}

fn build_dependency_graph(formulas: &HashMap<String, FormulaExpr>) -> DependencyGraph {
    let mut builder = DependencyGraphBuilder::new();
    for (field, ast) in formulas {
        builder.add_dependencies(field.as_str(), extract_dependencies(ast));
    }
    builder.build()
}

/// Topological order restricted to formula fields
fn sorted_formula_fields(
    graph: &DependencyGraph,
    formulas: &HashMap<String, FormulaExpr>,
) -> Result<Vec<String>> {
    let order = graph.topological_sort().map_err(circular_or_formula)?;
    Ok(order
        .into_iter()
        .filter(|field| formulas.contains_key(field))
        .collect())
}

fn circular_or_formula(err: FormulaError) -> Error {
    match err {
        FormulaError::CircularDependency { cycles } => Error::CircularDependency { cycles },
        other => Error::Formula(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldcalc_core::FieldType;
    use fieldcalc_formula::EvalError;
    use pretty_assertions::assert_eq;

    fn values(pairs: &[(&str, Value)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_evaluate_formula() {
        let service = FormulaService::new();
        let vals = values(&[("field1", 10.into()), ("field2", 5.into())]);
        assert_eq!(
            service.evaluate_formula("field1 + field2 * 2", &vals).unwrap(),
            Value::Number(20.0)
        );
    }

    #[test]
    fn test_evaluate_formula_errors() {
        let service = FormulaService::new();
        let vals = values(&[("a", 10.into())]);

        let err = service.evaluate_formula("a / 0", &vals).unwrap_err();
        assert!(matches!(
            err,
            Error::Formula(FormulaError::Evaluation(EvalError::DivisionByZero))
        ));

        let err = service.evaluate_formula("a +", &vals).unwrap_err();
        assert!(matches!(err, Error::Formula(FormulaError::Parse { .. })));
    }

    #[test]
    fn test_get_field_dependencies() {
        let service = FormulaService::new();
        let deps = service.get_field_dependencies("a + b * c").unwrap();
        assert_eq!(deps.into_iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert!(service.get_field_dependencies("").unwrap().is_empty());
        assert!(service.get_field_dependencies("   ").unwrap().is_empty());
    }

    #[test]
    fn test_validate_formula() {
        let service = FormulaService::new();
        let report = service
            .validate_formula("price * qty + discount", ["price", "qty"])
            .unwrap();
        assert!(!report.is_valid());
        assert_eq!(report.unknown_fields, vec!["discount".to_string()]);
        assert_eq!(report.dependencies.len(), 3);

        assert!(service.validate_formula("a +", ["a"]).is_err());
    }

    #[test]
    fn test_custom_functions_override_builtins() {
        let mut overrides = FunctionTable::new();
        overrides.register("round", |_: &[Value]| Ok(Value::string("custom")));
        let service = FormulaService::new().with_functions(&overrides);
        assert_eq!(
            service.evaluate_formula("ROUND(1.5)", &FieldValues::new()).unwrap(),
            Value::string("custom")
        );
    }

    #[test]
    fn test_without_builtins() {
        let service = FormulaService::with_options(CalculationOptions {
            include_builtin_functions: false,
            ..Default::default()
        });
        let err = service
            .evaluate_formula("abs(1)", &FieldValues::new())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Formula(FormulaError::Evaluation(EvalError::FunctionNotFound(ref name)))
                if name == "abs"
        ));
    }

    #[test]
    fn test_unseeded_missing_field_fails() {
        let service = FormulaService::with_options(CalculationOptions {
            seed_missing_fields: false,
            ..Default::default()
        });
        let fields = vec![
            FieldDefinition::new("a", FieldType::Number),
            FieldDefinition::calculated("b", "a + 1"),
        ];
        let err = service
            .evaluate_project_formulas(&fields, &FieldValues::new())
            .unwrap_err();
        assert_eq!(err.field(), Some("b"));
    }

    #[test]
    fn test_blank_formula_is_not_calculated() {
        let service = FormulaService::new();
        let fields = vec![
            FieldDefinition::calculated("blank", "  "),
            FieldDefinition::calculated("one", "1"),
        ];
        assert_eq!(service.calculation_order(&fields).unwrap(), vec!["one"]);
    }

    #[test]
    fn test_calculated_values_keep_evaluation_order() {
        let service = FormulaService::new();
        let fields = vec![
            FieldDefinition::calculated("c", "b + 1"),
            FieldDefinition::calculated("a", "1"),
            FieldDefinition::calculated("b", "a * 10"),
            FieldDefinition::calculated("blank", ""),
        ];
        let calculated = service
            .evaluate_project_formulas(&fields, &FieldValues::new())
            .unwrap();

        assert_eq!(calculated.len(), 3);
        assert!(calculated.contains_key("b"));
        assert!(!calculated.contains_key("blank"));
        assert_eq!(calculated.get("c"), Some(&Value::Number(11.0)));
        assert_eq!(calculated.field_ids().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(
            calculated.into_iter().map(|(id, _)| id).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }
}

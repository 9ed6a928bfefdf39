use fieldcalc_core::{FieldValues, Value};
use fieldcalc_formula::{build_graph, evaluate, parse_formula, EvaluationContext};
use proptest::prelude::*;

fn values_of(pairs: &[(&str, f64)]) -> FieldValues {
    pairs
        .iter()
        .map(|(name, v)| (name.to_string(), Value::Number(*v)))
        .collect()
}

fn eval_with(formula: &str, values: &FieldValues) -> Value {
    let ast = parse_formula(formula).unwrap();
    evaluate(&ast, &EvaluationContext::with_builtins(values)).unwrap()
}

/// Each field i depends on a subset of the fields before it
fn arb_dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..12).prop_flat_map(|n| {
        (0..n)
            .map(|i| proptest::sample::subsequence((0..i).collect::<Vec<_>>(), 0..=i))
            .collect::<Vec<_>>()
    })
}

fn formula_for(deps: &[usize]) -> String {
    if deps.is_empty() {
        "1".to_string()
    } else {
        deps.iter()
            .map(|d| format!("f{d}"))
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

proptest! {
    #[test]
    fn multiplication_binds_tighter_than_addition(
        a in -1000i32..=1000,
        b in -1000i32..=1000,
        c in -1000i32..=1000,
    ) {
        let values = values_of(&[("a", a as f64), ("b", b as f64), ("c", c as f64)]);
        prop_assert_eq!(eval_with("a + b * c", &values), eval_with("a + (b * c)", &values));
        prop_assert_eq!(eval_with("a * b + c", &values), eval_with("(a * b) + c", &values));
    }

    #[test]
    fn subtraction_is_left_associative(
        a in -1000i32..=1000,
        b in -1000i32..=1000,
        c in -1000i32..=1000,
    ) {
        let values = values_of(&[("a", a as f64), ("b", b as f64), ("c", c as f64)]);
        prop_assert_eq!(eval_with("a - b - c", &values), eval_with("(a - b) - c", &values));
    }

    #[test]
    fn power_is_right_associative(b in 0i32..4, c in 0i32..4) {
        let values = values_of(&[("b", b as f64), ("c", c as f64)]);
        prop_assert_eq!(eval_with("2 ** b ** c", &values), eval_with("2 ** (b ** c)", &values));
    }

    #[test]
    fn evaluation_is_deterministic(
        a in -1000i32..=1000,
        b in -1000i32..=1000,
    ) {
        let values = values_of(&[("a", a as f64), ("b", b as f64)]);
        let formula = "max(a, b) % 7 + abs(a - b) * 2 > a and not (a == b)";
        let first = eval_with(formula, &values);
        let second = eval_with(formula, &values);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn topological_order_respects_dependencies(dag in arb_dag()) {
        let formulas: Vec<(String, String)> = dag
            .iter()
            .enumerate()
            .map(|(i, deps)| (format!("f{i}"), formula_for(deps)))
            .collect();
        let graph = build_graph(formulas.iter().map(|(name, f)| (name.clone(), f))).unwrap();
        let order = graph.topological_sort().unwrap();
        prop_assert_eq!(order.len(), dag.len());

        let position = |name: &str| order.iter().position(|f| f == name).unwrap();
        for (i, deps) in dag.iter().enumerate() {
            for d in deps {
                let (dep_name, name) = (format!("f{d}"), format!("f{i}"));
                prop_assert!(position(&dep_name) < position(&name));
            }
        }

        // Same input, same order
        let again = build_graph(formulas.iter().map(|(name, f)| (name.clone(), f))).unwrap();
        prop_assert_eq!(again.topological_sort().unwrap(), order);
    }
}

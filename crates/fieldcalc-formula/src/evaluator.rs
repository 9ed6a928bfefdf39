//! Formula evaluator
//!
//! Evaluates formula ASTs against a snapshot of field values.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{EvalError, FormulaResult};
use crate::functions::FunctionTable;
use fieldcalc_core::{FieldValues, Value};
use std::any::Any;
use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};

/// Context for formula evaluation
///
/// Borrowed for the duration of one evaluation; the evaluator never mutates it.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// Field values visible to the formula
    pub field_values: &'a FieldValues,
    /// Functions callable from the formula
    pub functions: &'a FunctionTable,
}

impl<'a> EvaluationContext<'a> {
    /// Create a new evaluation context
    pub fn new(field_values: &'a FieldValues, functions: &'a FunctionTable) -> Self {
        Self {
            field_values,
            functions,
        }
    }

    /// Create a context using the built-in function table
    pub fn with_builtins(field_values: &'a FieldValues) -> Self {
        Self::new(field_values, FunctionTable::builtins())
    }

    /// Look up a field value
    pub fn field_value(&self, name: &str) -> Result<&'a Value, EvalError> {
        self.field_values
            .get(name)
            .ok_or_else(|| EvalError::FieldNotFound(name.to_string()))
    }
}

/// Evaluate a formula expression
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<Value> {
    Ok(evaluate_expr(expr, ctx)?)
}

/// Evaluate a condition formula, requiring a boolean result
pub fn evaluate_condition(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<bool> {
    match evaluate(expr, ctx)? {
        Value::Boolean(b) => Ok(b),
        other => Err(EvalError::NonBooleanCondition(other.type_name()).into()),
    }
}

fn evaluate_expr(expr: &FormulaExpr, ctx: &EvaluationContext) -> Result<Value, EvalError> {
    match expr {
        FormulaExpr::Literal(value) => Ok(value.clone()),

        FormulaExpr::FieldRef(name) => ctx.field_value(name).cloned(),

        FormulaExpr::UnaryOp { op, operand } => evaluate_unary_op(*op, operand, ctx),

        FormulaExpr::BinaryOp { op, left, right } => evaluate_binary_op(*op, left, right, ctx),

        FormulaExpr::FunctionCall { name, args } => evaluate_function(name, args, ctx),
    }
}

/// Evaluate a unary operation
fn evaluate_unary_op(
    op: UnaryOperator,
    operand: &FormulaExpr,
    ctx: &EvaluationContext,
) -> Result<Value, EvalError> {
    let val = evaluate_expr(operand, ctx)?;

    match (op, &val) {
        (UnaryOperator::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOperator::Plus, Value::Number(n)) => Ok(Value::Number(*n)),
        (UnaryOperator::Not, v) => Ok(Value::Boolean(!v.is_truthy())),
        (op, v) => Err(EvalError::InvalidOperand {
            operator: op.symbol(),
            operand: v.type_name(),
        }),
    }
}

/// Evaluate a binary operation
///
/// Both operands are evaluated before the operator is applied; `and` and `or`
/// do not short-circuit, so an error on either side always surfaces.
fn evaluate_binary_op(
    op: BinaryOperator,
    left: &FormulaExpr,
    right: &FormulaExpr,
    ctx: &EvaluationContext,
) -> Result<Value, EvalError> {
    // Evaluate operands first
    let left_val = evaluate_expr(left, ctx)?;
    let right_val = evaluate_expr(right, ctx)?;

    match op {
        // Arithmetic operators
        BinaryOperator::Add => match (&left_val, &right_val) {
            (Value::String(l), Value::String(r)) => Ok(Value::String(format!("{}{}", l, r))),
            _ => arithmetic(op, &left_val, &right_val, |l, r| Ok(l + r)),
        },
        BinaryOperator::Subtract => arithmetic(op, &left_val, &right_val, |l, r| Ok(l - r)),
        BinaryOperator::Multiply => arithmetic(op, &left_val, &right_val, |l, r| Ok(l * r)),
        BinaryOperator::Divide => arithmetic(op, &left_val, &right_val, |l, r| {
            if r == 0.0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(l / r)
            }
        }),
        BinaryOperator::Modulo => arithmetic(op, &left_val, &right_val, |l, r| {
            if r == 0.0 {
                Err(EvalError::ModuloByZero)
            } else {
                // Floored modulo: the result takes the sign of the divisor
                Ok(l - r * (l / r).floor())
            }
        }),
        BinaryOperator::Power => arithmetic(op, &left_val, &right_val, |l, r| Ok(l.powf(r))),

        // Comparison operators
        BinaryOperator::Equal => Ok(Value::Boolean(left_val == right_val)),
        BinaryOperator::NotEqual => Ok(Value::Boolean(left_val != right_val)),
        BinaryOperator::LessThan => {
            compare(op, &left_val, &right_val).map(|o| Value::Boolean(o == Ordering::Less))
        }
        BinaryOperator::LessEqual => {
            compare(op, &left_val, &right_val).map(|o| Value::Boolean(o != Ordering::Greater))
        }
        BinaryOperator::GreaterThan => {
            compare(op, &left_val, &right_val).map(|o| Value::Boolean(o == Ordering::Greater))
        }
        BinaryOperator::GreaterEqual => {
            compare(op, &left_val, &right_val).map(|o| Value::Boolean(o != Ordering::Less))
        }

        // Logical operators
        BinaryOperator::And => Ok(Value::Boolean(
            left_val.is_truthy() && right_val.is_truthy(),
        )),
        BinaryOperator::Or => Ok(Value::Boolean(
            left_val.is_truthy() || right_val.is_truthy(),
        )),
    }
}

/// Apply a numeric operator, rejecting any non-number operand
fn arithmetic<F>(op: BinaryOperator, left: &Value, right: &Value, apply: F) -> Result<Value, EvalError>
where
    F: FnOnce(f64, f64) -> Result<f64, EvalError>,
{
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => apply(*l, *r).map(Value::Number),
        _ => Err(invalid_operands(op, left, right)),
    }
}

/// Order two values of the same comparable type
fn compare(op: BinaryOperator, left: &Value, right: &Value) -> Result<Ordering, EvalError> {
    let ordering = match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.partial_cmp(r),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Boolean(l), Value::Boolean(r)) => Some(l.cmp(r)),
        _ => None,
    };

    // NaN compares as unordered, like mismatched types
    ordering.ok_or_else(|| invalid_operands(op, left, right))
}

fn invalid_operands(op: BinaryOperator, left: &Value, right: &Value) -> EvalError {
    EvalError::InvalidOperands {
        operator: op.symbol(),
        left: left.type_name(),
        right: right.type_name(),
    }
}

/// Evaluate a function call
fn evaluate_function(
    name: &str,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
) -> Result<Value, EvalError> {
    let function = ctx
        .functions
        .get(name)
        .ok_or_else(|| EvalError::FunctionNotFound(name.to_string()))?;

    // Evaluate arguments left to right
    let mut evaluated_args = Vec::with_capacity(args.len());
    for arg in args {
        evaluated_args.push(evaluate_expr(arg, ctx)?);
    }

    // A panicking native function is reported like any other function failure
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| function(&evaluated_args)));
    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(message)) => Err(EvalError::Function {
            function: name.to_string(),
            message,
        }),
        Err(payload) => Err(EvalError::Function {
            function: name.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "function panicked".to_string()
    }
}

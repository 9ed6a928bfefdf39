//! Logical functions
//!
//! Arguments are evaluated before the call, so `if` evaluates both branches.

use super::{check_arity, FunctionResult};
use fieldcalc_core::Value;

/// if(condition, value_if_true, [value_if_false])
pub fn fn_if(args: &[Value]) -> FunctionResult {
    check_arity("if", args, 2, Some(3))?;
    if args[0].is_truthy() {
        Ok(args[1].clone())
    } else {
        Ok(args.get(2).cloned().unwrap_or(Value::Null))
    }
}

/// coalesce(value1, ...) - first non-null argument
pub fn fn_coalesce(args: &[Value]) -> FunctionResult {
    Ok(args
        .iter()
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(Value::Null))
}

/// isnull(value)
pub fn fn_isnull(args: &[Value]) -> FunctionResult {
    check_arity("isnull", args, 1, Some(1))?;
    Ok(Value::Boolean(args[0].is_null()))
}

//! Text functions

use super::{check_arity, number_arg, FunctionResult};
use fieldcalc_core::Value;

fn string_arg<'a>(name: &str, args: &'a [Value], index: usize) -> Result<&'a str, String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(format!(
            "{} expects a string for argument {}, got {}",
            name,
            index + 1,
            other.type_name()
        )),
        None => Err(format!("{} is missing argument {}", name, index + 1)),
    }
}

fn count_arg(name: &str, args: &[Value], index: usize) -> Result<usize, String> {
    let n = number_arg(name, args, index)?;
    if n < 0.0 {
        return Err(format!("{} expects a non-negative count, got {}", name, n));
    }
    Ok(n.trunc() as usize)
}

/// len(text)
pub fn fn_len(args: &[Value]) -> FunctionResult {
    check_arity("len", args, 1, Some(1))?;
    let s = string_arg("len", args, 0)?;
    Ok(Value::Number(s.chars().count() as f64))
}

/// upper(text)
pub fn fn_upper(args: &[Value]) -> FunctionResult {
    check_arity("upper", args, 1, Some(1))?;
    Ok(Value::String(string_arg("upper", args, 0)?.to_uppercase()))
}

/// lower(text)
pub fn fn_lower(args: &[Value]) -> FunctionResult {
    check_arity("lower", args, 1, Some(1))?;
    Ok(Value::String(string_arg("lower", args, 0)?.to_lowercase()))
}

/// trim(text) - strips leading/trailing whitespace and collapses inner runs
pub fn fn_trim(args: &[Value]) -> FunctionResult {
    check_arity("trim", args, 1, Some(1))?;
    let s = string_arg("trim", args, 0)?;
    Ok(Value::String(s.split_whitespace().collect::<Vec<_>>().join(" ")))
}

/// concat(value1, ...) - null arguments contribute nothing
pub fn fn_concat(args: &[Value]) -> FunctionResult {
    let joined: String = args
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| v.to_string())
        .collect();
    Ok(Value::String(joined))
}

/// left(text, [count])
pub fn fn_left(args: &[Value]) -> FunctionResult {
    check_arity("left", args, 1, Some(2))?;
    let s = string_arg("left", args, 0)?;
    let n = match args.get(1) {
        Some(_) => count_arg("left", args, 1)?,
        None => 1,
    };
    Ok(Value::String(s.chars().take(n).collect()))
}

/// right(text, [count])
pub fn fn_right(args: &[Value]) -> FunctionResult {
    check_arity("right", args, 1, Some(2))?;
    let s = string_arg("right", args, 0)?;
    let n = match args.get(1) {
        Some(_) => count_arg("right", args, 1)?,
        None => 1,
    };
    let len = s.chars().count();
    Ok(Value::String(s.chars().skip(len.saturating_sub(n)).collect()))
}

/// str(value)
pub fn fn_str(args: &[Value]) -> FunctionResult {
    check_arity("str", args, 1, Some(1))?;
    Ok(Value::String(args[0].to_string()))
}

//! Math functions

use super::{check_arity, number_arg, FunctionResult};
use fieldcalc_core::Value;

/// Collect every argument as a number
fn numbers(name: &str, args: &[Value]) -> Result<Vec<f64>, String> {
    (0..args.len()).map(|i| number_arg(name, args, i)).collect()
}

/// abs(number)
pub fn fn_abs(args: &[Value]) -> FunctionResult {
    check_arity("abs", args, 1, Some(1))?;
    Ok(Value::Number(number_arg("abs", args, 0)?.abs()))
}

/// round(number, [digits]) - rounds half away from zero
pub fn fn_round(args: &[Value]) -> FunctionResult {
    check_arity("round", args, 1, Some(2))?;
    let number = number_arg("round", args, 0)?;
    let digits = match args.get(1) {
        Some(_) => number_arg("round", args, 1)? as i32,
        None => 0,
    };

    // For negative digits, we round to the left of the decimal point
    let multiplier = 10_f64.powi(digits);
    if multiplier == 0.0 {
        return Ok(Value::Number(0.0));
    }
    let scaled = number * multiplier;
    if !scaled.is_finite() {
        // More digits than an f64 carries
        return Ok(Value::Number(number));
    }

    let result = if number >= 0.0 {
        (scaled + 0.5).floor() / multiplier
    } else {
        (scaled - 0.5).ceil() / multiplier
    };

    Ok(Value::Number(result))
}

/// floor(number)
pub fn fn_floor(args: &[Value]) -> FunctionResult {
    check_arity("floor", args, 1, Some(1))?;
    Ok(Value::Number(number_arg("floor", args, 0)?.floor()))
}

/// ceil(number)
pub fn fn_ceil(args: &[Value]) -> FunctionResult {
    check_arity("ceil", args, 1, Some(1))?;
    Ok(Value::Number(number_arg("ceil", args, 0)?.ceil()))
}

/// sqrt(number)
pub fn fn_sqrt(args: &[Value]) -> FunctionResult {
    check_arity("sqrt", args, 1, Some(1))?;
    let n = number_arg("sqrt", args, 0)?;
    if n < 0.0 {
        return Err(format!("sqrt of negative number {}", n));
    }
    Ok(Value::Number(n.sqrt()))
}

/// pow(base, exponent)
pub fn fn_pow(args: &[Value]) -> FunctionResult {
    check_arity("pow", args, 2, Some(2))?;
    let base = number_arg("pow", args, 0)?;
    let exponent = number_arg("pow", args, 1)?;
    Ok(Value::Number(base.powf(exponent)))
}

/// min(number1, [number2], ...)
pub fn fn_min(args: &[Value]) -> FunctionResult {
    check_arity("min", args, 1, None)?;
    let min = numbers("min", args)?
        .into_iter()
        .fold(f64::INFINITY, f64::min);
    Ok(Value::Number(min))
}

/// max(number1, [number2], ...)
pub fn fn_max(args: &[Value]) -> FunctionResult {
    check_arity("max", args, 1, None)?;
    let max = numbers("max", args)?
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max);
    Ok(Value::Number(max))
}

/// sum(number1, ...) - null arguments are skipped
pub fn fn_sum(args: &[Value]) -> FunctionResult {
    let present: Vec<Value> = args.iter().filter(|v| !v.is_null()).cloned().collect();
    Ok(Value::Number(numbers("sum", &present)?.iter().sum()))
}

/// avg(number1, ...) - null arguments are skipped
pub fn fn_avg(args: &[Value]) -> FunctionResult {
    let present: Vec<Value> = args.iter().filter(|v| !v.is_null()).cloned().collect();
    if present.is_empty() {
        return Err("avg needs at least one non-null number".to_string());
    }
    let values = numbers("avg", &present)?;
    Ok(Value::Number(values.iter().sum::<f64>() / values.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: f64) -> Value {
        Value::Number(v)
    }

    #[test]
    fn test_round() {
        assert_eq!(fn_round(&[n(2.5)]), Ok(n(3.0)));
        assert_eq!(fn_round(&[n(-2.5)]), Ok(n(-3.0)));
        assert_eq!(fn_round(&[n(3.14159), n(2.0)]), Ok(n(3.14)));
        assert_eq!(fn_round(&[n(1234.0), n(-2.0)]), Ok(n(1200.0)));
    }

    #[test]
    fn test_round_extreme_digits() {
        assert_eq!(fn_round(&[n(1.0), n(400.0)]), Ok(n(1.0)));
        assert_eq!(fn_round(&[n(0.0), n(400.0)]), Ok(n(0.0)));
        assert_eq!(fn_round(&[n(1e10), n(308.0)]), Ok(n(1e10)));
        assert_eq!(fn_round(&[n(1234.0), n(-400.0)]), Ok(n(0.0)));
    }

    #[test]
    fn test_min_max() {
        assert_eq!(fn_min(&[n(3.0), n(-1.0), n(2.0)]), Ok(n(-1.0)));
        assert_eq!(fn_max(&[n(3.0), n(-1.0), n(2.0)]), Ok(n(3.0)));
        assert!(fn_max(&[]).is_err());
        assert!(fn_max(&[n(1.0), Value::string("x")]).is_err());
    }

    #[test]
    fn test_sum_and_avg_skip_null() {
        assert_eq!(fn_sum(&[n(1.0), Value::Null, n(2.0)]), Ok(n(3.0)));
        assert_eq!(fn_sum(&[]), Ok(n(0.0)));
        assert_eq!(fn_avg(&[n(1.0), Value::Null, n(2.0)]), Ok(n(1.5)));
        assert!(fn_avg(&[Value::Null]).is_err());
    }

    #[test]
    fn test_sqrt_negative() {
        assert_eq!(fn_sqrt(&[n(9.0)]), Ok(n(3.0)));
        assert!(fn_sqrt(&[n(-1.0)]).is_err());
    }

    #[test]
    fn test_type_errors() {
        assert_eq!(
            fn_abs(&[Value::Boolean(true)]),
            Err("abs expects a number for argument 1, got boolean".to_string())
        );
    }
}

//! Function tables and built-in functions
//!
//! Formulas call functions by name through a [`FunctionTable`]. Callers can
//! register their own native functions next to (or instead of) the built-ins.
//!
//! ```rust
//! use fieldcalc_core::Value;
//! use fieldcalc_formula::functions::FunctionTable;
//!
//! let mut table = FunctionTable::with_builtins();
//! table.register("double", |args: &[Value]| match args {
//!     [Value::Number(n)] => Ok(Value::Number(n * 2.0)),
//!     _ => Err("double expects one number".to_string()),
//! });
//!
//! assert!(table.contains("DOUBLE"));
//! assert!(table.contains("round"));
//! ```

pub mod logical;
pub mod math;
pub mod text;

use ahash::AHashMap;
use fieldcalc_core::Value;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

/// Result of a native function; the error is a human readable message
pub type FunctionResult = Result<Value, String>;

/// Native function callable from formulas
///
/// Receives the already evaluated positional arguments.
pub type NativeFunction = Arc<dyn Fn(&[Value]) -> FunctionResult + Send + Sync>;

/// Built-in function implementation signature
pub type FunctionImpl = fn(&[Value]) -> FunctionResult;

static BUILTINS: Lazy<FunctionTable> = Lazy::new(FunctionTable::with_builtins);

/// Name → function lookup table
///
/// Names are matched case-insensitively.
#[derive(Clone, Default)]
pub struct FunctionTable {
    functions: AHashMap<String, NativeFunction>,
}

impl FunctionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding all built-in functions
    pub fn with_builtins() -> Self {
        let mut table = Self::new();

        table.register_math_functions();
        table.register_text_functions();
        table.register_logical_functions();

        table
    }

    /// Shared table of built-in functions
    pub fn builtins() -> &'static FunctionTable {
        &BUILTINS
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&NativeFunction> {
        self.functions.get(&name.to_lowercase())
    }

    /// Whether a function with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Register a function, replacing any existing one with the same name
    pub fn register<S, F>(&mut self, name: S, function: F)
    where
        S: AsRef<str>,
        F: Fn(&[Value]) -> FunctionResult + Send + Sync + 'static,
    {
        self.functions
            .insert(name.as_ref().to_lowercase(), Arc::new(function));
    }

    /// Copy every function of `other` into this table, overriding duplicates
    pub fn extend(&mut self, other: &FunctionTable) {
        for (name, function) in &other.functions {
            self.functions.insert(name.clone(), Arc::clone(function));
        }
    }

    /// Registered function names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn register_builtin(&mut self, name: &str, implementation: FunctionImpl) {
        self.register(name, implementation);
    }

    fn register_math_functions(&mut self) {
        self.register_builtin("abs", math::fn_abs);
        self.register_builtin("round", math::fn_round);
        self.register_builtin("floor", math::fn_floor);
        self.register_builtin("ceil", math::fn_ceil);
        self.register_builtin("sqrt", math::fn_sqrt);
        self.register_builtin("pow", math::fn_pow);
        self.register_builtin("min", math::fn_min);
        self.register_builtin("max", math::fn_max);
        self.register_builtin("sum", math::fn_sum);
        self.register_builtin("avg", math::fn_avg);
    }

    fn register_text_functions(&mut self) {
        self.register_builtin("len", text::fn_len);
        self.register_builtin("upper", text::fn_upper);
        self.register_builtin("lower", text::fn_lower);
        self.register_builtin("trim", text::fn_trim);
        self.register_builtin("concat", text::fn_concat);
        self.register_builtin("left", text::fn_left);
        self.register_builtin("right", text::fn_right);
        self.register_builtin("str", text::fn_str);
    }

    fn register_logical_functions(&mut self) {
        self.register_builtin("if", logical::fn_if);
        self.register_builtin("coalesce", logical::fn_coalesce);
        self.register_builtin("isnull", logical::fn_isnull);
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTable")
            .field("functions", &self.names())
            .finish()
    }
}

// === Argument helpers shared by the built-ins ===

/// Check the argument count of a built-in
pub(crate) fn check_arity(
    name: &str,
    args: &[Value],
    min: usize,
    max: Option<usize>,
) -> Result<(), String> {
    let count = args.len();
    let ok = count >= min && max.map_or(true, |max| count <= max);
    if ok {
        return Ok(());
    }

    let expected = match max {
        Some(max) if max == min => format!("{}", min),
        Some(max) => format!("{} to {}", min, max),
        None => format!("at least {}", min),
    };
    Err(format!(
        "{} expects {} argument(s), got {}",
        name, expected, count
    ))
}

/// Fetch a numeric argument
pub(crate) fn number_arg(name: &str, args: &[Value], index: usize) -> Result<f64, String> {
    match args.get(index) {
        Some(Value::Number(n)) => Ok(*n),
        Some(other) => Err(format!(
            "{} expects a number for argument {}, got {}",
            name,
            index + 1,
            other.type_name()
        )),
        None => Err(format!("{} is missing argument {}", name, index + 1)),
    }
}

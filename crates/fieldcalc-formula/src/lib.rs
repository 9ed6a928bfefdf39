//! # fieldcalc-formula
//!
//! Formula engine for fieldcalc.
//!
//! This crate provides:
//! - Tokenizing and parsing (text → AST)
//! - Evaluation against a snapshot of field values (AST → value)
//! - Built-in and host-registered functions
//! - Dependency tracking and calculation ordering
//!
//! ## Example
//!
//! ```rust
//! use fieldcalc_core::{FieldValues, Value};
//! use fieldcalc_formula::{evaluate, parse_formula, EvaluationContext};
//!
//! let ast = parse_formula("price * qty + 1").unwrap();
//!
//! let mut values = FieldValues::new();
//! values.insert("price".into(), Value::Number(2.5));
//! values.insert("qty".into(), Value::Number(4.0));
//!
//! let ctx = EvaluationContext::with_builtins(&values);
//! assert_eq!(evaluate(&ast, &ctx).unwrap(), Value::Number(11.0));
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;

pub use ast::{BinaryOperator, FormulaExpr, UnaryOperator};
pub use dependency::{
    build_graph, extract_dependencies, DependencyGraph, DependencyGraphBuilder, FormulaSource,
};
pub use error::{EvalError, FormulaError, FormulaResult};
pub use evaluator::{evaluate, evaluate_condition, EvaluationContext};
pub use functions::{FunctionResult, FunctionTable, NativeFunction};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse_formula, MAX_NESTING_DEPTH};

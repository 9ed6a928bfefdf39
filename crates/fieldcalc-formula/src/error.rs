//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur while tokenizing, parsing or evaluating a formula
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Unexpected character or unterminated string
    #[error("Lex error at position {position}: {message}")]
    Lex { message: String, position: usize },

    /// Malformed grammar
    #[error("Parse error at position {position}: {message}")]
    Parse { message: String, position: usize },

    /// Runtime failure while evaluating an AST
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvalError),

    /// The dependency graph contains at least one cycle
    #[error("Circular dependency detected: {}", .cycles.join(", "))]
    CircularDependency { cycles: Vec<String> },
}

impl FormulaError {
    pub(crate) fn lex<S: Into<String>>(message: S, position: usize) -> Self {
        FormulaError::Lex {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn parse<S: Into<String>>(message: S, position: usize) -> Self {
        FormulaError::Parse {
            message: message.into(),
            position,
        }
    }

    /// Source position for lex and parse errors
    pub fn position(&self) -> Option<usize> {
        match self {
            FormulaError::Lex { position, .. } | FormulaError::Parse { position, .. } => {
                Some(*position)
            }
            _ => None,
        }
    }

    /// The evaluation error, if this is one
    pub fn as_eval(&self) -> Option<&EvalError> {
        match self {
            FormulaError::Evaluation(e) => Some(e),
            _ => None,
        }
    }
}

/// Runtime evaluation failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Field reference missing from the evaluation context
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// Function missing from the function table
    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    /// Operator applied to operands it does not support
    #[error("Unsupported operand types for '{operator}': {left} and {right}")]
    InvalidOperands {
        operator: &'static str,
        left: &'static str,
        right: &'static str,
    },

    /// Unary operator applied to an operand it does not support
    #[error("Unsupported operand type for unary '{operator}': {operand}")]
    InvalidOperand {
        operator: &'static str,
        operand: &'static str,
    },

    /// Division with a zero divisor
    #[error("Division by zero")]
    DivisionByZero,

    /// Modulo with a zero divisor
    #[error("Modulo by zero")]
    ModuloByZero,

    /// Condition formula produced something other than a boolean
    #[error("Condition must evaluate to a boolean, got {0}")]
    NonBooleanCondition(&'static str),

    /// A function failed while being invoked
    #[error("Error in function '{function}': {message}")]
    Function { function: String, message: String },
}

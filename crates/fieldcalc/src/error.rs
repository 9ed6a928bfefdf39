//! Error types for fieldcalc

use fieldcalc_formula::FormulaError;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the fieldcalc services
#[derive(Debug, Error)]
pub enum Error {
    /// A single formula failed to tokenize, parse or evaluate
    #[error(transparent)]
    Formula(#[from] FormulaError),

    /// Invalid field schema
    #[error(transparent)]
    Core(#[from] fieldcalc_core::Error),

    /// A calculated field failed during batch evaluation
    #[error("Error evaluating field '{field}': {source}")]
    FieldEvaluation {
        field: String,
        #[source]
        source: FormulaError,
    },

    /// The calculated fields reference each other in a cycle
    #[error("Circular dependency detected: {}", .cycles.join(", "))]
    CircularDependency { cycles: Vec<String> },
}

impl Error {
    /// Name of the field the error is attributed to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::FieldEvaluation { field, .. } => Some(field.as_str()),
            _ => None,
        }
    }

    /// Cycle paths for circular dependency errors
    pub fn cycles(&self) -> Option<&[String]> {
        match self {
            Error::CircularDependency { cycles } => Some(cycles.as_slice()),
            Error::Formula(FormulaError::CircularDependency { cycles }) => Some(cycles.as_slice()),
            _ => None,
        }
    }
}

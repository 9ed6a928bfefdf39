//! Error types for fieldcalc-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fieldcalc-core
#[derive(Debug, Error)]
pub enum Error {
    /// Field with an empty id
    #[error("Field id must not be empty")]
    EmptyFieldId,

    /// Two fields share an id
    #[error("Duplicate field id: {0}")]
    DuplicateFieldId(String),
}

//! Prelude module - common imports for fieldcalc users
//!
//! ```rust
//! use fieldcalc::prelude::*;
//! ```

pub use crate::{
    // Services
    CalculatedValues,
    CalculationOptions,
    ControlEffectEvaluator,
    FormulaService,

    // Rule types
    ControlEffect,
    ControlRule,
    ControlType,
    EvaluationResult,
    FieldUiState,

    // Field types
    FieldDefinition,
    FieldType,
    FieldValues,
    Value,

    // Formula types
    FormulaExpr,
    FunctionTable,

    // Error types
    Error,
    Result,
};

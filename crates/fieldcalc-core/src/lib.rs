//! # fieldcalc-core
//!
//! Core data structures for the fieldcalc formula engine.
//!
//! This crate provides the fundamental types used throughout fieldcalc:
//! - [`Value`] - Dynamically typed field values (null, boolean, number, string)
//! - [`FieldDefinition`] - Entity field schema, including calculated fields
//! - [`ControlRule`] and [`ControlEffect`] - Condition-driven UI effects
//!
//! ## Example
//!
//! ```rust
//! use fieldcalc_core::{FieldValues, Value};
//!
//! let mut values = FieldValues::new();
//! values.insert("price".to_string(), Value::Number(9.5));
//! values.insert("name".to_string(), Value::string("Widget"));
//!
//! assert_eq!(values["price"].as_number(), Some(9.5));
//! ```

pub mod control;
pub mod error;
pub mod field;
pub mod value;

// Re-exports for convenience
pub use control::{ControlEffect, ControlRule, ControlType, EvaluationResult, FieldUiState};
pub use error::{Error, Result};
pub use field::{validate_field_ids, FieldDefinition, FieldType};
pub use value::{FieldValues, Value};

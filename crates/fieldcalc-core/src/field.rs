//! Field schema
//!
//! A [`FieldDefinition`] describes one field of an entity. Fields carrying a
//! formula are *calculated fields*: their value is derived from other fields
//! rather than entered directly.
//!
//! ## Example
//!
//! ```rust
//! use fieldcalc_core::{FieldDefinition, FieldType};
//!
//! let price = FieldDefinition::new("price", FieldType::Number);
//! let total = FieldDefinition::calculated("total", "price * quantity");
//!
//! assert!(!price.is_calculated());
//! assert!(total.is_calculated());
//! ```

use crate::error::{Error, Result};
use crate::value::Value;
use std::collections::HashSet;
use std::fmt;

/// Kind of data a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FieldType {
    /// Free text
    #[default]
    Text,
    /// Numeric input
    Number,
    /// Checkbox
    Boolean,
    /// One value out of a fixed list of options
    Choice,
    /// Value derived from a formula
    Calculated,
}

impl FieldType {
    /// Lowercase name used in project files
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Choice => "choice",
            FieldType::Calculated => "calculated",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definition of a single entity field
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDefinition {
    /// Unique field id, also the name formulas use to reference the field
    pub id: String,
    /// Human readable label
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: String,
    /// Kind of data the field holds
    #[cfg_attr(feature = "serde", serde(default))]
    pub field_type: FieldType,
    /// Formula text for calculated fields
    #[cfg_attr(feature = "serde", serde(default))]
    pub formula: Option<String>,
    /// Value used when no current value is supplied
    #[cfg_attr(feature = "serde", serde(default))]
    pub default_value: Value,
}

impl FieldDefinition {
    /// Create an input field
    pub fn new<S: Into<String>>(id: S, field_type: FieldType) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            field_type,
            formula: None,
            default_value: Value::Null,
        }
    }

    /// Create a calculated field with the given formula
    pub fn calculated<S: Into<String>, F: Into<String>>(id: S, formula: F) -> Self {
        Self {
            formula: Some(formula.into()),
            ..Self::new(id, FieldType::Calculated)
        }
    }

    /// Set the label
    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = label.into();
        self
    }

    /// Set the default value
    pub fn with_default<V: Into<Value>>(mut self, value: V) -> Self {
        self.default_value = value.into();
        self
    }

    /// Formula text, with a blank formula treated as no formula
    pub fn formula_text(&self) -> Option<&str> {
        self.formula
            .as_deref()
            .filter(|formula| !formula.trim().is_empty())
    }

    /// Whether the field's value comes from a formula
    pub fn is_calculated(&self) -> bool {
        self.formula_text().is_some()
    }
}

/// Check that every field id in a schema is non-empty and unique
pub fn validate_field_ids(fields: &[FieldDefinition]) -> Result<()> {
    let mut seen = HashSet::new();
    for field in fields {
        if field.id.trim().is_empty() {
            return Err(Error::EmptyFieldId);
        }
        if !seen.insert(field.id.as_str()) {
            return Err(Error::DuplicateFieldId(field.id.clone()));
        }
    }
    Ok(())
}

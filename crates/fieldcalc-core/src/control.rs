//! Control rules
//!
//! A [`ControlRule`] pairs a boolean condition formula with a UI effect on a
//! target field. Rules are evaluated by priority (highest first); the effects
//! of rules whose condition holds are collected into an [`EvaluationResult`].
//!
//! ## Example
//!
//! ```rust
//! use fieldcalc_core::{ControlEffect, ControlRule, ControlType};
//!
//! let rule = ControlRule::new(
//!     "hide-discount",
//!     "total < 100",
//!     ControlEffect::new(ControlType::Visibility, "discount", false),
//! )
//! .with_priority(10);
//!
//! assert!(rule.enabled);
//! ```

use crate::value::Value;
use std::fmt;

/// Kind of UI effect a rule produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ControlType {
    /// Show or hide the target field
    Visibility,
    /// Enable or disable the target field
    Enabled,
    /// Override the target field's value
    SetValue,
}

impl ControlType {
    /// Lowercase name used in project files
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlType::Visibility => "visibility",
            ControlType::Enabled => "enabled",
            ControlType::SetValue => "set_value",
        }
    }
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A UI effect on a single field
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlEffect {
    /// What the effect changes
    pub control_type: ControlType,
    /// Field the effect applies to
    pub target_field_id: String,
    /// Effect payload (a boolean for visibility/enabled, any value for set-value)
    #[cfg_attr(feature = "serde", serde(default))]
    pub value: Value,
}

impl ControlEffect {
    /// Create a new effect
    pub fn new<S: Into<String>, V: Into<Value>>(
        control_type: ControlType,
        target_field_id: S,
        value: V,
    ) -> Self {
        Self {
            control_type,
            target_field_id: target_field_id.into(),
            value: value.into(),
        }
    }
}

/// A condition formula and the effect it triggers
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlRule {
    /// Rule id, used in error messages
    pub id: String,
    /// Boolean formula deciding whether the effect applies
    pub condition: String,
    /// Effect applied when the condition is true
    pub effect: ControlEffect,
    /// Higher priorities are evaluated (and win conflicts) first
    #[cfg_attr(feature = "serde", serde(default))]
    pub priority: i32,
    /// Disabled rules are skipped
    #[cfg_attr(feature = "serde", serde(default = "default_enabled"))]
    pub enabled: bool,
}

#[cfg(feature = "serde")]
fn default_enabled() -> bool {
    true
}

impl ControlRule {
    /// Create an enabled rule with priority 0
    pub fn new<I: Into<String>, C: Into<String>>(id: I, condition: C, effect: ControlEffect) -> Self {
        Self {
            id: id.into(),
            condition: condition.into(),
            effect,
            priority: 0,
            enabled: true,
        }
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set whether the rule is enabled
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Effects produced by evaluating a set of rules, plus non-fatal failures
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaluationResult {
    /// Effects of rules whose condition was true, in priority order
    pub effects: Vec<ControlEffect>,
    /// One message per rule whose condition failed to evaluate
    pub errors: Vec<String>,
}

impl EvaluationResult {
    /// Whether any rule failed
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// UI state of a field after applying control effects
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldUiState {
    /// Whether the field is shown
    pub visible: bool,
    /// Whether the field accepts input
    pub enabled: bool,
    /// Value forced by a set-value effect
    pub value_override: Option<Value>,
}

impl Default for FieldUiState {
    fn default() -> Self {
        Self {
            visible: true,
            enabled: true,
            value_override: None,
        }
    }
}

impl FieldUiState {
    /// Apply a single effect to this state
    ///
    /// Visibility and enabled effects use the truthiness of the effect value.
    pub fn apply(&mut self, effect: &ControlEffect) {
        match effect.control_type {
            ControlType::Visibility => self.visible = effect.value.is_truthy(),
            ControlType::Enabled => self.enabled = effect.value.is_truthy(),
            ControlType::SetValue => self.value_override = Some(effect.value.clone()),
        }
    }
}

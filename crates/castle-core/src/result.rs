//! # Validation Results
//!
//! The aggregate outcome of one validation run and the error/warning records
//! it carries. A [`ValidationResult`] is created fresh per call and handed to
//! the caller by value; nothing retains it afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationFailedError;
use crate::severity::Severity;

/// Free-form diagnostic map (string → JSON value).
pub type ContextMap = serde_json::Map<String, Value>;

/// Context key holding the ID of the rule that produced an error.
pub const RULE_ID_KEY: &str = "ruleId";
/// Context key holding the ordered list of rule IDs that executed.
pub const EXECUTED_RULES_KEY: &str = "executedRules";
/// Context key set to `true` when execution stopped on cancellation.
pub const CANCELLED_KEY: &str = "cancelled";
/// Context key set to `true` on errors synthesized from execution faults.
pub const INTERNAL_KEY: &str = "internal";
/// Context key naming the operation a result belongs to.
pub const OPERATION_KEY: &str = "operation";

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// A single business-rule violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// Stable machine-readable identifier (e.g. `ORG_DEPTH_LIMIT`).
    pub code: String,
    /// Human-readable explanation.
    pub message: String,
    /// Dotted path into the request, if the error concerns one field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The offending value, if useful for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Severity. Rules may leave this unset; the chain fills in the rule's
    /// declared severity before returning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Structured diagnostics. Always contains `ruleId` once merged by a chain.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub context: ContextMap,
}

impl ValidationError {
    /// Create an error with a code and message and nothing else.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
            value: None,
            severity: None,
            context: ContextMap::new(),
        }
    }

    /// Set the request field this error concerns.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Attach the offending value.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set an explicit severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Insert one context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Severity, treating an unset severity as `High`.
    pub fn effective_severity(&self) -> Severity {
        self.severity.unwrap_or_default()
    }

    /// The `ruleId` context entry, if present.
    pub fn rule_id(&self) -> Option<&str> {
        self.context.get(RULE_ID_KEY).and_then(Value::as_str)
    }

    /// Whether this error was synthesized from an execution fault.
    pub fn is_internal(&self) -> bool {
        self.context
            .get(INTERNAL_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// ValidationWarning
// ---------------------------------------------------------------------------

/// A non-blocking advisory. Never affects validity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationWarning {
    /// Stable machine-readable identifier.
    pub code: String,
    /// Human-readable explanation.
    pub message: String,
    /// Dotted path into the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The value that triggered the warning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Structured diagnostics.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub context: ContextMap,
}

impl ValidationWarning {
    /// Create a warning with a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
            value: None,
            context: ContextMap::new(),
        }
    }

    /// Set the request field this warning concerns.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Attach the triggering value.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Insert one context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// ValidationResult
// ---------------------------------------------------------------------------

/// Aggregate outcome of one validation run.
///
/// ## Invariant
///
/// `valid == errors.is_empty()` whenever a result leaves a chain or a
/// validator service. Code that appends errors directly must call
/// [`ValidationResult::recompute_validity`] (or use [`add_error`]) before
/// handing the result on.
///
/// [`add_error`]: ValidationResult::add_error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// True iff there are no errors.
    pub valid: bool,
    /// Errors in the order they were produced.
    pub errors: Vec<ValidationError>,
    /// Warnings in the order they were produced.
    pub warnings: Vec<ValidationWarning>,
    /// Request echoes and engine diagnostics.
    pub context: ContextMap,
}

impl ValidationResult {
    /// Create an empty, valid result.
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            context: ContextMap::new(),
        }
    }

    /// Create an empty, valid result seeded with a context map.
    pub fn with_context(context: ContextMap) -> Self {
        Self {
            context,
            ..Self::new()
        }
    }

    /// Append an error. Marks the result invalid.
    pub fn add_error(&mut self, error: ValidationError) {
        self.valid = false;
        self.errors.push(error);
    }

    /// Append a warning. Validity is unchanged.
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Insert one context entry.
    pub fn set_context(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.context.insert(key.into(), value.into());
    }

    /// Re-derive `valid` from the error list.
    pub fn recompute_validity(&mut self) {
        self.valid = self.errors.is_empty();
    }

    /// Merge another result into this one: errors and warnings are appended
    /// in order, context entries from `other` overwrite existing keys.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.context.extend(other.context);
        self.recompute_validity();
    }

    /// Whether execution stopped because the caller cancelled it.
    pub fn is_cancelled(&self) -> bool {
        self.context
            .get(CANCELLED_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Rule IDs that actually executed, in order.
    pub fn executed_rules(&self) -> Vec<String> {
        self.context
            .get(EXECUTED_RULES_KEY)
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Code of the first error, if any.
    pub fn first_error_code(&self) -> Option<&str> {
        self.errors.first().map(|e| e.code.as_str())
    }

    /// Whether any error carries the given code.
    pub fn has_error(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// Whether any warning carries the given code.
    pub fn has_warning(&self, code: &str) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }

    /// All error codes in order.
    pub fn error_codes(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.code.as_str()).collect()
    }

    /// The most severe error severity present, if any errors exist.
    pub fn highest_severity(&self) -> Option<Severity> {
        self.errors
            .iter()
            .map(ValidationError::effective_severity)
            .min_by_key(Severity::rank)
    }

    /// Convert an invalid result into a [`ValidationFailedError`] for the
    /// given operation. Valid results pass through as `Ok(self)`.
    pub fn into_failure(
        self,
        operation: impl Into<String>,
    ) -> Result<ValidationResult, ValidationFailedError> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(ValidationFailedError::new(operation, self))
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

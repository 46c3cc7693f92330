//! # Error Types
//!
//! Two error types cross crate boundaries:
//!
//! - [`ValidationFailedError`]: an operation was rejected by business rules.
//!   It carries the full [`ValidationResult`] so API layers can render every
//!   error, not just the first.
//! - [`LookupError`]: a read-model collaborator failed. Rule catalogs inspect
//!   [`LookupError::is_not_found`] to turn missing references into validation
//!   codes instead of execution faults.

use thiserror::Error;

use crate::result::ValidationResult;
use crate::severity::{Severity, STATUS_BAD_REQUEST};

// ---------------------------------------------------------------------------
// ValidationFailedError
// ---------------------------------------------------------------------------

/// An operation failed business-rule validation.
///
/// The display text is the operation name followed by the first error code,
/// e.g. `CreateAssignment: ASSIGN_FTE_LIMIT`.
#[derive(Error, Debug, Clone)]
#[error("{}", failure_message(.operation, .result))]
pub struct ValidationFailedError {
    operation: String,
    result: ValidationResult,
}

fn failure_message(operation: &str, result: &ValidationResult) -> String {
    match result.first_error_code() {
        Some(code) => format!("{operation}: {code}"),
        None => operation.to_string(),
    }
}

impl ValidationFailedError {
    /// Wrap a result for the named operation.
    pub fn new(operation: impl Into<String>, result: ValidationResult) -> Self {
        Self {
            operation: operation.into(),
            result,
        }
    }

    /// The operation that was rejected.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// The full validation result.
    pub fn result(&self) -> &ValidationResult {
        &self.result
    }

    /// Consume the error and return the full validation result.
    pub fn into_result(self) -> ValidationResult {
        self.result
    }

    /// HTTP status derived from the most severe error. A result without
    /// errors still maps to 400.
    pub fn http_status(&self) -> u16 {
        self.result
            .highest_severity()
            .map(|s: Severity| s.http_status())
            .unwrap_or(STATUS_BAD_REQUEST)
    }
}

// ---------------------------------------------------------------------------
// LookupError
// ---------------------------------------------------------------------------

/// Failure reported by a read-model collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The referenced record does not exist.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of record (e.g. "organization", "job family").
        entity: String,
        /// The key that was looked up.
        key: String,
    },

    /// Any other backend failure. The message is reported verbatim.
    #[error("{0}")]
    Backend(String),
}

impl LookupError {
    /// Shorthand for [`LookupError::NotFound`].
    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Shorthand for [`LookupError::Backend`].
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Whether this error means "the referenced record does not exist".
    ///
    /// The `NotFound` variant always qualifies. Backend errors qualify when
    /// their text contains "not found" in any letter case, because some
    /// collaborators only surface driver messages.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Backend(message) => message.to_lowercase().contains("not found"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ValidationError;

    #[test]
    fn failure_message_includes_first_code() {
        let mut result = ValidationResult::new();
        result.add_error(ValidationError::new("ASSIGN_FTE_LIMIT", "fte"));
        result.add_error(ValidationError::new("POS_HEADCOUNT_EXCEEDED", "hc"));
        let err = ValidationFailedError::new("CreateAssignment", result);
        assert_eq!(err.to_string(), "CreateAssignment: ASSIGN_FTE_LIMIT");
    }

    #[test]
    fn failure_message_without_errors_is_operation() {
        let err = ValidationFailedError::new("CloseAssignment", ValidationResult::new());
        assert_eq!(err.to_string(), "CloseAssignment");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn failure_exposes_full_result() {
        let mut result = ValidationResult::new();
        result.add_error(
            ValidationError::new("JOB_CATALOG_NOT_FOUND", "missing").with_severity(Severity::Medium),
        );
        let err = ValidationFailedError::new("CreatePosition", result.clone());
        assert_eq!(err.operation(), "CreatePosition");
        assert_eq!(err.result(), &result);
        assert_eq!(err.http_status(), 422);
        assert_eq!(err.into_result(), result);
    }

    #[test]
    fn not_found_variant_is_not_found() {
        let err = LookupError::not_found("organization", "1000001");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "organization not found: 1000001");
    }

    #[test]
    fn backend_text_match_is_case_insensitive() {
        assert!(LookupError::backend("Depth NOT FOUND for 1000002").is_not_found());
        assert!(LookupError::backend("organization not found: 1").is_not_found());
        assert!(!LookupError::backend("connection reset by peer").is_not_found());
    }
}

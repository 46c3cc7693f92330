//! # Rules
//!
//! A [`Rule`] pairs a handler with the scheduling attributes the chain needs:
//! an ID, a priority, a default severity, and two stop-behaviour flags.

use std::fmt;
use std::sync::Arc;

use castle_core::{ContextMap, Severity, ValidationError, ValidationWarning};
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::RuleError;

/// Priority assigned to rules registered without one.
pub const DEFAULT_PRIORITY: i32 = 50;

/// Rule handler: evaluates one subject.
///
/// `Ok(None)` means "nothing to report". `Err` is an execution fault, not a
/// validation failure.
pub type RuleHandler<S> =
    Arc<dyn Fn(&ExecutionContext, &S) -> Result<Option<RuleOutcome>, RuleError> + Send + Sync>;

// ---------------------------------------------------------------------------
// RuleOutcome
// ---------------------------------------------------------------------------

/// What a rule reports after evaluating a subject.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
    /// Blocking violations.
    pub errors: Vec<ValidationError>,
    /// Advisories.
    pub warnings: Vec<ValidationWarning>,
    /// Diagnostics merged into the result under `rule:<ID>`.
    pub context: ContextMap,
}

impl RuleOutcome {
    /// An empty outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// An outcome carrying a single error.
    pub fn error(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
            ..Self::default()
        }
    }

    /// An outcome carrying a single warning.
    pub fn warning(warning: ValidationWarning) -> Self {
        Self {
            warnings: vec![warning],
            ..Self::default()
        }
    }

    /// Add a diagnostic context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Whether the outcome carries any error.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A registrable rule, built with chained setters.
///
/// ```ignore
/// let rule = Rule::new("ORG-DEPTH")
///     .priority(10)
///     .severity(Severity::High)
///     .short_circuit(true)
///     .handler(|_ctx, subject: &Subject| Ok(None));
/// ```
pub struct Rule<S> {
    pub(crate) id: String,
    pub(crate) severity: Severity,
    pub(crate) priority: Option<i32>,
    pub(crate) short_circuit: bool,
    pub(crate) telemetry_only: bool,
    pub(crate) handler: Option<RuleHandler<S>>,
}

impl<S> Rule<S> {
    /// Start a rule with the given ID. The ID is trimmed and upper-cased;
    /// severity defaults to HIGH and priority to [`DEFAULT_PRIORITY`].
    pub fn new(id: impl AsRef<str>) -> Self {
        Self {
            id: id.as_ref().trim().to_ascii_uppercase(),
            severity: Severity::default(),
            priority: None,
            short_circuit: false,
            telemetry_only: false,
            handler: None,
        }
    }

    /// Set the priority. Lower runs first.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the default severity for errors this rule emits.
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Set the severity from free-form text. Unrecognized text becomes HIGH.
    pub fn severity_text(mut self, raw: &str) -> Self {
        self.severity = Severity::normalize(raw);
        self
    }

    /// Stop the chain after this rule if it reports an error.
    pub fn short_circuit(mut self, enabled: bool) -> Self {
        self.short_circuit = enabled;
        self
    }

    /// Record this rule's results without letting it stop the chain.
    pub fn telemetry_only(mut self, enabled: bool) -> Self {
        self.telemetry_only = enabled;
        self
    }

    /// Attach the handler.
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ExecutionContext, &S) -> Result<Option<RuleOutcome>, RuleError>
            + Send
            + Sync
            + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Attach an already shared handler.
    pub fn shared_handler(mut self, handler: RuleHandler<S>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Normalized rule ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Effective priority.
    pub fn effective_priority(&self) -> i32 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    /// Default severity.
    pub fn default_severity(&self) -> Severity {
        self.severity
    }

    /// Whether the rule stops the chain on error.
    pub fn stops_on_error(&self) -> bool {
        self.short_circuit && !self.telemetry_only
    }
}

impl<S> Clone for Rule<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            severity: self.severity,
            priority: self.priority,
            short_circuit: self.short_circuit,
            telemetry_only: self.telemetry_only,
            handler: self.handler.clone(),
        }
    }
}

impl<S> fmt::Debug for Rule<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("severity", &self.severity)
            .field("priority", &self.effective_priority())
            .field("short_circuit", &self.short_circuit)
            .field("telemetry_only", &self.telemetry_only)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

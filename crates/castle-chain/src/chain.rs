//! # Validation Chain
//!
//! Registry plus executor. Rules are kept in registration order and sorted
//! lazily by `(priority, id)` the first time the chain executes after a
//! registration. Execution is a single synchronous pass.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use castle_core::result::{CANCELLED_KEY, EXECUTED_RULES_KEY, INTERNAL_KEY, OPERATION_KEY, RULE_ID_KEY};
use castle_core::{ContextMap, Severity, ValidationError, ValidationResult};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use serde_json::Value;
use tracing::{debug, debug_span, info, warn};

use crate::context::ExecutionContext;
use crate::error::{ChainError, RuleError};
use crate::metrics::{ChainOutcome, NoopMetrics, RuleOutcomeKind, ValidationMetrics};
use crate::rule::{Rule, RuleHandler, RuleOutcome};

/// Code of the synthetic error produced when a handler faults.
pub const RULE_EXECUTION_ERROR: &str = "RULE_EXECUTION_ERROR";

/// Prefix of the result context key a rule's outcome context is stored under.
pub const RULE_CONTEXT_PREFIX: &str = "rule:";

const UNKNOWN_OPERATION: &str = "unknown";

// ---------------------------------------------------------------------------
// ChainOptions
// ---------------------------------------------------------------------------

/// Construction options for a [`ValidationChain`].
#[derive(Clone)]
pub struct ChainOptions {
    /// Context every result starts from.
    pub base_context: ContextMap,
    /// Operation label used for tracing and metrics when the base context
    /// has no string `operation` entry.
    pub operation: Option<String>,
    /// Telemetry sink.
    pub metrics: Arc<dyn ValidationMetrics>,
}

impl ChainOptions {
    /// Empty context, no label, no-op metrics.
    pub fn new() -> Self {
        Self {
            base_context: ContextMap::new(),
            operation: None,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Replace the base context.
    pub fn with_base_context(mut self, context: ContextMap) -> Self {
        self.base_context = context;
        self
    }

    /// Insert one base context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.base_context.insert(key.into(), value.into());
        self
    }

    /// Set the operation label.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Set the metrics recorder.
    pub fn with_metrics(mut self, metrics: Arc<dyn ValidationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

impl Default for ChainOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChainOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainOptions")
            .field("base_context", &self.base_context)
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A rule that passed registration checks.
struct RegisteredRule<S> {
    id: String,
    priority: i32,
    severity: Severity,
    stops_on_error: bool,
    handler: RuleHandler<S>,
}

struct Registry<S> {
    rules: Vec<Arc<RegisteredRule<S>>>,
    sorted: bool,
}

// ---------------------------------------------------------------------------
// ValidationChain
// ---------------------------------------------------------------------------

/// Priority-ordered rule chain over subjects of type `S`.
///
/// Build one per operation; chains are not meant to be reused across
/// requests.
pub struct ValidationChain<S> {
    registry: RwLock<Registry<S>>,
    base_context: ContextMap,
    operation: Option<String>,
    metrics: Arc<dyn ValidationMetrics>,
}

impl<S> ValidationChain<S> {
    /// Create an empty chain.
    pub fn new(options: ChainOptions) -> Self {
        Self {
            registry: RwLock::new(Registry {
                rules: Vec::new(),
                sorted: true,
            }),
            base_context: options.base_context,
            operation: options.operation,
            metrics: options.metrics,
        }
    }

    /// Register a rule.
    ///
    /// Rejects an empty ID, a missing handler, and an ID that is already
    /// registered.
    pub fn register(&self, rule: Rule<S>) -> Result<(), ChainError> {
        if rule.id.is_empty() {
            return Err(ChainError::EmptyRuleId);
        }
        let priority = rule.effective_priority();
        let stops_on_error = rule.stops_on_error();
        let Rule {
            id,
            severity,
            handler,
            ..
        } = rule;
        let handler = handler.ok_or_else(|| ChainError::MissingHandler {
            rule_id: id.clone(),
        })?;

        let mut registry = self.registry.write();
        if registry.rules.iter().any(|existing| existing.id == id) {
            return Err(ChainError::DuplicateRuleId { rule_id: id });
        }
        registry.rules.push(Arc::new(RegisteredRule {
            id,
            priority,
            severity,
            stops_on_error,
            handler,
        }));
        registry.sorted = false;
        Ok(())
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.registry.read().rules.len()
    }

    /// Whether no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered rule IDs in execution order.
    pub fn rule_ids(&self) -> Vec<String> {
        self.ordered_rules()
            .iter()
            .map(|rule| rule.id.clone())
            .collect()
    }

    /// Label used for tracing and metrics.
    ///
    /// A string `operation` entry in the base context wins, then the
    /// configured label, then `"unknown"`.
    pub fn operation_label(&self) -> &str {
        self.base_context
            .get(OPERATION_KEY)
            .and_then(Value::as_str)
            .or(self.operation.as_deref())
            .unwrap_or(UNKNOWN_OPERATION)
    }

    /// Run every rule against `subject` and return the aggregated result.
    ///
    /// Never fails: execution faults and cancellation are reported inside the
    /// result.
    pub fn execute(&self, ctx: &ExecutionContext, subject: &S) -> ValidationResult {
        let started = Instant::now();
        let operation = self.operation_label().to_string();
        let span = debug_span!("validation_chain", operation = %operation);
        let _entered = span.enter();

        let rules = self.ordered_rules();
        let mut result = ValidationResult::with_context(self.base_context.clone());
        let mut executed: Vec<Value> = Vec::with_capacity(rules.len());
        // An empty chain still reports a cancellation that already happened.
        let mut cancelled = rules.is_empty() && ctx.is_cancelled();

        for rule in &rules {
            if ctx.is_cancelled() {
                info!(
                    rule_id = %rule.id,
                    executed = executed.len(),
                    "validation chain cancelled"
                );
                cancelled = true;
                break;
            }

            executed.push(Value::String(rule.id.clone()));
            let rule_started = Instant::now();

            match (rule.handler)(ctx, subject) {
                Err(err) => {
                    warn!(rule_id = %rule.id, error = %err, "validation rule failed to execute");
                    result.add_error(execution_error(&rule.id, &err));
                    self.metrics
                        .observe_rule(&rule.id, RuleOutcomeKind::Error, rule_started.elapsed());
                    if rule.stops_on_error {
                        debug!(rule_id = %rule.id, "short-circuit after execution fault");
                        break;
                    }
                }
                Ok(None) => {
                    debug!(rule_id = %rule.id, "rule passed");
                    self.metrics
                        .observe_rule(&rule.id, RuleOutcomeKind::Success, rule_started.elapsed());
                }
                Ok(Some(outcome)) => {
                    let kind = outcome_kind(&outcome);
                    let failed = outcome.has_errors();
                    debug!(
                        rule_id = %rule.id,
                        errors = outcome.errors.len(),
                        warnings = outcome.warnings.len(),
                        "rule evaluated"
                    );
                    merge_outcome(&mut result, rule, outcome);
                    self.metrics
                        .observe_rule(&rule.id, kind, rule_started.elapsed());
                    if failed && rule.stops_on_error {
                        debug!(rule_id = %rule.id, "short-circuit after rule failure");
                        break;
                    }
                }
            }
        }

        if cancelled {
            result.set_context(CANCELLED_KEY, true);
        }
        result.set_context(EXECUTED_RULES_KEY, Value::Array(executed));
        result.recompute_validity();

        let chain_outcome = if cancelled {
            ChainOutcome::Cancelled
        } else if result.valid {
            ChainOutcome::Success
        } else {
            ChainOutcome::Failed
        };
        self.metrics
            .observe_chain(&operation, chain_outcome, started.elapsed());
        debug!(
            outcome = chain_outcome.as_str(),
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "validation chain finished"
        );

        result
    }

    /// Snapshot of the rules in execution order, sorting first if a
    /// registration happened since the last sort.
    fn ordered_rules(&self) -> Vec<Arc<RegisteredRule<S>>> {
        let registry = self.registry.upgradable_read();
        if registry.sorted {
            return registry.rules.clone();
        }
        let mut registry = RwLockUpgradableReadGuard::upgrade(registry);
        registry
            .rules
            .sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        registry.sorted = true;
        registry.rules.clone()
    }
}

impl<S> fmt::Debug for ValidationChain<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationChain")
            .field("operation", &self.operation_label())
            .field("rules", &self.len())
            .finish()
    }
}

fn outcome_kind(outcome: &RuleOutcome) -> RuleOutcomeKind {
    if outcome.has_errors() {
        RuleOutcomeKind::Failed
    } else if !outcome.warnings.is_empty() {
        RuleOutcomeKind::Warning
    } else {
        RuleOutcomeKind::Success
    }
}

fn merge_outcome<S>(result: &mut ValidationResult, rule: &RegisteredRule<S>, outcome: RuleOutcome) {
    let RuleOutcome {
        errors,
        warnings,
        context,
    } = outcome;

    for mut error in errors {
        if error.severity.is_none() {
            error.severity = Some(rule.severity);
        }
        error
            .context
            .entry(RULE_ID_KEY)
            .or_insert_with(|| Value::String(rule.id.clone()));
        result.add_error(error);
    }

    for mut warning in warnings {
        warning
            .context
            .entry(RULE_ID_KEY)
            .or_insert_with(|| Value::String(rule.id.clone()));
        result.add_warning(warning);
    }

    if !context.is_empty() {
        result.set_context(format!("{RULE_CONTEXT_PREFIX}{}", rule.id), Value::Object(context));
    }
}

fn execution_error(rule_id: &str, err: &RuleError) -> ValidationError {
    ValidationError::new(
        RULE_EXECUTION_ERROR,
        format!("Rule {rule_id} failed to execute"),
    )
    .with_severity(Severity::Critical)
    .with_context(RULE_ID_KEY, rule_id)
    .with_context("error", err.to_string())
    .with_context(INTERNAL_KEY, true)
}

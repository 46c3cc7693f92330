//! # Validation Metrics
//!
//! Chains report per-rule and per-chain durations and outcomes through the
//! [`ValidationMetrics`] trait. [`NoopMetrics`] is the default recorder;
//! [`PrometheusMetrics`] records into four `prometheus` collectors that the
//! caller registers against its own [`Registry`].
//!
//! | Metric                                     | Type      | Labels                |
//! |--------------------------------------------|-----------|-----------------------|
//! | `castle_validation_rule_duration_seconds`  | histogram | `rule_id`, `outcome`  |
//! | `castle_validation_chain_duration_seconds` | histogram | `operation`, `outcome`|
//! | `castle_validation_rule_outcomes_total`    | counter   | `rule_id`, `outcome`  |
//! | `castle_validation_chain_outcomes_total`   | counter   | `operation`, `outcome`|

use std::time::Duration;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

/// How a single rule finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleOutcomeKind {
    /// No errors and no warnings.
    Success,
    /// Warnings only.
    Warning,
    /// At least one validation error.
    Failed,
    /// The handler faulted.
    Error,
}

impl RuleOutcomeKind {
    /// Metric label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Failed => "failed",
            Self::Error => "error",
        }
    }
}

/// How a whole chain finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainOutcome {
    /// The result is valid.
    Success,
    /// The result carries errors.
    Failed,
    /// Execution stopped on cancellation.
    Cancelled,
}

impl ChainOutcome {
    /// Metric label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Sink for chain telemetry. Implementations must be cheap and must not
/// fail: recording happens inline on the validation path.
pub trait ValidationMetrics: Send + Sync {
    /// Record one rule execution.
    fn observe_rule(&self, rule_id: &str, outcome: RuleOutcomeKind, elapsed: Duration);

    /// Record one chain execution.
    fn observe_chain(&self, operation: &str, outcome: ChainOutcome, elapsed: Duration);
}

/// Recorder that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl ValidationMetrics for NoopMetrics {
    fn observe_rule(&self, _rule_id: &str, _outcome: RuleOutcomeKind, _elapsed: Duration) {}

    fn observe_chain(&self, _operation: &str, _outcome: ChainOutcome, _elapsed: Duration) {}
}

// ---------------------------------------------------------------------------
// Prometheus
// ---------------------------------------------------------------------------

const DURATION_BUCKETS: [f64; 10] = [
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0,
];

/// Prometheus-backed recorder. Clones share the same collectors.
#[derive(Clone)]
pub struct PrometheusMetrics {
    rule_duration_seconds: HistogramVec,
    chain_duration_seconds: HistogramVec,
    rule_outcomes_total: IntCounterVec,
    chain_outcomes_total: IntCounterVec,
}

impl PrometheusMetrics {
    /// Build the collectors. Nothing is registered yet.
    pub fn new() -> Result<Self, prometheus::Error> {
        let rule_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "castle_validation_rule_duration_seconds",
                "Duration of individual validation rule executions in seconds",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["rule_id", "outcome"],
        )?;

        let chain_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "castle_validation_chain_duration_seconds",
                "Duration of validation chain executions in seconds",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["operation", "outcome"],
        )?;

        let rule_outcomes_total = IntCounterVec::new(
            Opts::new(
                "castle_validation_rule_outcomes_total",
                "Validation rule executions by outcome",
            ),
            &["rule_id", "outcome"],
        )?;

        let chain_outcomes_total = IntCounterVec::new(
            Opts::new(
                "castle_validation_chain_outcomes_total",
                "Validation chain executions by outcome",
            ),
            &["operation", "outcome"],
        )?;

        Ok(Self {
            rule_duration_seconds,
            chain_duration_seconds,
            rule_outcomes_total,
            chain_outcomes_total,
        })
    }

    /// Register all four collectors. Registering the same recorder twice
    /// fails with `AlreadyReg`.
    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.rule_duration_seconds.clone()))?;
        registry.register(Box::new(self.chain_duration_seconds.clone()))?;
        registry.register(Box::new(self.rule_outcomes_total.clone()))?;
        registry.register(Box::new(self.chain_outcomes_total.clone()))?;
        Ok(())
    }

    /// Current count for one rule/outcome pair.
    pub fn rule_outcome_count(&self, rule_id: &str, outcome: RuleOutcomeKind) -> u64 {
        self.rule_outcomes_total
            .with_label_values(&[rule_id, outcome.as_str()])
            .get()
    }

    /// Current count for one operation/outcome pair.
    pub fn chain_outcome_count(&self, operation: &str, outcome: ChainOutcome) -> u64 {
        self.chain_outcomes_total
            .with_label_values(&[operation, outcome.as_str()])
            .get()
    }
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics").finish_non_exhaustive()
    }
}

impl ValidationMetrics for PrometheusMetrics {
    fn observe_rule(&self, rule_id: &str, outcome: RuleOutcomeKind, elapsed: Duration) {
        let labels = [rule_id, outcome.as_str()];
        self.rule_duration_seconds
            .with_label_values(&labels)
            .observe(elapsed.as_secs_f64());
        self.rule_outcomes_total.with_label_values(&labels).inc();
    }

    fn observe_chain(&self, operation: &str, outcome: ChainOutcome, elapsed: Duration) {
        let labels = [operation, outcome.as_str()];
        self.chain_duration_seconds
            .with_label_values(&labels)
            .observe(elapsed.as_secs_f64());
        self.chain_outcomes_total.with_label_values(&labels).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_values() {
        assert_eq!(RuleOutcomeKind::Warning.as_str(), "warning");
        assert_eq!(RuleOutcomeKind::Error.as_str(), "error");
        assert_eq!(ChainOutcome::Cancelled.as_str(), "cancelled");
    }

    #[test]
    fn prometheus_counts_outcomes() {
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.observe_rule("ORG-DEPTH", RuleOutcomeKind::Failed, Duration::from_micros(40));
        metrics.observe_rule("ORG-DEPTH", RuleOutcomeKind::Failed, Duration::from_micros(60));
        metrics.observe_chain("CreateOrganization", ChainOutcome::Failed, Duration::from_millis(1));

        assert_eq!(metrics.rule_outcome_count("ORG-DEPTH", RuleOutcomeKind::Failed), 2);
        assert_eq!(metrics.rule_outcome_count("ORG-DEPTH", RuleOutcomeKind::Success), 0);
        assert_eq!(metrics.chain_outcome_count("CreateOrganization", ChainOutcome::Failed), 1);
    }

    #[test]
    fn register_exposes_metric_families_once() {
        let registry = Registry::new();
        let metrics = PrometheusMetrics::new().unwrap();
        metrics.register(&registry).unwrap();
        metrics.observe_chain("UpdateOrganization", ChainOutcome::Success, Duration::ZERO);
        metrics.observe_rule("ORG-STATUS", RuleOutcomeKind::Success, Duration::ZERO);

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"castle_validation_chain_outcomes_total".to_string()));
        assert!(names.contains(&"castle_validation_rule_duration_seconds".to_string()));

        assert!(metrics.register(&registry).is_err());
    }
}

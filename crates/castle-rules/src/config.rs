//! # Validation Configuration
//!
//! Hierarchy limits and the metrics switch. Defaults match production;
//! override through the environment:
//!
//! | Variable                    | Default |
//! |-----------------------------|---------|
//! | `CASTLE_ORG_MAX_DEPTH`      | 17      |
//! | `CASTLE_ORG_DEPTH_WARNING`  | 15      |
//! | `CASTLE_VALIDATION_METRICS` | false   |

use std::sync::Arc;

use castle_chain::{NoopMetrics, PrometheusMetrics, ValidationMetrics};
use prometheus::Registry;

use crate::hierarchy::HierarchyLimits;

/// Environment variable overriding the maximum hierarchy depth.
pub const ENV_MAX_DEPTH: &str = "CASTLE_ORG_MAX_DEPTH";
/// Environment variable overriding the depth warning threshold.
pub const ENV_DEPTH_WARNING: &str = "CASTLE_ORG_DEPTH_WARNING";
/// Environment variable enabling Prometheus metrics.
pub const ENV_METRICS: &str = "CASTLE_VALIDATION_METRICS";

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set to something unparseable.
    #[error("invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// Raw value.
        value: String,
        /// What was expected.
        reason: &'static str,
    },

    /// The warning threshold lies above the maximum depth.
    #[error("depth warning threshold {warning_threshold} exceeds max depth {max_depth}")]
    InconsistentLimits {
        /// Configured maximum.
        max_depth: u32,
        /// Configured warning threshold.
        warning_threshold: u32,
    },
}

/// Validation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationConfig {
    /// Organization depth limits.
    pub hierarchy: HierarchyLimits,
    /// Whether chains record Prometheus metrics.
    pub metrics_enabled: bool,
}

impl ValidationConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = HierarchyLimits::default();
        let max_depth = parse_depth(ENV_MAX_DEPTH, lookup(ENV_MAX_DEPTH), defaults.max_depth)?;
        let warning_threshold = parse_depth(
            ENV_DEPTH_WARNING,
            lookup(ENV_DEPTH_WARNING),
            defaults.warning_threshold,
        )?;
        let metrics_enabled = match lookup(ENV_METRICS) {
            None => false,
            Some(raw) => parse_flag(ENV_METRICS, &raw)?,
        };

        let config = Self {
            hierarchy: HierarchyLimits {
                max_depth,
                warning_threshold,
            },
            metrics_enabled,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hierarchy.warning_threshold > self.hierarchy.max_depth {
            return Err(ConfigError::InconsistentLimits {
                max_depth: self.hierarchy.max_depth,
                warning_threshold: self.hierarchy.warning_threshold,
            });
        }
        Ok(())
    }

    /// The metrics recorder chains should use.
    ///
    /// With metrics disabled this is a [`NoopMetrics`] and `registry` is left
    /// untouched. Otherwise a fresh [`PrometheusMetrics`] is registered
    /// against `registry`; call this once per registry.
    pub fn metrics_recorder(
        &self,
        registry: &Registry,
    ) -> Result<Arc<dyn ValidationMetrics>, prometheus::Error> {
        if !self.metrics_enabled {
            return Ok(Arc::new(NoopMetrics));
        }
        let metrics = PrometheusMetrics::new()?;
        metrics.register(registry)?;
        Ok(Arc::new(metrics))
    }
}

fn parse_depth(var: &str, raw: Option<String>, default: u32) -> Result<u32, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw,
            reason: "expected a positive integer",
        }),
    }
}

fn parse_flag(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw.to_string(),
            reason: "expected true or false",
        }),
    }
}

#![deny(missing_docs)]

//! # castle-chain: Business-Rule Chain Engine
//!
//! A [`ValidationChain`] is a small, per-operation registry of [`Rule`]s. The
//! caller builds a fresh chain, registers the rules relevant to the
//! operation, and executes it once against a subject assembled from freshly
//! loaded read-models.
//!
//! ## Execution Model
//!
//! - Rules run one at a time in ascending `(priority, id)` order.
//! - The [`ExecutionContext`] is checked for cancellation before every rule.
//!   Cancellation is reported in the result, never as an error.
//! - A handler fault becomes a CRITICAL `RULE_EXECUTION_ERROR` marked
//!   `internal`.
//! - A short-circuit rule that produces at least one error stops the chain
//!   unless it is telemetry-only.
//!
//! The engine owns no threads and is generic over the subject type, so rule
//! catalogs decide how subjects are shaped.

pub mod chain;
pub mod context;
pub mod error;
pub mod metrics;
pub mod rule;

pub use chain::{ChainOptions, ValidationChain, RULE_CONTEXT_PREFIX, RULE_EXECUTION_ERROR};
pub use context::ExecutionContext;
pub use error::{ChainError, RuleError};
pub use metrics::{
    ChainOutcome, NoopMetrics, PrometheusMetrics, RuleOutcomeKind, ValidationMetrics,
};
pub use rule::{Rule, RuleHandler, RuleOutcome, DEFAULT_PRIORITY};

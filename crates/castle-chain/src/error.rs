//! # Chain Errors
//!
//! [`ChainError`] rejects malformed registrations. [`RuleError`] is what a
//! rule handler returns when it cannot evaluate at all; the chain converts it
//! into a synthetic validation error, so it never escapes `execute`.

use castle_core::LookupError;
use thiserror::Error;

/// A rule could not be registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// The rule ID was empty after trimming.
    #[error("rule id must not be empty")]
    EmptyRuleId,

    /// The rule was registered without a handler.
    #[error("rule {rule_id} has no handler")]
    MissingHandler {
        /// Normalized ID of the offending rule.
        rule_id: String,
    },

    /// A rule with the same normalized ID is already registered.
    #[error("rule {rule_id} is already registered")]
    DuplicateRuleId {
        /// Normalized ID of the offending rule.
        rule_id: String,
    },
}

/// A rule handler failed to evaluate.
#[derive(Error, Debug)]
pub enum RuleError {
    /// The rule was given a subject variant it does not understand.
    #[error("{rule_id} rule: unsupported subject {actual}, expected {expected}")]
    UnsupportedSubject {
        /// Rule that rejected the subject.
        rule_id: String,
        /// Subject kinds the rule accepts.
        expected: &'static str,
        /// Subject kind it received.
        actual: &'static str,
    },

    /// A read-model lookup failed with something other than "not found".
    #[error("{operation} failed: {source}")]
    Lookup {
        /// What the rule was trying to load.
        operation: String,
        /// Underlying lookup failure.
        #[source]
        source: LookupError,
    },

    /// Any other evaluation failure.
    #[error("{0}")]
    Other(String),
}

impl RuleError {
    /// Shorthand for [`RuleError::Lookup`].
    pub fn lookup(operation: impl Into<String>, source: LookupError) -> Self {
        Self::Lookup {
            operation: operation.into(),
            source,
        }
    }
}

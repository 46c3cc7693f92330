//! # Severity Taxonomy
//!
//! Four severity levels attached to every [`crate::ValidationError`]. Severity
//! controls how a failure is presented (HTTP status, display ordering) and
//! never whether a result is valid.

use serde::{Deserialize, Serialize};

/// HTTP status for client errors (CRITICAL, HIGH, and anything unrecognized).
pub const STATUS_BAD_REQUEST: u16 = 400;
/// HTTP status for MEDIUM severity failures.
pub const STATUS_UNPROCESSABLE_ENTITY: u16 = 422;
/// HTTP status for LOW severity failures.
pub const STATUS_OK: u16 = 200;

/// Severity of a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Data integrity is at stake (cycles, terminal-state mutation, internal faults).
    Critical,
    /// A business rule blocks the operation.
    High,
    /// The request is well-formed but references unusable data.
    Medium,
    /// Informational failure.
    Low,
}

impl Severity {
    /// All severities, most severe first.
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    /// Return the canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }

    /// Parse a severity name, case-insensitively and ignoring surrounding
    /// whitespace. Returns `None` for anything outside the four known levels.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Some(Self::Critical),
            "HIGH" => Some(Self::High),
            "MEDIUM" => Some(Self::Medium),
            "LOW" => Some(Self::Low),
            _ => None,
        }
    }

    /// Normalize free-form severity text. Unrecognized input becomes `High`.
    pub fn normalize(raw: &str) -> Self {
        Self::parse(raw).unwrap_or(Self::High)
    }

    /// Ordering rank: 0 for `Critical` up to 3 for `Low`.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// HTTP status code a failure of this severity is reported with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Critical | Self::High => STATUS_BAD_REQUEST,
            Self::Medium => STATUS_UNPROCESSABLE_ENTITY,
            Self::Low => STATUS_OK,
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::High
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map raw severity text to an HTTP status code.
///
/// CRITICAL/HIGH → 400, MEDIUM → 422, LOW → 200. Anything unrecognized fails
/// closed to 400.
pub fn severity_to_http_status(raw: &str) -> u16 {
    Severity::parse(raw)
        .map(|s| s.http_status())
        .unwrap_or(STATUS_BAD_REQUEST)
}

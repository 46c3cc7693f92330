//! # Calendar Dates
//!
//! Every date crossing the validation boundary is a calendar day in
//! `YYYY-MM-DD` form. No time-of-day or timezone is involved: effective
//! dating is day-granular.

use chrono::NaiveDate;
use thiserror::Error;

/// The only accepted date layout.
pub const DATE_LAYOUT: &str = "%Y-%m-%d";

/// Date text that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateParseError {
    /// The input was empty after trimming.
    #[error("effective date is required")]
    Missing,
    /// The input did not match `YYYY-MM-DD` or named an impossible day.
    #[error("invalid date {input:?}: expected YYYY-MM-DD")]
    Malformed {
        /// The trimmed input.
        input: String,
    },
}

/// Parse a `YYYY-MM-DD` date, ignoring surrounding whitespace.
pub fn parse_effective_date(raw: &str) -> Result<NaiveDate, DateParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DateParseError::Missing);
    }
    NaiveDate::parse_from_str(trimmed, DATE_LAYOUT).map_err(|_| DateParseError::Malformed {
        input: trimmed.to_string(),
    })
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_LAYOUT).to_string()
}

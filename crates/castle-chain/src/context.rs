//! # Execution Context
//!
//! Per-call state threaded through every rule handler: the caller's
//! cancellation token and the reference date rules treat as "today".

use chrono::{NaiveDate, Utc};
use tokio_util::sync::CancellationToken;

/// Per-call execution state.
///
/// Cloning is cheap and clones share the same cancellation token.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    cancellation: CancellationToken,
    reference_date: Option<NaiveDate>,
}

impl ExecutionContext {
    /// A context that is never cancelled unless [`cancel`](Self::cancel) is
    /// called, with "today" taken from the system clock (UTC).
    pub fn new() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            reference_date: None,
        }
    }

    /// Use the caller's cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Pin "today" to a fixed date.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// The underlying cancellation token.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether the caller has cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// The date rules compare start dates against.
    pub fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

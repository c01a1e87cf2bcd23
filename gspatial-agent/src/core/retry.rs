//! Cross-attempt retry bookkeeping for query execution.
//!
//! The context moves `Pending -> {Success, Error}`; `Error` goes back to
//! `Pending` when another attempt begins. `Success` is terminal for a run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum failed executions per question.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Number of failed queries surfaced to the synthesizer.
pub const DEFAULT_CONTEXT_QUERIES: usize = 3;

/// Status of the most recent execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetryStatus {
    /// No attempt has finished yet, or a new attempt is underway.
    #[default]
    Pending,
    /// The last attempt succeeded.
    Success,
    /// The last attempt failed.
    Error,
}

impl fmt::Display for RetryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Accumulated record of execution attempts for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryContext {
    /// Failed executions so far.
    pub attempts: u32,
    /// Failed executions allowed before the run gives up.
    pub max_attempts: u32,
    /// Most recent failure message.
    pub last_error: Option<String>,
    /// Every query submitted for execution, in submission order.
    pub previous_queries: Vec<String>,
    /// Status of the most recent attempt.
    pub status: RetryStatus,
}

impl Default for RetryContext {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryContext {
    /// Creates a fresh context.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            last_error: None,
            previous_queries: Vec::new(),
            status: RetryStatus::Pending,
        }
    }

    /// Marks the start of an attempt and records the query about to run.
    ///
    /// Returns false, recording nothing, when the budget is exhausted.
    pub fn begin_attempt(&mut self, query: &str) -> bool {
        if self.is_exhausted() || self.status == RetryStatus::Success {
            return false;
        }
        self.status = RetryStatus::Pending;
        self.previous_queries.push(query.to_string());
        true
    }

    /// Records a successful attempt.
    pub fn record_success(&mut self) {
        self.status = RetryStatus::Success;
        self.last_error = None;
    }

    /// Records a failed attempt.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.status = RetryStatus::Error;
        self.last_error = Some(error.into());
        self.attempts += 1;
    }

    /// Returns true once no further attempt may be made.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Returns true if the last attempt failed and budget remains.
    #[must_use]
    pub fn should_retry(&self) -> bool {
        self.status == RetryStatus::Error && !self.is_exhausted()
    }

    /// Number of execution attempts made (successful or not).
    #[must_use]
    pub fn executions(&self) -> usize {
        self.previous_queries.len()
    }

    /// The last `n` submitted queries, oldest first.
    #[must_use]
    pub fn recent_queries(&self, n: usize) -> &[String] {
        let start = self.previous_queries.len().saturating_sub(n);
        &self.previous_queries[start..]
    }

    /// Renders the advisory block handed to the synthesizer on a retry.
    ///
    /// Returns `None` unless the last attempt failed.
    #[must_use]
    pub fn error_context(&self, recent: usize) -> Option<String> {
        if self.status != RetryStatus::Error {
            return None;
        }
        let mut block = format!(
            "The previous query failed with the following error:\nError: {}\nAttempt: {} of {}\nPrevious queries that failed:",
            self.last_error.as_deref().unwrap_or("Unknown error"),
            self.attempts,
            self.max_attempts,
        );
        for query in self.recent_queries(recent) {
            block.push_str("\n- ");
            block.push_str(query);
        }
        Some(block)
    }
}

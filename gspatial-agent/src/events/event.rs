//! Pipeline lifecycle events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stages::StageId;

/// An event emitted while a question is being answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// A run began.
    #[serde(rename = "run.started")]
    RunStarted {
        /// Run identifier.
        run_id: Uuid,
        /// The question being answered.
        question: String,
        /// Start time.
        timestamp: DateTime<Utc>,
    },
    /// A stage began.
    #[serde(rename = "stage.started")]
    StageStarted {
        /// Run identifier.
        run_id: Uuid,
        /// The stage.
        stage: StageId,
    },
    /// A stage finished.
    #[serde(rename = "stage.completed")]
    StageCompleted {
        /// Run identifier.
        run_id: Uuid,
        /// The stage.
        stage: StageId,
        /// Wall-clock duration.
        duration_ms: f64,
        /// The error the stage recorded, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// An execution failed and the query will be regenerated.
    #[serde(rename = "execution.retry")]
    ExecutionRetry {
        /// Run identifier.
        run_id: Uuid,
        /// Failed executions so far.
        attempt: u32,
        /// Failed executions allowed.
        max_attempts: u32,
        /// The failure.
        error: String,
    },
    /// A run finished.
    #[serde(rename = "run.completed")]
    RunCompleted {
        /// Run identifier.
        run_id: Uuid,
        /// True if the answer is grounded in query results.
        success: bool,
        /// Execution attempts made.
        executions: usize,
        /// Wall-clock duration.
        duration_ms: f64,
    },
}

impl PipelineEvent {
    /// Dotted event type, e.g. `stage.completed`.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run.started",
            Self::StageStarted { .. } => "stage.started",
            Self::StageCompleted { .. } => "stage.completed",
            Self::ExecutionRetry { .. } => "execution.retry",
            Self::RunCompleted { .. } => "run.completed",
        }
    }

    /// The run this event belongs to.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::StageStarted { run_id, .. }
            | Self::StageCompleted { run_id, .. }
            | Self::ExecutionRetry { run_id, .. }
            | Self::RunCompleted { run_id, .. } => *run_id,
        }
    }
}

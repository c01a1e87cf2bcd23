//! The per-question state threaded through every stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Entities, QueryType, RetryContext};

/// One result row: column name to value.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// State of a single pipeline run.
///
/// Created fresh per question and dropped when the run ends. Stages never
/// mutate it directly; they return a [`StateUpdate`] which the orchestrator
/// applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    question: String,
    /// Classified query type.
    pub query_type: Option<QueryType>,
    /// Extracted entities.
    pub entities: Option<Entities>,
    /// Most recently synthesized query.
    pub query_text: Option<String>,
    /// Records from the last successful execution.
    pub result_records: Option<Vec<Record>>,
    /// Final answer.
    pub response_text: Option<String>,
    /// Error from the last stage that reported one.
    pub error: Option<String>,
    /// Execution retry bookkeeping.
    pub retry: RetryContext,
}

impl PipelineState {
    /// Creates the state for a new question.
    #[must_use]
    pub fn new(question: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            question: question.into(),
            query_type: None,
            entities: None,
            query_text: None,
            result_records: None,
            response_text: None,
            error: None,
            retry: RetryContext::new(max_attempts),
        }
    }

    /// The question this run answers.
    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Unique identifier of this run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// When the run started.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Merges a stage delta into the state.
    pub fn apply(&mut self, update: StateUpdate) {
        match update {
            StateUpdate::Classified(query_type) => self.query_type = Some(query_type),
            StateUpdate::Extracted(entities) => self.entities = entities,
            StateUpdate::Synthesized { query_text, error } => {
                self.query_text = query_text;
                self.error = error;
            }
            StateUpdate::Executed { records, error, retry } => {
                self.result_records = records;
                self.error = error;
                self.retry = retry;
            }
            StateUpdate::Responded(text) => self.response_text = Some(text),
        }
    }

    /// Returns true if the run produced records.
    #[must_use]
    pub fn has_results(&self) -> bool {
        self.result_records.is_some()
    }
}

/// Partial update returned by a stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    /// Output of the classifier.
    Classified(QueryType),
    /// Output of the entity extractor; `None` if the model call failed.
    Extracted(Option<Entities>),
    /// Output of the query synthesizer.
    Synthesized {
        /// The query, if synthesis succeeded.
        query_text: Option<String>,
        /// The synthesis error, if it failed.
        error: Option<String>,
    },
    /// Output of one execution attempt.
    Executed {
        /// Records, if execution succeeded.
        records: Option<Vec<Record>>,
        /// The execution error, if it failed.
        error: Option<String>,
        /// Retry context after the attempt.
        retry: RetryContext,
    },
    /// Output of the response synthesizer.
    Responded(String),
}

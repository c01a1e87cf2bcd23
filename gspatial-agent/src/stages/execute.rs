//! Cypher execution against the graph database.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::{Stage, StageId};
use crate::core::{PipelineState, Record, RetryContext, StateUpdate};
use crate::errors::DatabaseError;
use crate::providers::GraphDatabase;

/// Runs synthesized queries and keeps the retry bookkeeping.
///
/// Each attempt opens its own session and releases it before returning,
/// including on failure, timeout and cancellation.
#[derive(Clone)]
pub struct QueryExecutor {
    db: Arc<dyn GraphDatabase>,
    timeout: Duration,
}

impl fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl QueryExecutor {
    /// Creates an executor with a per-attempt timeout.
    pub fn new(db: Arc<dyn GraphDatabase>, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    /// Runs one attempt and updates `retry` with the outcome.
    ///
    /// Refuses without touching the database once the budget is spent.
    pub async fn run_attempt(&self, query: &str, retry: &mut RetryContext) -> Result<Vec<Record>, String> {
        if !retry.begin_attempt(query) {
            return Err(retry.last_error.clone().unwrap_or_else(|| {
                format!("Retry limit of {} attempts reached", retry.max_attempts)
            }));
        }

        match self.run_scoped(query).await {
            Ok(records) => {
                retry.record_success();
                tracing::info!(rows = records.len(), "Query succeeded");
                Ok(records)
            }
            Err(e) => {
                let message = e.to_string();
                retry.record_failure(message.clone());
                tracing::warn!(
                    error = %message,
                    attempt = retry.attempts,
                    max_attempts = retry.max_attempts,
                    transient = e.is_transient(),
                    "Query failed"
                );
                Err(message)
            }
        }
    }

    async fn run_scoped(&self, query: &str) -> Result<Vec<Record>, DatabaseError> {
        let attempt = async {
            let mut session = self.db.open_session().await?;
            session.run(query).await
        };
        tokio::time::timeout(self.timeout, attempt)
            .await
            .unwrap_or_else(|_| {
                Err(DatabaseError::Timeout {
                    seconds: self.timeout.as_secs_f64(),
                })
            })
    }
}

#[async_trait]
impl Stage for QueryExecutor {
    fn id(&self) -> StageId {
        StageId::ExecuteCypher
    }

    async fn execute(&self, state: &PipelineState) -> StateUpdate {
        let mut retry = state.retry.clone();
        let Some(query) = state.query_text.as_deref() else {
            return StateUpdate::Executed {
                records: None,
                error: Some("No query to execute".to_string()),
                retry,
            };
        };

        match self.run_attempt(query, &mut retry).await {
            Ok(records) => StateUpdate::Executed {
                records: Some(records),
                error: None,
                retry,
            },
            Err(error) => StateUpdate::Executed {
                records: None,
                error: Some(error),
                retry,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RetryStatus;
    use crate::testing::ScriptedGraph;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        let mut r = Record::new();
        r.insert("result".into(), value);
        r
    }

    #[tokio::test]
    async fn test_success_records_rows() {
        let graph = Arc::new(ScriptedGraph::from_results(vec![Ok(vec![record(json!(12345.6))])]));
        let executor = QueryExecutor::new(graph.clone(), Duration::from_secs(5));
        let mut state = PipelineState::new("q", 5);
        state.query_text = Some("RETURN 1".into());

        let StateUpdate::Executed { records, error, retry } = executor.execute(&state).await else {
            panic!("unexpected update");
        };

        assert!(error.is_none());
        assert_eq!(records, Some(vec![record(json!(12345.6))]));
        assert_eq!(retry.status, RetryStatus::Success);
        assert_eq!(retry.attempts, 0);
        assert_eq!(retry.previous_queries, vec!["RETURN 1".to_string()]);
        assert_eq!(graph.queries(), vec!["RETURN 1".to_string()]);
        assert_eq!(graph.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_failure_releases_session() {
        let graph = Arc::new(ScriptedGraph::from_results(vec![Err(DatabaseError::query(
            "Neo.ClientError.Statement.SyntaxError",
            "Unknown function 'AREAA'",
        ))]));
        let executor = QueryExecutor::new(graph.clone(), Duration::from_secs(5));
        let mut retry = RetryContext::new(5);

        let err = executor.run_attempt("CALL AREAA()", &mut retry).await.unwrap_err();

        assert_eq!(
            err,
            "Neo.ClientError.Statement.SyntaxError: Unknown function 'AREAA'"
        );
        assert_eq!(retry.attempts, 1);
        assert_eq!(retry.status, RetryStatus::Error);
        assert_eq!(retry.last_error.as_deref(), Some(err.as_str()));
        assert_eq!(graph.sessions_opened(), 1);
        assert_eq!(graph.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_timeout_releases_session() {
        let graph = Arc::new(ScriptedGraph::from_results(vec![Ok(vec![])]).with_delay(Duration::from_millis(500)));
        let executor = QueryExecutor::new(graph.clone(), Duration::from_millis(20));
        let mut retry = RetryContext::new(5);

        let err = executor.run_attempt("RETURN 1", &mut retry).await.unwrap_err();

        assert!(err.starts_with("Query timed out"));
        assert_eq!(retry.attempts, 1);
        assert_eq!(graph.sessions_opened(), 1);
        assert_eq!(graph.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_context_refuses() {
        let graph = Arc::new(ScriptedGraph::from_results(vec![Ok(vec![])]));
        let executor = QueryExecutor::new(graph.clone(), Duration::from_secs(5));
        let mut retry = RetryContext::new(1);
        retry.begin_attempt("q1");
        retry.record_failure("boom");

        let err = executor.run_attempt("q2", &mut retry).await.unwrap_err();

        assert_eq!(err, "boom");
        assert_eq!(retry.executions(), 1);
        assert_eq!(graph.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn test_missing_query_is_an_error() {
        let graph = Arc::new(ScriptedGraph::default());
        let executor = QueryExecutor::new(graph.clone(), Duration::from_secs(5));
        let state = PipelineState::new("q", 5);

        let update = executor.execute(&state).await;

        assert_eq!(
            update,
            StateUpdate::Executed {
                records: None,
                error: Some("No query to execute".into()),
                retry: RetryContext::new(5),
            }
        );
        assert_eq!(graph.sessions_opened(), 0);
    }
}

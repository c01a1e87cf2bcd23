//! Query-type classification.

use async_trait::async_trait;

use super::{ModelHandle, Stage, StageId};
use crate::core::{PipelineState, QueryType, StateUpdate};
use crate::prompts;

/// Maps a question to one of the five query types.
///
/// Unrecognized output and failed model calls both resolve to
/// [`QueryType::Topological`].
#[derive(Debug, Clone)]
pub struct QueryClassifier {
    model: ModelHandle,
    schema: String,
}

impl QueryClassifier {
    /// Creates a classifier.
    #[must_use]
    pub fn new(model: ModelHandle, schema: impl Into<String>) -> Self {
        Self {
            model,
            schema: schema.into(),
        }
    }

    /// Classifies a question.
    pub async fn classify(&self, question: &str) -> QueryType {
        let prompt = prompts::classification_prompt(question, &self.schema);
        match self.model.complete(StageId::ClassifyQuery, &prompt).await {
            Ok(output) => {
                let query_type = QueryType::from_model_output(&output);
                if query_type.as_str() != output.trim().to_uppercase() {
                    tracing::info!(raw = %output.trim(), "Unrecognized query type, defaulting to TOPOLOGICAL");
                }
                query_type
            }
            Err(e) => {
                tracing::warn!(error = %e, "Classification failed, defaulting to TOPOLOGICAL");
                QueryType::default()
            }
        }
    }
}

#[async_trait]
impl Stage for QueryClassifier {
    fn id(&self) -> StageId {
        StageId::ClassifyQuery
    }

    async fn execute(&self, state: &PipelineState) -> StateUpdate {
        StateUpdate::Classified(self.classify(state.question()).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LlmError;
    use crate::providers::CompletionParams;
    use crate::testing::ScriptedModel;
    use std::sync::Arc;
    use std::time::Duration;

    fn classifier(model: ScriptedModel) -> QueryClassifier {
        let handle = ModelHandle::new(
            Arc::new(model),
            CompletionParams::deterministic("test"),
            Duration::from_secs(5),
        );
        QueryClassifier::new(handle, "")
    }

    #[tokio::test]
    async fn test_valid_label() {
        let stage = classifier(ScriptedModel::new(["SINGLE"]));
        assert_eq!(stage.classify("What is the area of Park X?").await, QueryType::Single);
    }

    #[tokio::test]
    async fn test_lowercase_label_with_whitespace() {
        let stage = classifier(ScriptedModel::new(["  buffer \n"]));
        assert_eq!(stage.classify("q").await, QueryType::Buffer);
    }

    #[tokio::test]
    async fn test_malformed_output_defaults() {
        let stage = classifier(ScriptedModel::new(["I think this is a DISTANCE question"]));
        assert_eq!(stage.classify("q").await, QueryType::Topological);
    }

    #[tokio::test]
    async fn test_model_failure_defaults() {
        let stage = classifier(ScriptedModel::from_results(vec![Err(LlmError::Http(
            "connection refused".into(),
        ))]));
        assert_eq!(stage.classify("q").await, QueryType::Topological);
    }

    #[tokio::test]
    async fn test_prompt_contains_question_and_schema() {
        let model = Arc::new(ScriptedModel::new(["SET"]));
        let handle = ModelHandle::new(
            model.clone(),
            CompletionParams::deterministic("test"),
            Duration::from_secs(5),
        );
        let stage = QueryClassifier::new(handle, "(:Park {name})");
        let state = PipelineState::new("Union of parks and lakes", 5);

        let update = stage.execute(&state).await;

        assert_eq!(update, StateUpdate::Classified(QueryType::Set));
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Question: Union of parks and lakes"));
        assert!(prompts[0].contains("(:Park {name})"));
    }
}

//! The five pipeline stages.
//!
//! Every stage reads a subset of the [`PipelineState`] and returns a
//! [`StateUpdate`]; none of them mutate the state or return an error.

mod classify;
mod execute;
mod extract;
mod respond;
mod synthesize;

pub use classify::QueryClassifier;
pub use execute::QueryExecutor;
pub use extract::EntityExtractor;
pub use respond::{apology, format_result_preview, ResponseSynthesizer};
pub use synthesize::{strip_code_fence, QuerySynthesizer};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Duration;

use crate::core::{PipelineState, StateUpdate};
use crate::errors::LlmError;
use crate::providers::{CompletionParams, LanguageModel};

/// Identifies a stage in events and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Query-type classification.
    ClassifyQuery,
    /// Entity extraction.
    ExtractEntities,
    /// Cypher synthesis.
    GenerateCypher,
    /// Cypher execution.
    ExecuteCypher,
    /// Natural-language answer.
    GenerateResponse,
}

impl StageId {
    /// Stages in execution order.
    pub const ORDER: [Self; 5] = [
        Self::ClassifyQuery,
        Self::ExtractEntities,
        Self::GenerateCypher,
        Self::ExecuteCypher,
        Self::GenerateResponse,
    ];

    /// Snake-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ClassifyQuery => "classify_query",
            Self::ExtractEntities => "extract_entities",
            Self::GenerateCypher => "generate_cypher",
            Self::ExecuteCypher => "execute_cypher",
            Self::GenerateResponse => "generate_response",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for pipeline stages.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the stage identifier.
    fn id(&self) -> StageId;

    /// Computes this stage's delta from the current state.
    async fn execute(&self, state: &PipelineState) -> StateUpdate;
}

/// A language model bound to fixed parameters and a timeout.
#[derive(Clone)]
pub struct ModelHandle {
    llm: Arc<dyn LanguageModel>,
    params: CompletionParams,
    timeout: Duration,
}

impl Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("model", &self.params.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ModelHandle {
    /// Binds a model to parameters and a per-call timeout.
    pub fn new(llm: Arc<dyn LanguageModel>, params: CompletionParams, timeout: Duration) -> Self {
        Self { llm, params, timeout }
    }

    /// Runs one completion, mapping an elapsed timeout to [`LlmError::Timeout`].
    pub async fn complete(&self, stage: StageId, prompt: &str) -> Result<String, LlmError> {
        match tokio::time::timeout(self.timeout, self.llm.complete(prompt, &self.params)).await {
            Ok(Ok(completion)) => {
                tracing::debug!(
                    stage = %stage,
                    model = %completion.model,
                    total_tokens = completion.total_tokens(),
                    latency_ms = completion.latency_ms,
                    "Model call completed"
                );
                Ok(completion.content)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(LlmError::Timeout {
                seconds: self.timeout.as_secs_f64(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Completion, MockLanguageModel};

    #[test]
    fn test_stage_order_and_names() {
        let names: Vec<_> = StageId::ORDER.iter().map(StageId::as_str).collect();
        assert_eq!(
            names,
            vec![
                "classify_query",
                "extract_entities",
                "generate_cypher",
                "execute_cypher",
                "generate_response"
            ]
        );
        assert_eq!(
            serde_json::to_string(&StageId::ExecuteCypher).unwrap(),
            r#""execute_cypher""#
        );
    }

    #[tokio::test]
    async fn test_model_handle_passes_params() {
        let mut llm = MockLanguageModel::new();
        llm.expect_complete()
            .withf(|prompt, params| prompt == "hello" && params.temperature == 0.0 && params.model == "m")
            .times(1)
            .returning(|_, _| Ok(Completion::text("world", "m", "mock")));

        let handle = ModelHandle::new(
            Arc::new(llm),
            CompletionParams::deterministic("m"),
            Duration::from_secs(5),
        );
        let text = handle.complete(StageId::ClassifyQuery, "hello").await.unwrap();
        assert_eq!(text, "world");
    }

    #[tokio::test]
    async fn test_model_handle_times_out() {
        let llm = crate::testing::ScriptedModel::new(["late"]).with_delay(Duration::from_millis(200));
        let handle = ModelHandle::new(
            Arc::new(llm),
            CompletionParams::deterministic("m"),
            Duration::from_millis(20),
        );
        let err = handle.complete(StageId::GenerateCypher, "p").await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout { .. }));
    }
}

//! Cypher synthesis.

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

use super::{ModelHandle, Stage, StageId};
use crate::core::{PipelineState, StateUpdate, DEFAULT_CONTEXT_QUERIES};
use crate::prompts;

#[allow(clippy::expect_used)]
static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)```(?i:cypher)?\n([\s\S]*?)```$").expect("valid fence pattern"));

/// Extracts the query from model output.
///
/// Takes the body of the first fenced block if there is one, then removes
/// any leftover fence markers and trims.
#[must_use]
pub fn strip_code_fence(raw: &str) -> String {
    let body = FENCED_BLOCK
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or(raw, |m| m.as_str());
    body.trim().replace("```", "").trim().to_string()
}

/// Generates a Cypher query from the classified question.
#[derive(Debug, Clone)]
pub struct QuerySynthesizer {
    model: ModelHandle,
    schema: String,
    context_queries: usize,
}

impl QuerySynthesizer {
    /// Creates a synthesizer.
    #[must_use]
    pub fn new(model: ModelHandle, schema: impl Into<String>) -> Self {
        Self {
            model,
            schema: schema.into(),
            context_queries: DEFAULT_CONTEXT_QUERIES,
        }
    }

    /// Sets how many failed queries are surfaced on a retry.
    #[must_use]
    pub fn with_context_queries(mut self, n: usize) -> Self {
        self.context_queries = n;
        self
    }

    /// Synthesizes a query, returning the query text or an error description.
    pub async fn synthesize(&self, state: &PipelineState) -> Result<String, String> {
        let entities = state
            .entities
            .as_ref()
            .map(crate::core::Entities::to_prompt_string)
            .unwrap_or_default();
        let error_context = state.retry.error_context(self.context_queries);
        let prompt = prompts::cypher_generation_prompt(
            state.question(),
            state.query_type.unwrap_or_default(),
            &entities,
            &self.schema,
            error_context.as_deref(),
        );

        let output = self
            .model
            .complete(StageId::GenerateCypher, &prompt)
            .await
            .map_err(|e| format!("Failed to generate Cypher query: {e}"))?;

        let query = strip_code_fence(&output);
        if query.is_empty() {
            return Err("Failed to generate Cypher query: model returned an empty query".to_string());
        }
        Ok(query)
    }
}

#[async_trait]
impl Stage for QuerySynthesizer {
    fn id(&self) -> StageId {
        StageId::GenerateCypher
    }

    async fn execute(&self, state: &PipelineState) -> StateUpdate {
        match self.synthesize(state).await {
            Ok(query) => {
                tracing::debug!(query = %query, retry = state.retry.attempts, "Synthesized query");
                StateUpdate::Synthesized {
                    query_text: Some(query),
                    error: None,
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "Query synthesis failed");
                StateUpdate::Synthesized {
                    query_text: None,
                    error: Some(error),
                }
            }
        }
    }
}

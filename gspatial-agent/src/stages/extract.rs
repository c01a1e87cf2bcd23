//! Entity extraction.

use async_trait::async_trait;

use super::{ModelHandle, Stage, StageId};
use crate::core::{Entities, PipelineState, StateUpdate};
use crate::prompts;

/// Extracts named entities from a question.
///
/// Output that does not parse is kept as raw text. A failed model call
/// leaves the entities unset.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    model: ModelHandle,
}

impl EntityExtractor {
    /// Creates an extractor.
    #[must_use]
    pub fn new(model: ModelHandle) -> Self {
        Self { model }
    }

    /// Extracts entities from a question.
    pub async fn extract(&self, question: &str) -> Option<Entities> {
        let prompt = prompts::entity_extraction_prompt(question);
        match self.model.complete(StageId::ExtractEntities, &prompt).await {
            Ok(output) => {
                let entities = Entities::parse(&output);
                if entities.is_degraded() {
                    tracing::info!("Entity output is not a JSON entity list, keeping raw text");
                }
                Some(entities)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Entity extraction failed");
                None
            }
        }
    }
}

#[async_trait]
impl Stage for EntityExtractor {
    fn id(&self) -> StageId {
        StageId::ExtractEntities
    }

    async fn execute(&self, state: &PipelineState) -> StateUpdate {
        StateUpdate::Extracted(self.extract(state.question()).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Entity;
    use crate::errors::LlmError;
    use crate::providers::CompletionParams;
    use crate::testing::ScriptedModel;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn extractor(model: ScriptedModel) -> EntityExtractor {
        EntityExtractor::new(ModelHandle::new(
            Arc::new(model),
            CompletionParams::deterministic("test"),
            Duration::from_secs(5),
        ))
    }

    #[tokio::test]
    async fn test_structured_entities() {
        let stage = extractor(ScriptedModel::new([r#"[{"type":"location","value":"Park X"}]"#]));
        assert_eq!(
            stage.extract("What is the area of Park X?").await,
            Some(Entities::Structured(vec![Entity::new("location", "Park X")]))
        );
    }

    #[tokio::test]
    async fn test_unparseable_output_is_kept_verbatim() {
        let raw = "Locations: Seoul Station; distance: 1km";
        let stage = extractor(ScriptedModel::new([raw]));
        assert_eq!(stage.extract("q").await, Some(Entities::Raw(raw.to_string())));
    }

    #[tokio::test]
    async fn test_model_failure_leaves_entities_unset() {
        let stage = extractor(ScriptedModel::from_results(vec![Err(LlmError::EmptyCompletion)]));
        let state = PipelineState::new("q", 5);
        assert_eq!(stage.execute(&state).await, StateUpdate::Extracted(None));
    }
}

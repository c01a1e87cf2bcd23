//! Sequencing of the five stages and the execution retry loop.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::config::AgentConfig;
use crate::core::{PipelineState, StateUpdate};
use crate::errors::AgentError;
use crate::events::{EventSink, NoOpEventSink, PipelineEvent};
use crate::providers::{CompletionParams, GraphDatabase, LanguageModel, Neo4jHttpClient, OpenAiChatModel};
use crate::stages::{
    EntityExtractor, ModelHandle, QueryClassifier, QueryExecutor, QuerySynthesizer,
    ResponseSynthesizer, Stage,
};

/// Answers questions by running the stage pipeline.
///
/// Holds only immutable collaborators, so one orchestrator can serve any
/// number of concurrent runs. Each run owns its own [`PipelineState`].
pub struct Orchestrator {
    classifier: QueryClassifier,
    extractor: EntityExtractor,
    synthesizer: QuerySynthesizer,
    executor: QueryExecutor,
    responder: ResponseSynthesizer,
    max_attempts: u32,
    sink: Arc<dyn EventSink>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("classifier", &self.classifier)
            .field("executor", &self.executor)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Wires the stages to the given collaborators.
    pub fn new(llm: Arc<dyn LanguageModel>, db: Arc<dyn GraphDatabase>, config: &AgentConfig) -> Self {
        let model = ModelHandle::new(llm, CompletionParams::from(&config.llm), config.llm.timeout());
        let schema = config.pipeline.schema.as_str();
        Self {
            classifier: QueryClassifier::new(model.clone(), schema),
            extractor: EntityExtractor::new(model.clone()),
            synthesizer: QuerySynthesizer::new(model.clone(), schema)
                .with_context_queries(config.pipeline.error_context_queries),
            executor: QueryExecutor::new(db, config.neo4j.timeout()),
            responder: ResponseSynthesizer::new(model).with_preview_rows(config.pipeline.preview_rows),
            max_attempts: config.pipeline.max_attempts,
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Builds the HTTP clients described by `config` and wires them up.
    pub fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        config.validate()?;
        let llm = Arc::new(OpenAiChatModel::new(&config.llm)?);
        let db = Arc::new(Neo4jHttpClient::new(&config.neo4j)?);
        Ok(Self::new(llm, db, config))
    }

    /// Sets the sink receiving lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Maximum failed executions per question.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Answers one question.
    ///
    /// Never fails: every stage error is recorded on the returned state and
    /// `response_text` is always set.
    pub async fn run(&self, question: &str) -> PipelineState {
        let state = PipelineState::new(question, self.max_attempts);
        let span = tracing::info_span!("pipeline_run", run_id = %state.run_id());
        self.run_state(state).instrument(span).await
    }

    async fn run_state(&self, mut state: PipelineState) -> PipelineState {
        let started = Instant::now();
        let run_id = state.run_id();
        tracing::info!(question = %state.question(), "Run started");
        self.sink
            .emit(&PipelineEvent::RunStarted {
                run_id,
                question: state.question().to_string(),
                timestamp: state.started_at(),
            })
            .await;

        self.step(&self.classifier, &mut state).await;
        self.step(&self.extractor, &mut state).await;

        loop {
            self.step(&self.synthesizer, &mut state).await;
            if state.query_text.is_none() {
                break;
            }
            self.step(&self.executor, &mut state).await;
            if !state.retry.should_retry() {
                break;
            }
            let error = state.error.clone().unwrap_or_default();
            tracing::info!(
                attempt = state.retry.attempts,
                max_attempts = state.retry.max_attempts,
                error = %error,
                "Regenerating query after failed execution"
            );
            self.sink
                .emit(&PipelineEvent::ExecutionRetry {
                    run_id,
                    attempt: state.retry.attempts,
                    max_attempts: state.retry.max_attempts,
                    error,
                })
                .await;
        }

        self.step(&self.responder, &mut state).await;

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        let success = state.error.is_none() && state.has_results();
        tracing::info!(
            success,
            executions = state.retry.executions(),
            duration_ms,
            "Run completed"
        );
        self.sink
            .emit(&PipelineEvent::RunCompleted {
                run_id,
                success,
                executions: state.retry.executions(),
                duration_ms,
            })
            .await;
        state
    }

    async fn step(&self, stage: &dyn Stage, state: &mut PipelineState) {
        let id = stage.id();
        let run_id = state.run_id();
        self.sink.emit(&PipelineEvent::StageStarted { run_id, stage: id }).await;

        let started = Instant::now();
        let update = stage
            .execute(state)
            .instrument(tracing::info_span!("stage", stage = %id))
            .await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        let error = match &update {
            StateUpdate::Synthesized { error, .. } | StateUpdate::Executed { error, .. } => error.clone(),
            _ => None,
        };
        tracing::debug!(stage = %id, duration_ms, failed = error.is_some(), "Stage completed");
        state.apply(update);

        self.sink
            .emit(&PipelineEvent::StageCompleted {
                run_id,
                stage: id,
                duration_ms,
                error,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LlmConfig, PipelineConfig};
    use crate::errors::ConfigError;
    use crate::testing::{ScriptedGraph, ScriptedModel};

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let config = AgentConfig::new()
            .with_llm(LlmConfig::default().with_api_key("sk-test"))
            .with_pipeline(PipelineConfig::new().with_max_attempts(0));
        let err = Orchestrator::from_config(&config).unwrap_err();
        assert!(matches!(err, AgentError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_oversized_timeout_is_rejected_not_panicking() {
        let config = AgentConfig::new().with_llm(LlmConfig::default().with_api_key("sk").with_timeout(1e20));
        let err = Orchestrator::from_config(&config).unwrap_err();
        assert!(matches!(err, AgentError::Config(ConfigError::Invalid { ref field, .. }) if field == "llm.timeout_seconds"));

        let orchestrator = Orchestrator::new(
            Arc::new(ScriptedModel::new(["SINGLE"])),
            Arc::new(ScriptedGraph::default()),
            &config,
        );
        assert_eq!(orchestrator.max_attempts(), 5);
    }

    #[test]
    fn test_from_config_builds_clients() {
        let config = AgentConfig::new().with_llm(LlmConfig::default().with_api_key("sk-test"));
        let orchestrator = Orchestrator::from_config(&config).unwrap();
        assert_eq!(orchestrator.max_attempts(), 5);
    }

    #[test]
    fn test_new_uses_configured_attempts() {
        let config = AgentConfig::new().with_pipeline(PipelineConfig::new().with_max_attempts(2));
        let orchestrator = Orchestrator::new(
            Arc::new(ScriptedModel::new(["SINGLE"])),
            Arc::new(ScriptedGraph::default()),
            &config,
        );
        assert_eq!(orchestrator.max_attempts(), 2);
    }
}

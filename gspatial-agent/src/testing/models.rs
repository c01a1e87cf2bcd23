//! Scripted language model.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use crate::errors::LlmError;
use crate::providers::{Completion, CompletionParams, LanguageModel};

type Responder = Box<dyn Fn(&str) -> Result<String, LlmError> + Send + Sync>;

/// A language model that replays queued replies.
///
/// Replies are consumed in order; once the queue is drained the last reply
/// repeats. Every prompt is recorded.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    last: Mutex<Option<Result<String, LlmError>>>,
    responder: Option<Responder>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl fmt::Debug for ScriptedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedModel")
            .field("queued", &self.replies.lock().len())
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

impl ScriptedModel {
    /// Creates a model replying with the given texts.
    #[must_use]
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(replies.into_iter().map(|r| Ok(r.into())).collect())
    }

    /// Creates a model replying with the given results, errors included.
    #[must_use]
    pub fn from_results(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            responder: None,
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Creates a model that computes each reply from the prompt.
    #[must_use]
    pub fn responding<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        let mut model = Self::from_results(Vec::new());
        model.responder = Some(Box::new(responder));
        model
    }

    /// Delays every reply.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Number of calls received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    fn next_reply(&self, prompt: &str) -> Result<String, LlmError> {
        if let Some(responder) = &self.responder {
            return responder(prompt);
        }
        let mut last = self.last.lock();
        if let Some(reply) = self.replies.lock().pop_front() {
            *last = Some(reply);
        }
        last.clone().unwrap_or(Err(LlmError::EmptyCompletion))
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str, params: &CompletionParams) -> Result<Completion, LlmError> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let content = self.next_reply(prompt)?;
        Ok(Completion::text(content, params.model.clone(), "scripted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_in_order_then_repeat_last() {
        let model = ScriptedModel::new(["a", "b"]);
        let params = CompletionParams::deterministic("m");
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(model.complete("p", &params).await.unwrap().content);
        }
        assert_eq!(seen, vec!["a", "b", "b"]);
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_script_fails() {
        let model = ScriptedModel::new(Vec::<String>::new());
        let err = model.complete("p", &CompletionParams::deterministic("m")).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyCompletion));
    }

    #[tokio::test]
    async fn test_responder_sees_prompt() {
        let model = ScriptedModel::responding(|p| Ok(p.to_uppercase()));
        let reply = model.complete("abc", &CompletionParams::deterministic("m")).await.unwrap();
        assert_eq!(reply.content, "ABC");
        assert_eq!(model.prompts(), vec!["abc".to_string()]);
    }
}

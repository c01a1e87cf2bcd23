//! OpenAI-compatible chat-completions client.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Instant;

use super::llm::{Completion, CompletionParams, LanguageModel};
use crate::config::LlmConfig;
use crate::errors::LlmError;

const PROVIDER: &str = "openai";

/// Chat-completions client over HTTP.
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl OpenAiChatModel {
    /// Creates a client from configuration.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LlmError::Http(e.to_string()))?;
        Ok(Self::with_client(client, &config.api_key, &config.base_url))
    }

    /// Creates a client around an existing `reqwest` client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, api_key: &str, base_url: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn complete(
        &self,
        prompt: &str,
        params: &CompletionParams,
    ) -> Result<Completion, LlmError> {
        let mut body = serde_json::json!({
            "model": params.model,
            "temperature": params.temperature,
            "messages": [{"role": "user", "content": prompt}],
        });
        if let Some(max_tokens) = params.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        tracing::debug!(
            model = %params.model,
            prompt_len = prompt.len(),
            "Calling chat completions"
        );

        let started = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout { seconds: started.elapsed().as_secs_f64() }
                } else {
                    LlmError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            tracing::warn!(status_code = status.as_u16(), error_body = %body, "Chat completions returned error status");
            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited { body });
            }
            return Err(LlmError::Status { code: status.as_u16(), body });
        }

        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;
        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::InvalidResponse(format!("{e} - body: {text}")))?;

        let choice = parsed.choices.into_iter().next().ok_or(LlmError::EmptyCompletion)?;
        let content = choice.message.content.ok_or(LlmError::EmptyCompletion)?;

        Ok(Completion {
            content,
            model: parsed.model.unwrap_or_else(|| params.model.clone()),
            provider: PROVIDER.to_string(),
            input_tokens: parsed.usage.as_ref().map(|u| u.prompt_tokens),
            output_tokens: parsed.usage.as_ref().map(|u| u.completion_tokens),
            latency_ms: Some(started.elapsed().as_secs_f64() * 1000.0),
            finish_reason: choice.finish_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn model_for(server: &Server) -> OpenAiChatModel {
        OpenAiChatModel::with_client(reqwest::Client::new(), "test-key", &server.url())
    }

    #[tokio::test]
    async fn test_complete_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4.1-mini",
                "temperature": 0.0,
                "messages": [{"role": "user", "content": "Classify this"}],
            })))
            .with_status(200)
            .with_body(
                r#"{
                    "model": "gpt-4.1-mini-2025-04-14",
                    "choices": [{"message": {"role": "assistant", "content": "SINGLE"}, "finish_reason": "stop"}],
                    "usage": {"prompt_tokens": 42, "completion_tokens": 1, "total_tokens": 43}
                }"#,
            )
            .create_async()
            .await;

        let completion = model_for(&server)
            .complete("Classify this", &CompletionParams::deterministic("gpt-4.1-mini"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(completion.content, "SINGLE");
        assert_eq!(completion.model, "gpt-4.1-mini-2025-04-14");
        assert_eq!(completion.provider, "openai");
        assert_eq!(completion.total_tokens(), 43);
        assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn test_configured_max_tokens_sent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(serde_json::json!({"max_tokens": 256})))
            .with_status(200)
            .with_body(r#"{"model": "m", "choices": [{"message": {"content": "SET"}}]}"#)
            .create_async()
            .await;

        let config = crate::config::LlmConfig::default().with_model("m").with_max_tokens(256);
        let completion = model_for(&server)
            .complete("p", &CompletionParams::from(&config))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(completion.content, "SET");
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let err = model_for(&server)
            .complete("p", &CompletionParams::deterministic("m"))
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::RateLimited { ref body } if body == "slow down"));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_error_status() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error": {"message": "bad key"}}"#)
            .create_async()
            .await;

        let err = model_for(&server)
            .complete("p", &CompletionParams::deterministic("m"))
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Status { code: 401, .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = model_for(&server)
            .complete("p", &CompletionParams::deterministic("m"))
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_no_choices() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let err = model_for(&server)
            .complete("p", &CompletionParams::deterministic("m"))
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::EmptyCompletion));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let model = OpenAiChatModel::with_client(reqwest::Client::new(), "k", "http://localhost:8080/v1/");
        assert_eq!(model.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}

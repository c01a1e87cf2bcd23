//! Configuration for the agent and its collaborators.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Language-model settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Graph-database settings.
    #[serde(default)]
    pub neo4j: Neo4jConfig,
    /// Pipeline behavior.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl AgentConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from the environment.
    ///
    /// `OPENAI_API_KEY` is required; `OPENAI_MODEL`, `OPENAI_BASE_URL`,
    /// `NEO4J_URI`, `NEO4J_USERNAME`, `NEO4J_PASSWORD` and `NEO4J_DATABASE`
    /// override the defaults when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| ConfigError::MissingEnv {
            name: "OPENAI_API_KEY".to_string(),
        })?;

        let mut config = Self::default();
        config.llm.api_key = api_key;
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.llm.model = model;
        }
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.llm.base_url = base_url;
        }
        if let Ok(uri) = std::env::var("NEO4J_URI") {
            config.neo4j.uri = uri;
        }
        if let Ok(username) = std::env::var("NEO4J_USERNAME") {
            config.neo4j.username = username;
        }
        if let Ok(password) = std::env::var("NEO4J_PASSWORD") {
            config.neo4j.password = password;
        }
        if let Ok(database) = std::env::var("NEO4J_DATABASE") {
            config.neo4j.database = database;
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the LLM configuration.
    #[must_use]
    pub fn with_llm(mut self, llm: LlmConfig) -> Self {
        self.llm = llm;
        self
    }

    /// Sets the Neo4j configuration.
    #[must_use]
    pub fn with_neo4j(mut self, neo4j: Neo4jConfig) -> Self {
        self.neo4j = neo4j;
        self
    }

    /// Sets the pipeline configuration.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Checks every section for unusable values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.llm.validate()?;
        self.neo4j.validate()?;
        self.pipeline.validate()
    }
}

/// Language-model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key sent as a bearer token.
    #[serde(default)]
    pub api_key: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of the chat-completions API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sampling temperature. Must stay at 0.
    #[serde(default)]
    pub temperature: f32,
    /// Per-call timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: f64,
    /// Optional cap on generated tokens per call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_timeout() -> f64 {
    60.0
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            temperature: 0.0,
            timeout_seconds: default_llm_timeout(),
            max_tokens: None,
        }
    }
}

impl LlmConfig {
    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Sets the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the token cap.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Gets timeout as Duration.
    ///
    /// Falls back to the default when the value is not a representable
    /// number of seconds.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        seconds_or(self.timeout_seconds, default_llm_timeout())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::invalid("llm.model", "must not be empty"));
        }
        if self.temperature != 0.0 {
            return Err(ConfigError::invalid(
                "llm.temperature",
                "sampling must be deterministic (0.0)",
            ));
        }
        check_timeout("llm.timeout_seconds", self.timeout_seconds)?;
        Ok(())
    }
}

/// Neo4j settings for the HTTP transactional endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    /// HTTP endpoint, e.g. `http://localhost:7474`.
    #[serde(default = "default_neo4j_uri")]
    pub uri: String,
    /// Basic-auth user.
    #[serde(default = "default_neo4j_username")]
    pub username: String,
    /// Basic-auth password.
    #[serde(default)]
    pub password: String,
    /// Database name.
    #[serde(default = "default_neo4j_database")]
    pub database: String,
    /// Per-query timeout in seconds.
    #[serde(default = "default_neo4j_timeout")]
    pub timeout_seconds: f64,
    /// Maximum number of concurrently open sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_neo4j_uri() -> String {
    "http://localhost:7474".to_string()
}

fn default_neo4j_username() -> String {
    "neo4j".to_string()
}

fn default_neo4j_database() -> String {
    "neo4j".to_string()
}

fn default_neo4j_timeout() -> f64 {
    30.0
}

fn default_max_sessions() -> usize {
    4
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: default_neo4j_uri(),
            username: default_neo4j_username(),
            password: String::new(),
            database: default_neo4j_database(),
            timeout_seconds: default_neo4j_timeout(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl Neo4jConfig {
    /// Sets the endpoint.
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    /// Sets the credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the database name.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Gets timeout as Duration.
    ///
    /// Falls back to the default when the value is not a representable
    /// number of seconds.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        seconds_or(self.timeout_seconds, default_neo4j_timeout())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.uri.trim().is_empty() {
            return Err(ConfigError::invalid("neo4j.uri", "must not be empty"));
        }
        check_timeout("neo4j.timeout_seconds", self.timeout_seconds)?;
        if self.max_sessions == 0 {
            return Err(ConfigError::invalid("neo4j.max_sessions", "must be at least 1"));
        }
        Ok(())
    }
}

fn seconds_or(seconds: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or_else(|_| Duration::from_secs_f64(fallback))
}

fn check_timeout(field: &str, seconds: f64) -> Result<(), ConfigError> {
    match Duration::try_from_secs_f64(seconds) {
        Ok(duration) if !duration.is_zero() => Ok(()),
        _ => Err(ConfigError::invalid(field, "must be a positive, finite number of seconds")),
    }
}

/// Pipeline behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of failed executions before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Schema description handed to the classifier and synthesizer.
    #[serde(default)]
    pub schema: String,
    /// Number of records shown to the response model.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    /// Number of failed queries surfaced in the retry error context.
    #[serde(default = "default_error_context_queries")]
    pub error_context_queries: usize,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_preview_rows() -> usize {
    5
}

fn default_error_context_queries() -> usize {
    3
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            schema: String::new(),
            preview_rows: default_preview_rows(),
            error_context_queries: default_error_context_queries(),
        }
    }
}

impl PipelineConfig {
    /// Creates a pipeline configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the schema text.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("pipeline.max_attempts", "must be at least 1"));
        }
        if self.preview_rows == 0 {
            return Err(ConfigError::invalid("pipeline.preview_rows", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_KEYS: [&str; 7] = [
        "OPENAI_API_KEY",
        "OPENAI_MODEL",
        "OPENAI_BASE_URL",
        "NEO4J_URI",
        "NEO4J_USERNAME",
        "NEO4J_PASSWORD",
        "NEO4J_DATABASE",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.llm.model, "gpt-4.1-mini");
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.neo4j.database, "neo4j");
        assert_eq!(config.pipeline.max_attempts, 5);
        assert_eq!(config.pipeline.preview_rows, 5);
        assert_eq!(config.pipeline.error_context_queries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: AgentConfig =
            serde_json::from_str(r#"{"pipeline": {"max_attempts": 2}, "neo4j": {"uri": "http://db:7474"}}"#)
                .unwrap();
        assert_eq!(config.pipeline.max_attempts, 2);
        assert_eq!(config.pipeline.preview_rows, 5);
        assert_eq!(config.neo4j.uri, "http://db:7474");
        assert_eq!(config.neo4j.username, "neo4j");
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_validate_rejects_nondeterministic_sampling() {
        let mut config = AgentConfig::default();
        config.llm.temperature = 0.7;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("llm.temperature"));
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = AgentConfig::default()
            .with_pipeline(PipelineConfig::new().with_max_attempts(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = AgentConfig::default().with_neo4j(Neo4jConfig::default().with_timeout(0.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unrepresentable_timeouts() {
        for seconds in [1e20, f64::INFINITY, f64::NAN, -1.0, 1e-12] {
            let llm = AgentConfig::default().with_llm(LlmConfig::default().with_api_key("sk").with_timeout(seconds));
            let err = llm.validate().unwrap_err();
            assert!(err.to_string().contains("llm.timeout_seconds"), "{seconds}");

            let neo4j = AgentConfig::default().with_neo4j(Neo4jConfig::default().with_timeout(seconds));
            let err = neo4j.validate().unwrap_err();
            assert!(err.to_string().contains("neo4j.timeout_seconds"), "{seconds}");
        }
    }

    #[test]
    fn test_timeout_falls_back_instead_of_panicking() {
        assert_eq!(LlmConfig::default().with_timeout(1e20).timeout(), Duration::from_secs(60));
        assert_eq!(Neo4jConfig::default().with_timeout(f64::INFINITY).timeout(), Duration::from_secs(30));
        assert_eq!(Neo4jConfig::default().with_timeout(2.5).timeout(), Duration::from_millis(2500));
    }

    #[test]
    #[serial]
    fn test_from_env_requires_api_key() {
        clear_env();
        let err = AgentConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv { ref name } if name == "OPENAI_API_KEY"));
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("OPENAI_MODEL", "gpt-4o");
        std::env::set_var("NEO4J_URI", "http://graph:7474");
        std::env::set_var("NEO4J_PASSWORD", "secret");

        let config = AgentConfig::from_env().unwrap();
        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.neo4j.uri, "http://graph:7474");
        assert_eq!(config.neo4j.password, "secret");
        assert_eq!(config.neo4j.username, "neo4j");

        clear_env();
    }
}

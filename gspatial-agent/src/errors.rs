//! Error types for the gspatial agent.
//!
//! Stage-level failures never escape the pipeline; they are rendered to
//! strings and recorded on the [`PipelineState`](crate::core::PipelineState).
//! The typed errors here exist so collaborators can classify failures
//! (transient vs permanent) before they are flattened.

use thiserror::Error;

/// The main error type for agent operations outside the pipeline boundary.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A language-model call failed.
    #[error("{0}")]
    Llm(#[from] LlmError),

    /// A graph-database call failed.
    #[error("{0}")]
    Database(#[from] DatabaseError),

    /// Configuration was missing or invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by a language-model collaborator.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// The request could not be sent or the connection dropped.
    #[error("LLM request failed: {0}")]
    Http(String),

    /// The provider rejected the request because of rate limiting.
    #[error("LLM rate limit exceeded: {body}")]
    RateLimited {
        /// Response body returned by the provider.
        body: String,
    },

    /// The provider answered with a non-success status.
    #[error("LLM provider returned status {code}: {body}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Response body returned by the provider.
        body: String,
    },

    /// The provider answered, but the body could not be understood.
    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),

    /// The call did not complete within the configured timeout.
    #[error("LLM call timed out after {seconds}s")]
    Timeout {
        /// The timeout that elapsed.
        seconds: f64,
    },

    /// The provider returned no completion content.
    #[error("LLM returned an empty completion")]
    EmptyCompletion,
}

impl LlmError {
    /// Returns true if retrying the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited { .. } | Self::Timeout { .. } => true,
            Self::Status { code, .. } => *code >= 500,
            Self::InvalidResponse(_) | Self::EmptyCompletion => false,
        }
    }
}

/// Errors raised by a graph-database collaborator.
#[derive(Debug, Clone, Error)]
pub enum DatabaseError {
    /// The database could not be reached.
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// The database rejected or failed the query.
    #[error("{code}: {message}")]
    Query {
        /// Database-specific error code (e.g. `Neo.ClientError.Statement.SyntaxError`).
        code: String,
        /// Human-readable message from the database.
        message: String,
    },

    /// The database answered, but the body could not be understood.
    #[error("Invalid database response: {0}")]
    InvalidResponse(String),

    /// The query did not complete within the configured timeout.
    #[error("Query timed out after {seconds}s")]
    Timeout {
        /// The timeout that elapsed.
        seconds: f64,
    },

    /// No session could be acquired.
    #[error("Database session unavailable: {0}")]
    SessionUnavailable(String),
}

impl DatabaseError {
    /// Creates a query error.
    #[must_use]
    pub fn query(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Returns true if the failure is unrelated to the query text itself.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout { .. } | Self::SessionUnavailable(_) => true,
            Self::Query { code, .. } => code.starts_with("Neo.TransientError"),
            Self::InvalidResponse(_) => false,
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("{name} environment variable not set")]
    MissingEnv {
        /// The variable name.
        name: String,
    },

    /// A field holds an unusable value.
    #[error("Invalid configuration for '{field}': {reason}")]
    Invalid {
        /// The offending field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid-field error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_transient_classification() {
        assert!(LlmError::Http("reset".into()).is_transient());
        assert!(LlmError::RateLimited { body: String::new() }.is_transient());
        assert!(LlmError::Timeout { seconds: 1.0 }.is_transient());
        assert!(LlmError::Status { code: 503, body: String::new() }.is_transient());
        assert!(!LlmError::Status { code: 401, body: String::new() }.is_transient());
        assert!(!LlmError::InvalidResponse("x".into()).is_transient());
        assert!(!LlmError::EmptyCompletion.is_transient());
    }

    #[test]
    fn test_database_error_display() {
        let err = DatabaseError::query(
            "Neo.ClientError.Statement.SyntaxError",
            "Invalid input 'RETRUN'",
        );
        assert_eq!(
            err.to_string(),
            "Neo.ClientError.Statement.SyntaxError: Invalid input 'RETRUN'"
        );
        assert!(!err.is_transient());
    }

    #[test]
    fn test_database_transient_codes() {
        let err = DatabaseError::query("Neo.TransientError.Transaction.DeadlockDetected", "deadlock");
        assert!(err.is_transient());
        assert!(DatabaseError::Timeout { seconds: 2.0 }.is_transient());
        assert!(DatabaseError::Connection("refused".into()).is_transient());
    }

    #[test]
    fn test_agent_error_from_conversions() {
        let err: AgentError = ConfigError::MissingEnv { name: "OPENAI_API_KEY".into() }.into();
        assert!(matches!(err, AgentError::Config(_)));
        assert_eq!(err.to_string(), "OPENAI_API_KEY environment variable not set");

        let err: AgentError = LlmError::EmptyCompletion.into();
        assert!(matches!(err, AgentError::Llm(_)));
    }

    #[test]
    fn test_config_error_invalid() {
        let err = ConfigError::invalid("max_attempts", "must be at least 1");
        assert!(err.to_string().contains("max_attempts"));
        assert!(err.to_string().contains("must be at least 1"));
    }
}

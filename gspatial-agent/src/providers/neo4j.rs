//! Neo4j client over the HTTP transactional endpoint.
//!
//! Each query is sent to `/db/{database}/tx/commit` as a single-statement
//! auto-commit transaction. Sessions are permits from a bounded semaphore.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::graph::{GraphDatabase, GraphSession};
use crate::config::Neo4jConfig;
use crate::core::Record;
use crate::errors::DatabaseError;

/// Neo4j HTTP client.
#[derive(Debug, Clone)]
pub struct Neo4jHttpClient {
    client: reqwest::Client,
    endpoint: String,
    username: String,
    password: String,
    sessions: Arc<Semaphore>,
}

/// A session holding one permit of the client's session pool.
#[derive(Debug)]
pub struct Neo4jSession {
    client: reqwest::Client,
    endpoint: String,
    username: String,
    password: String,
    _permit: OwnedSemaphorePermit,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

impl Neo4jHttpClient {
    /// Creates a client from configuration.
    pub fn new(config: &Neo4jConfig) -> Result<Self, DatabaseError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a client around an existing `reqwest` client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: &Neo4jConfig) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/db/{}/tx/commit",
                config.uri.trim_end_matches('/'),
                config.database
            ),
            username: config.username.clone(),
            password: config.password.clone(),
            sessions: Arc::new(Semaphore::new(config.max_sessions)),
        }
    }

    /// Number of sessions that can currently be opened without waiting.
    #[must_use]
    pub fn available_sessions(&self) -> usize {
        self.sessions.available_permits()
    }
}

#[async_trait]
impl GraphDatabase for Neo4jHttpClient {
    async fn open_session(&self) -> Result<Box<dyn GraphSession>, DatabaseError> {
        let permit = Arc::clone(&self.sessions)
            .acquire_owned()
            .await
            .map_err(|e| DatabaseError::SessionUnavailable(e.to_string()))?;
        Ok(Box::new(Neo4jSession {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            _permit: permit,
        }))
    }
}

#[async_trait]
impl GraphSession for Neo4jSession {
    async fn run(&mut self, query: &str) -> Result<Vec<Record>, DatabaseError> {
        let body = serde_json::json!({
            "statements": [{"statement": query, "resultDataContents": ["row"]}],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            return Err(DatabaseError::Connection(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: TxResponse = response
            .json()
            .await
            .map_err(|e| DatabaseError::InvalidResponse(e.to_string()))?;

        if let Some(error) = parsed.errors.into_iter().next() {
            return Err(DatabaseError::query(error.code, error.message));
        }

        let Some(result) = parsed.results.into_iter().next() else {
            return Ok(Vec::new());
        };
        Ok(result
            .data
            .into_iter()
            .map(|row| result.columns.iter().cloned().zip(row.row).collect())
            .collect())
    }
}

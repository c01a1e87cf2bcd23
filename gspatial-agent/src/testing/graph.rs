//! Scripted graph database.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::Record;
use crate::errors::DatabaseError;
use crate::providers::{GraphDatabase, GraphSession};

type Responder = Box<dyn Fn(&str) -> Result<Vec<Record>, DatabaseError> + Send + Sync>;

#[derive(Default)]
struct Script {
    results: Mutex<VecDeque<Result<Vec<Record>, DatabaseError>>>,
    responder: Option<Responder>,
    queries: Mutex<Vec<String>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// A graph database that replays queued results and counts sessions.
///
/// Results are consumed in order; a drained queue yields an empty result.
#[derive(Clone, Default)]
pub struct ScriptedGraph {
    script: Arc<Script>,
    delay: Option<Duration>,
}

impl fmt::Debug for ScriptedGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedGraph")
            .field("queries", &self.script.queries.lock().len())
            .field("open_sessions", &self.open_sessions())
            .finish()
    }
}

impl ScriptedGraph {
    /// Creates a graph replying with the given results.
    #[must_use]
    pub fn from_results(results: Vec<Result<Vec<Record>, DatabaseError>>) -> Self {
        Self {
            script: Arc::new(Script {
                results: Mutex::new(results.into()),
                ..Script::default()
            }),
            delay: None,
        }
    }

    /// Creates a graph that computes each result from the query.
    #[must_use]
    pub fn responding<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<Vec<Record>, DatabaseError> + Send + Sync + 'static,
    {
        Self {
            script: Arc::new(Script {
                responder: Some(Box::new(responder)),
                ..Script::default()
            }),
            delay: None,
        }
    }

    /// Delays every query.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queries received so far.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.script.queries.lock().clone()
    }

    /// Sessions ever opened.
    #[must_use]
    pub fn sessions_opened(&self) -> usize {
        self.script.opened.load(Ordering::SeqCst)
    }

    /// Sessions currently open.
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.sessions_opened() - self.script.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraphDatabase for ScriptedGraph {
    async fn open_session(&self) -> Result<Box<dyn GraphSession>, DatabaseError> {
        self.script.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            script: Arc::clone(&self.script),
            delay: self.delay,
        }))
    }
}

struct ScriptedSession {
    script: Arc<Script>,
    delay: Option<Duration>,
}

#[async_trait]
impl GraphSession for ScriptedSession {
    async fn run(&mut self, query: &str) -> Result<Vec<Record>, DatabaseError> {
        self.script.queries.lock().push(query.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(responder) = &self.script.responder {
            return responder(query);
        }
        self.script.results.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.script.closed.fetch_add(1, Ordering::SeqCst);
    }
}

//! Graph-database collaborator interface.
//!
//! A session is acquired for exactly one execution attempt and released when
//! the boxed session is dropped, whichever way the attempt ends.

use async_trait::async_trait;

use crate::core::Record;
use crate::errors::DatabaseError;

/// A graph database that hands out sessions.
#[async_trait]
pub trait GraphDatabase: Send + Sync {
    /// Acquires a session. The session is released when dropped.
    async fn open_session(&self) -> Result<Box<dyn GraphSession>, DatabaseError>;
}

/// A session able to run queries.
#[async_trait]
pub trait GraphSession: Send {
    /// Runs one query and collects every record.
    async fn run(&mut self, query: &str) -> Result<Vec<Record>, DatabaseError>;
}

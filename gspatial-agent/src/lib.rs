//! # gspatial-agent
//!
//! Answers natural-language spatial questions against a Neo4j graph that
//! exposes the gSpatial procedure library.
//!
//! A question runs through five stages:
//!
//! - **Classification**: one of TOPOLOGICAL, SET, BUFFER, SINGLE or DISTANCE
//! - **Entity extraction**: JSON entities, or the raw model text when that fails to parse
//! - **Query synthesis**: a Cypher query calling `gspatial.operation`
//! - **Execution**: retried with error feedback up to a fixed number of failures
//! - **Response synthesis**: a natural-language answer, or an apology on error
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gspatial_agent::prelude::*;
//!
//! let config = AgentConfig::from_env()?;
//! let orchestrator = Orchestrator::from_config(&config)?;
//!
//! let state = orchestrator.run("What is the area of Park X?").await;
//! println!("{}", state.response_text.unwrap_or_default());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{AgentConfig, LlmConfig, Neo4jConfig, PipelineConfig};
    pub use crate::core::{
        Entities, Entity, PipelineState, QueryType, Record, RetryContext, RetryStatus,
        StateUpdate,
    };
    pub use crate::errors::{AgentError, ConfigError, DatabaseError, LlmError};
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, PipelineEvent,
    };
    pub use crate::pipeline::Orchestrator;
    pub use crate::providers::{
        Completion, CompletionParams, GraphDatabase, GraphSession, LanguageModel,
        Neo4jHttpClient, OpenAiChatModel,
    };
    pub use crate::stages::{Stage, StageId};
}

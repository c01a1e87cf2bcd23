//! Core domain model types.
//!
//! This module contains the fundamental types threaded through the pipeline:
//! - Query-type labels and their operation vocabulary
//! - Extracted entities (structured or degraded)
//! - Retry bookkeeping for query execution
//! - The per-run pipeline state and stage deltas

mod entities;
mod query_type;
mod retry;
mod state;

pub use entities::{Entities, Entity};
pub use query_type::{QueryType, UnknownQueryType};
pub use retry::{RetryContext, RetryStatus, DEFAULT_CONTEXT_QUERIES, DEFAULT_MAX_ATTEMPTS};
pub use state::{PipelineState, Record, StateUpdate};

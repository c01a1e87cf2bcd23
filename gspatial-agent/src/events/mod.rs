//! Event sink system for observability.
//!
//! Every run emits `run.started`, a `stage.started`/`stage.completed` pair
//! per stage invocation, one `execution.retry` per failed execution that is
//! retried, and `run.completed`.

mod event;
mod sink;

pub use event::PipelineEvent;
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

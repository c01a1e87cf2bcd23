//! Pipeline orchestration.
//!
//! The [`Orchestrator`] runs classify, extract, then a bounded
//! synthesize/execute loop, and finally the response stage.

mod orchestrator;

pub use orchestrator::Orchestrator;

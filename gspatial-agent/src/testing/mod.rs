//! Testing utilities for gspatial pipelines.
//!
//! This module provides scripted stand-ins for the two external
//! collaborators so pipelines can run without network access:
//! - [`ScriptedModel`] replays canned completions and records prompts
//! - [`ScriptedGraph`] replays canned results and counts sessions

mod graph;
mod models;

pub use graph::ScriptedGraph;
pub use models::ScriptedModel;

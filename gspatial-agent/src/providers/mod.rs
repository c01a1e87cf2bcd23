//! External collaborators: the language model and the graph database.
//!
//! The pipeline only sees the [`LanguageModel`] and [`GraphDatabase`] traits;
//! the concrete HTTP clients live alongside them.

mod graph;
mod llm;
mod neo4j;
mod openai;

pub use graph::{GraphDatabase, GraphSession};
#[cfg(test)]
pub use llm::MockLanguageModel;
pub use llm::{Completion, CompletionParams, LanguageModel};
pub use neo4j::{Neo4jHttpClient, Neo4jSession};
pub use openai::OpenAiChatModel;

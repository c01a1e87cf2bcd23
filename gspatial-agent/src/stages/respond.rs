//! Natural-language answer synthesis.

use async_trait::async_trait;

use super::{ModelHandle, Stage, StageId};
use crate::core::{PipelineState, Record, StateUpdate};
use crate::prompts;

/// Default number of records shown to the response model.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// The fixed answer returned when the run ends in an error.
#[must_use]
pub fn apology(error: &str) -> String {
    format!("Sorry, an error occurred while running the query: {error}")
}

/// Serializes the first `limit` records, noting how many were left out.
#[must_use]
pub fn format_result_preview(records: &[Record], limit: usize) -> String {
    let shown = &records[..records.len().min(limit)];
    let mut preview = serde_json::to_string(shown).unwrap_or_else(|_| "[]".to_string());
    if records.len() > shown.len() {
        preview.push_str(&format!(" ... ({} more)", records.len() - shown.len()));
    }
    preview
}

/// Turns query results into an answer.
#[derive(Debug, Clone)]
pub struct ResponseSynthesizer {
    model: ModelHandle,
    preview_rows: usize,
}

impl ResponseSynthesizer {
    /// Creates a synthesizer.
    #[must_use]
    pub fn new(model: ModelHandle) -> Self {
        Self {
            model,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }

    /// Sets how many records are shown to the model.
    #[must_use]
    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }

    /// Produces the answer for a finished run.
    pub async fn respond(&self, state: &PipelineState) -> String {
        if let Some(error) = state.error.as_deref() {
            return apology(error);
        }
        let (Some(query), Some(records)) = (state.query_text.as_deref(), state.result_records.as_deref()) else {
            return apology("no query results were produced");
        };

        let preview = format_result_preview(records, self.preview_rows);
        let prompt = prompts::response_generation_prompt(state.question(), query, &preview);
        match self.model.complete(StageId::GenerateResponse, &prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Response generation failed");
                apology(&e.to_string())
            }
        }
    }
}

#[async_trait]
impl Stage for ResponseSynthesizer {
    fn id(&self) -> StageId {
        StageId::GenerateResponse
    }

    async fn execute(&self, state: &PipelineState) -> StateUpdate {
        StateUpdate::Responded(self.respond(state).await)
    }
}

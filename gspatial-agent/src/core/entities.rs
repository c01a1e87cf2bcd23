//! Named entities extracted from a question.

use serde::{Deserialize, Serialize};

/// A single extracted entity, e.g. `{"type": "location", "value": "Park X"}`.
///
/// Keys other than `type` and `value` are kept in `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity category (location, distance, relation, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Entity value as the model produced it.
    pub value: serde_json::Value,
    /// Any additional keys on the entity object.
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Entity {
    /// Creates an entity with a string value.
    #[must_use]
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: serde_json::Value::String(value.into()),
            attributes: serde_json::Map::new(),
        }
    }
}

/// Extraction outcome: parsed entities, or the model text kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Entities {
    /// The model output parsed as a list of `{type, value}` objects.
    Structured(Vec<Entity>),
    /// The model output did not parse; trimmed text kept as-is.
    Raw(String),
}

impl Entities {
    /// Parses model output.
    ///
    /// Output that is a JSON array of `{type, value}` objects becomes
    /// [`Entities::Structured`]; anything else becomes [`Entities::Raw`]
    /// holding the trimmed text.
    #[must_use]
    pub fn parse(output: &str) -> Self {
        let trimmed = output.trim();
        match serde_json::from_str::<Vec<Entity>>(trimmed) {
            Ok(entities) => Self::Structured(entities),
            Err(_) => Self::Raw(trimmed.to_string()),
        }
    }

    /// Renders the canonical prompt form: pretty JSON for structured
    /// entities, the verbatim text otherwise.
    #[must_use]
    pub fn to_prompt_string(&self) -> String {
        match self {
            Self::Structured(entities) => serde_json::to_string_pretty(entities)
                .unwrap_or_else(|_| format!("{entities:?}")),
            Self::Raw(text) => text.clone(),
        }
    }

    /// Returns true if extraction fell back to raw text.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Raw(_))
    }

    /// Returns the structured entities, if any.
    #[must_use]
    pub fn as_structured(&self) -> Option<&[Entity]> {
        match self {
            Self::Structured(entities) => Some(entities),
            Self::Raw(_) => None,
        }
    }
}

//! The five gSpatial operation families a question can map to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of spatial operation a question asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryType {
    /// Spatial relationship test between two object sets.
    Topological,
    /// Set operation (union, intersection, difference) over two object sets.
    Set,
    /// Distance-based buffer around objects.
    Buffer,
    /// Property or transformation of a single object.
    Single,
    /// Shortest distance between two objects.
    Distance,
}

impl Default for QueryType {
    fn default() -> Self {
        Self::Topological
    }
}

impl QueryType {
    /// All labels, in prompt order.
    pub const ALL: [Self; 5] = [
        Self::Topological,
        Self::Set,
        Self::Buffer,
        Self::Single,
        Self::Distance,
    ];

    /// Returns the wire label (`TOPOLOGICAL`, `SET`, ...).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Topological => "TOPOLOGICAL",
            Self::Set => "SET",
            Self::Buffer => "BUFFER",
            Self::Single => "SINGLE",
            Self::Distance => "DISTANCE",
        }
    }

    /// Named gSpatial operations available for this family.
    #[must_use]
    pub const fn operations(&self) -> &'static [&'static str] {
        match self {
            Self::Topological => &[
                "CONTAINS",
                "COVERED_BY",
                "CROSSES",
                "DISJOINT",
                "EQUALS",
                "INTERSECTS",
                "OVERLAPS",
                "TOUCHES",
                "WITHIN",
            ],
            Self::Set => &["INTERSECTION", "UNION", "DIFFERENCE"],
            Self::Buffer => &["BUFFER"],
            Self::Single => &[
                "AREA",
                "BBOX",
                "BOUNDARY",
                "CENTROID",
                "CONVEX_HULL",
                "DIMENSION",
                "ENVELOPE",
                "LENGTH",
                "SRID",
            ],
            Self::Distance => &["DISTANCE"],
        }
    }

    /// Resolves raw classifier output to a label.
    ///
    /// The text is trimmed and upper-cased; anything that is not exactly one
    /// of the five labels resolves to [`QueryType::Topological`].
    #[must_use]
    pub fn from_model_output(raw: &str) -> Self {
        raw.trim()
            .to_uppercase()
            .parse()
            .unwrap_or_default()
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the five labels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown query type: {0}")]
pub struct UnknownQueryType(pub String);

impl FromStr for QueryType {
    type Err = UnknownQueryType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownQueryType(s.to_string()))
    }
}

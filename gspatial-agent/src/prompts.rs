//! Prompt templates for each model-backed stage.
//!
//! Templates use `{name}` placeholders filled by [`render`]. The gSpatial
//! vocabulary is generated from [`QueryType::operations`] so the prompts and
//! the classifier labels cannot drift apart.

use regex::{Captures, Regex};
use std::fmt::Write as _;
use std::sync::LazyLock;

use crate::core::QueryType;

const CLASSIFICATION_TEMPLATE: &str = "\
Analyze the question below and select the most appropriate gSpatial operation type.
{summary}
Schema:
{schema}
Question: {input}
Type (choose one from TOPOLOGICAL, SET, BUFFER, SINGLE, DISTANCE):
";

const ENTITY_EXTRACTION_TEMPLATE: &str = "\
Extract all entities related to the spatial query from the following question.

Question: {input}

Entity types to extract:
- Location names (e.g., 'Seoul Station', 'Gangnam District', 'Han River')
- Distances (e.g., '1km', '500m')
- Spatial relationships (e.g., 'inside', 'near', 'closest to')
- Other relevant attributes

Output in JSON format. Each entity should have 'type' and 'value' fields.
";

const CYPHER_GENERATION_TEMPLATE: &str = "\
Write a Cypher query that calls the gSpatial operation procedure based on the given information.
- Question: {input}
- Type: {query_type}
- Entities: {entities}
- Schema: {schema}
{error_context}
Refer to the following example structures for each type:

1) Topological Operation
MATCH (n)
WITH collect(n) AS n_list
MATCH (m)
WITH n_list, collect(m) AS m_list
CALL gspatial.operation('WITHIN', [n_list, m_list]) YIELD n, m, result
WHERE result = true
RETURN n, m

2) Set
MATCH (n)
WITH collect(n) AS n_list
MATCH (m)
WITH n_list, collect(m) AS m_list
CALL gspatial.operation('UNION', [n_list, m_list]) YIELD result
RETURN result

3) Buffer
MATCH (n)
WITH collect(n) AS n_list
CALL gspatial.operation('BUFFER', [n_list, [distance]]) YIELD n, result
RETURN result
* Distance must always be in decimal format (e.g., 5.0). Always include .0 even for integer values.

4) Single
MATCH (n)
WITH collect(n) AS n_list
CALL gspatial.operation('AREA', [n_list]) YIELD n, result
RETURN result

5) Distance
MATCH (n)
WITH collect(n) AS n_list
MATCH (m)
WITH n_list, collect(m) AS m_list
CALL gspatial.operation('DISTANCE', [n_list, m_list]) YIELD n, m, result
RETURN n, m, result

Output only the Cypher query, following the example patterns.
";

const RESPONSE_GENERATION_TEMPLATE: &str = "\
You are given a user's question, the executed query, and its results. Generate a clear and helpful response in English.

Question: {question}
Executed Query: {query}
Query Results: {result}

Your response should:
1. Provide a direct answer to the question
2. Highlight key information from the query results
3. Include additional context or explanations if needed
4. Be concise and professional
5. Format numbers and data appropriately

Response:
";

#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("valid placeholder pattern"));

/// Replaces each `{key}` in `template` with its value in a single pass.
///
/// Substituted values are never re-scanned, so user text containing braces
/// is inserted verbatim. Unknown placeholders are left untouched.
#[must_use]
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            vars.iter()
                .find(|(key, _)| *key == &caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, value)| (*value).to_string())
        })
        .into_owned()
}

/// Documentation of every query type and its operations.
#[must_use]
pub fn gspatial_summary() -> String {
    let mut summary = String::from("Available gSpatial operation types:\n");
    for (i, query_type) in QueryType::ALL.iter().enumerate() {
        let _ = writeln!(
            summary,
            "\n{}. {} ({}): {}",
            i + 1,
            family_name(*query_type),
            query_type,
            family_description(*query_type)
        );
        let _ = writeln!(summary, "   - Available operations: {}", query_type.operations().join(", "));
        let _ = writeln!(summary, "   - Parameters: {}", family_parameters(*query_type));
        let _ = writeln!(summary, "   - Output: {}", family_output(*query_type));
    }
    summary
}

const fn family_name(query_type: QueryType) -> &'static str {
    match query_type {
        QueryType::Topological => "Topological Operation",
        QueryType::Set => "Set Operation",
        QueryType::Buffer => "Numeric Parameter Operation",
        QueryType::Single => "Single Parameter Operation",
        QueryType::Distance => "Measurement Operation",
    }
}

const fn family_description(query_type: QueryType) -> &'static str {
    match query_type {
        QueryType::Topological => "Checks spatial relationships between two objects",
        QueryType::Set => "Set operations on two sets of objects",
        QueryType::Buffer => {
            "Creates a distance-based buffer; the distance is always a decimal (e.g. 5.0)"
        }
        QueryType::Single => "Calculates properties or transformations of a single object",
        QueryType::Distance => "Measures the shortest distance between two objects",
    }
}

const fn family_parameters(query_type: QueryType) -> &'static str {
    match query_type {
        QueryType::Topological | QueryType::Set => "operation name(str), n_list(list), m_list(list)",
        QueryType::Buffer => "'BUFFER', n_list(list), param(list<double>)",
        QueryType::Single => "operation name(str), n_list(list)",
        QueryType::Distance => "'DISTANCE', n_list(list), m_list(list)",
    }
}

const fn family_output(query_type: QueryType) -> &'static str {
    match query_type {
        QueryType::Topological => "n(node), m(node), result(bool)",
        QueryType::Set => "n(node), m(node), result(WKT geometry)",
        QueryType::Buffer => "n(node), result(WKT geometry)",
        QueryType::Single => "n(node), result(geometry or numeric)",
        QueryType::Distance => "n(node), m(node), result(double)",
    }
}

/// Prompt for the classifier.
#[must_use]
pub fn classification_prompt(question: &str, schema: &str) -> String {
    render(
        CLASSIFICATION_TEMPLATE,
        &[("summary", &gspatial_summary()), ("schema", schema), ("input", question)],
    )
}

/// Prompt for the entity extractor.
#[must_use]
pub fn entity_extraction_prompt(question: &str) -> String {
    render(ENTITY_EXTRACTION_TEMPLATE, &[("input", question)])
}

/// Prompt for the query synthesizer.
#[must_use]
pub fn cypher_generation_prompt(
    question: &str,
    query_type: QueryType,
    entities: &str,
    schema: &str,
    error_context: Option<&str>,
) -> String {
    let error_context = error_context.map_or_else(String::new, |ctx| format!("\n{ctx}\n"));
    render(
        CYPHER_GENERATION_TEMPLATE,
        &[
            ("input", question),
            ("query_type", query_type.as_str()),
            ("entities", entities),
            ("schema", schema),
            ("error_context", &error_context),
        ],
    )
}

/// Prompt for the response synthesizer.
#[must_use]
pub fn response_generation_prompt(question: &str, query: &str, result: &str) -> String {
    render(
        RESPONSE_GENERATION_TEMPLATE,
        &[("question", question), ("query", query), ("result", result)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_all_occurrences() {
        assert_eq!(render("{a}-{b}-{a}", &[("a", "1"), ("b", "2")]), "1-2-1");
        assert_eq!(render("{missing}", &[("a", "1")]), "{missing}");
    }

    #[test]
    fn test_summary_lists_every_operation() {
        let summary = gspatial_summary();
        for query_type in QueryType::ALL {
            assert!(summary.contains(query_type.as_str()));
            for op in query_type.operations() {
                assert!(summary.contains(op), "missing {op}");
            }
        }
    }

    #[test]
    fn test_classification_prompt() {
        let prompt = classification_prompt("Which parks touch the river?", "(:Park)-[]-(:River)");
        assert!(prompt.contains("Question: Which parks touch the river?"));
        assert!(prompt.contains("(:Park)-[]-(:River)"));
        assert!(prompt.contains("COVERED_BY"));
        assert!(!prompt.contains("{summary}"));
    }

    #[test]
    fn test_cypher_prompt_without_error_context() {
        let prompt = cypher_generation_prompt("q", QueryType::Single, "[]", "", None);
        assert!(prompt.contains("- Type: SINGLE"));
        assert!(!prompt.contains("{error_context}"));
        assert!(!prompt.contains("previous query failed"));
    }

    #[test]
    fn test_cypher_prompt_with_error_context() {
        let prompt = cypher_generation_prompt(
            "q",
            QueryType::Distance,
            "Park X",
            "",
            Some("The previous query failed with the following error:\nError: boom"),
        );
        assert!(prompt.contains("Error: boom"));
        assert!(prompt.contains("- Entities: Park X"));
    }

    #[test]
    fn test_response_prompt() {
        let prompt = response_generation_prompt("q", "RETURN 1", r#"[{"result":1}]"#);
        assert!(prompt.contains("Executed Query: RETURN 1"));
        assert!(prompt.contains(r#"Query Results: [{"result":1}]"#));
    }
}

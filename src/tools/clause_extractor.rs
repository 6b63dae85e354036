//! Regex-based clause extraction
//!
//! Finds common contract clauses by case-insensitive keyword anchors and
//! captures a bounded window of following text. This is deliberately shallow:
//! it hands candidate spans to the model and the risk scorers, it does not
//! try to understand them.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value, json};

use crate::tools::{Tool, ToolError, ToolKind, ToolResult, ToolSpec};

/// Clause categories extracted when the caller does not narrow the set
pub const DEFAULT_CLAUSE_TYPES: [&str; 7] = [
    "termination",
    "payment",
    "liability",
    "confidentiality",
    "governing_law",
    "ip",
    "indemnity",
];

/// Extracted spans are capped at this many characters
const SPAN_CAP_CHARS: usize = 1500;

static PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("termination", "termination|term and termination|terminate"),
        ("payment", "fees|payment|compensation|invoic|billing"),
        ("liability", "limitation of liability|liability"),
        ("confidentiality", "confidential|non[- ]disclosure|nda"),
        ("governing_law", "governing law|jurisdiction|venue"),
        ("ip", "intellectual property|ownership|license"),
        ("indemnity", "indemnif|hold harmless"),
    ]
    .into_iter()
    .map(|(clause, anchors)| {
        // Anchor keyword plus up to 1200 characters of following context.
        let pattern = format!(r"({anchors})\b.{{0,1200}}");
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .expect("clause pattern must compile");
        (clause, regex)
    })
    .collect()
});

/// Extracts common contract clauses from raw contract text
pub struct ClauseExtractorTool;

#[async_trait::async_trait]
impl Tool for ClauseExtractorTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "extract_clauses",
            "Extracts common contract clauses from raw contract text \
             (termination, payment, liability, confidentiality, governing_law, ip, indemnity).",
            json!({
                "type": "object",
                "properties": {
                    "contract_text": { "type": "string" },
                    "clause_types": {
                        "type": "array",
                        "items": { "type": "string" },
                        "default": DEFAULT_CLAUSE_TYPES,
                    }
                },
                "required": ["contract_text"]
            }),
        )
    }

    fn kind(&self) -> ToolKind {
        ToolKind::ClauseExtraction
    }

    async fn run(&self, args: Map<String, Value>) -> ToolResult<Map<String, Value>> {
        let text = args
            .get("contract_text")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments {
                tool: "extract_clauses".to_string(),
                message: "missing required string parameter 'contract_text'".to_string(),
            })?;

        let requested: Vec<String> = match args.get("clause_types").and_then(Value::as_array) {
            Some(types) => types
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            None => DEFAULT_CLAUSE_TYPES.iter().map(|s| s.to_string()).collect(),
        };

        let mut clauses = Map::new();
        let mut found = Vec::new();

        for clause in &requested {
            let Some((_, regex)) = PATTERNS.iter().find(|(name, _)| name == clause) else {
                // Unknown categories are skipped, not rejected.
                continue;
            };

            let span = regex
                .find(text)
                .map(|m| cap_chars(m.as_str().trim(), SPAN_CAP_CHARS).to_string())
                .unwrap_or_default();

            if !span.is_empty() {
                found.push(clause.clone());
            }
            clauses.insert(clause.clone(), Value::String(span));
        }

        tracing::debug!(requested = requested.len(), found = found.len(), "extracted clauses");

        let mut result = Map::new();
        result.insert("clauses".to_string(), Value::Object(clauses));
        result.insert("found".to_string(), json!(found));
        Ok(result)
    }
}

/// Truncates to at most `max_chars` characters on a char boundary
fn cap_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

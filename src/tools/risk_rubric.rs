//! LLM rubric risk scoring
//!
//! Asks the model to score risk against a fixed rubric and a strict output
//! schema, extracts the JSON report (one repair attempt on malformed output),
//! then validates and normalizes it so callers always see the same shape.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::agent::response::parse_model_output;
use crate::providers::{ChatMessage, ChatModel};
use crate::tools::risk_heuristics::RiskLevel;
use crate::tools::{Tool, ToolError, ToolKind, ToolResult, ToolSpec};

const TOOL_NAME: &str = "score_risk_rubric";

/// Scores contract risk with a model-driven rubric
pub struct RiskRubricTool {
    model: Arc<dyn ChatModel>,
}

impl RiskRubricTool {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    fn build_prompt(clauses: &Map<String, Value>, context: &Map<String, Value>) -> String {
        format!(
            "You are a contract risk analyst. Score risk using a strict rubric.\n\
             You MUST return VALID JSON ONLY. No markdown.\n\n\
             RUBRIC (0-100 risk score):\n\
             - Liability: unlimited liability, no cap, broad damages -> higher risk.\n\
             - Termination: for convenience without notice, one-sided termination -> higher risk.\n\
             - Payment: slow terms (Net 60/90), unclear invoicing, late fee absence -> moderate risk.\n\
             - IP: broad assignment of all work product, unclear pre-existing IP -> moderate/high risk.\n\
             - Confidentiality: missing/weak terms -> moderate risk.\n\
             - Indemnity: defend + any/all claims + no carveouts -> higher risk.\n\
             - Governing law / venue: unusual or one-sided forum -> moderate risk.\n\n\
             OUTPUT SCHEMA (return exactly these keys):\n\
             {{\n\
               \"risk_score\": number,\n\
               \"risk_level\": \"low\"|\"medium\"|\"high\",\n\
               \"risk_flags\": string[],\n\
               \"rationale_by_clause\": {{ \"<clause_type>\": string }},\n\
               \"recommended_edits\": string[],\n\
               \"assumptions\": string[]\n\
             }}\n\n\
             CONTEXT:\n{}\n\n\
             EXTRACTED_CLAUSES:\n{}\n\n\
             Rules:\n\
             - Base your rationales ONLY on the extracted clauses provided.\n\
             - If a clause is empty/missing, say so in the rationale and add an assumption.\n\
             - Keep recommended_edits actionable and short (bullet-like strings).\n",
            Value::Object(context.clone()),
            Value::Object(clauses.clone()),
        )
    }

    async fn ask(&self, prompt: String) -> ToolResult<String> {
        self.model
            .chat(&[ChatMessage::user(prompt)])
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool: TOOL_NAME.to_string(),
                message: format!("rubric model call failed: {e}"),
            })
    }
}

#[async_trait::async_trait]
impl Tool for RiskRubricTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            TOOL_NAME,
            "Scores contract risk using an LLM rubric based on extracted clauses. \
             Returns a consistent JSON risk report (score/level/flags/rationales/recommended_edits).",
            json!({
                "type": "object",
                "properties": {
                    "clauses": { "type": "object" },
                    "context": {
                        "type": "object",
                        "description": "Optional context like party_role (vendor/customer), jurisdiction, contract_type"
                    }
                },
                "required": ["clauses"]
            }),
        )
    }

    fn kind(&self) -> ToolKind {
        ToolKind::RiskScoring
    }

    async fn run(&self, args: Map<String, Value>) -> ToolResult<Map<String, Value>> {
        let clauses = args
            .get("clauses")
            .and_then(Value::as_object)
            .ok_or_else(|| ToolError::InvalidArguments {
                tool: TOOL_NAME.to_string(),
                message: "missing required object parameter 'clauses'".to_string(),
            })?;
        let context = args
            .get("context")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        // Null clause values become empty strings before prompting.
        let clauses: Map<String, Value> = clauses
            .iter()
            .map(|(name, text)| match text {
                Value::Null => (name.clone(), Value::String(String::new())),
                other => (name.clone(), other.clone()),
            })
            .collect();

        let first = self.ask(Self::build_prompt(&clauses, &context)).await?;
        let report = match parse_model_output(&first) {
            Ok(value) => value,
            Err(parse_err) => {
                tracing::warn!(
                    tool = TOOL_NAME,
                    error = %parse_err,
                    "rubric output was not valid JSON, attempting repair"
                );
                let repair = format!(
                    "Your previous output was not valid JSON matching the required schema. \
                     Return ONLY a single valid JSON object with the exact keys specified. \
                     No markdown, no commentary.\n\nPREVIOUS OUTPUT:\n{first}\n\n\
                     Now return the corrected JSON:"
                );
                let second = self.ask(repair).await?;
                parse_model_output(&second).map_err(|e| ToolError::ExecutionFailed {
                    tool: TOOL_NAME.to_string(),
                    message: format!("rubric output unparseable after repair: {e}"),
                })?
            }
        };

        validate_and_normalize(report)
    }
}

/// Coerces a rubric report into the declared schema
///
/// The score must be numeric; everything else is repaired in place (level
/// derived from the score when the model deviates, list and map fields
/// coerced to strings).
fn validate_and_normalize(report: Value) -> ToolResult<Map<String, Value>> {
    let score = report
        .get("risk_score")
        .and_then(Value::as_f64)
        .ok_or_else(|| ToolError::ExecutionFailed {
            tool: TOOL_NAME.to_string(),
            message: "risk_score must be a number".to_string(),
        })?;
    let score = score.clamp(0.0, 100.0);

    let level = match report.get("risk_level").and_then(Value::as_str) {
        Some("low") => RiskLevel::Low,
        Some("medium") => RiskLevel::Medium,
        Some("high") => RiskLevel::High,
        _ => RiskLevel::from_score(score),
    };

    let string_list = |field: &str| -> Vec<String> {
        report
            .get(field)
            .and_then(Value::as_array)
            .map(|items| items.iter().map(stringify).collect())
            .unwrap_or_default()
    };

    let rationale: Map<String, Value> = report
        .get("rationale_by_clause")
        .and_then(Value::as_object)
        .map(|entries| {
            entries
                .iter()
                .map(|(clause, text)| (clause.clone(), Value::String(stringify(text))))
                .collect()
        })
        .unwrap_or_default();

    let mut out = Map::new();
    out.insert("risk_score".to_string(), json!(score));
    out.insert("risk_level".to_string(), json!(level));
    out.insert("risk_flags".to_string(), json!(string_list("risk_flags")));
    out.insert("rationale_by_clause".to_string(), Value::Object(rationale));
    out.insert(
        "recommended_edits".to_string(),
        json!(string_list("recommended_edits")),
    );
    out.insert("assumptions".to_string(), json!(string_list("assumptions")));
    Ok(out)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

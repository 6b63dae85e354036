//! Model output parsing
//!
//! Models frequently wrap their JSON in markdown fences or surround it with
//! prose. `parse_model_output` recovers a JSON object from such text using a
//! fixed sequence of attempts, and `classify` turns the recovered object into
//! a typed reply so the loop never branches on a raw `status` string.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Errors from model-output parsing, naming the stage that failed
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("empty model response")]
    Empty,

    #[error("no JSON object found in model output")]
    NoObject,

    #[error("JSON parsing failed after extracting object braces: {0}")]
    BadObject(#[source] serde_json::Error),
}

/// Recovers a single JSON value from raw model output
///
/// Attempts, in strict order, stopping at the first success:
/// 1. fail immediately on empty/whitespace-only input;
/// 2. strip a leading/trailing markdown code fence (optionally tagged `json`);
/// 3. parse the (possibly fence-stripped) text directly;
/// 4. parse the span from the first `{` to the last `}`.
///
/// Fences are stripped before brace-scanning because models often wrap valid
/// JSON in fences next to explanatory prose; scanning first would capture
/// prose-embedded braces. The brace span is deliberately greedy and not
/// balance-aware, matching the established extraction behavior.
pub fn parse_model_output(text: &str) -> Result<Value, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let candidate = strip_code_fence(trimmed);

    if let Ok(value) = serde_json::from_str(candidate) {
        return Ok(value);
    }

    let start = candidate.find('{').ok_or(ParseError::NoObject)?;
    let end = candidate.rfind('}').ok_or(ParseError::NoObject)?;
    if end < start {
        return Err(ParseError::NoObject);
    }

    serde_json::from_str(&candidate[start..=end]).map_err(ParseError::BadObject)
}

/// Strips a surrounding markdown code fence, if present
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    // Drop an optional "json" language tag, case-insensitively.
    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };
    let rest = rest.trim_start();

    rest.strip_suffix("```").map(str::trim_end).unwrap_or(rest)
}

/// One tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Name of the tool to invoke
    pub name: String,
    /// Arguments for the tool, defaulting to empty
    #[serde(default)]
    pub args: Map<String, Value>,
}

/// A parsed and classified model reply
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// The model requested tool invocations
    ToolCalls(Vec<ToolCallRequest>),
    /// The model produced its final analysis object
    Final(Map<String, Value>),
    /// Missing or unrecognized `status`; carries the raw object for reporting
    Unrecognized {
        status: Option<String>,
        raw: Value,
    },
}

/// Classifies a parsed model object by its `status` discriminator
///
/// A `tool_call` reply with a missing or malformed `tool_calls` list is
/// treated as requesting no calls; the loop then simply proceeds to the next
/// step.
pub fn classify(value: Value) -> ModelReply {
    let status = value
        .get("status")
        .and_then(Value::as_str)
        .map(str::to_string);

    match status.as_deref() {
        Some("tool_call") => {
            let calls = value
                .get("tool_calls")
                .cloned()
                .map(serde_json::from_value::<Vec<ToolCallRequest>>)
                .and_then(Result::ok)
                .unwrap_or_default();
            ModelReply::ToolCalls(calls)
        }
        Some("final") => match value {
            Value::Object(map) => ModelReply::Final(map),
            other => ModelReply::Unrecognized {
                status,
                raw: other,
            },
        },
        _ => ModelReply::Unrecognized { status, raw: value },
    }
}

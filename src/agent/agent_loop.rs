//! The agent loop: a bounded LLM -> tools -> reply state machine
//!
//! One run seeds a transcript with the system prompt and the contract text,
//! then alternates between asking the model for a decision and executing the
//! tool calls it requests, terminating on a final answer, an unrecoverable
//! parse failure, an unrecognized reply, or the step budget.
//!
//! Clause and risk results are accumulated outside the model's own final
//! payload so a model that forgets to echo tool results still produces a
//! complete report. Precedence on merge: accumulated state over model-final
//! values over empty.

use std::io;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::agent::prompts;
use crate::agent::response::{ModelReply, classify, parse_model_output};
use crate::agent::tracer::Tracer;
use crate::providers::{ChatMessage, ChatModel, ProviderError};
use crate::tools::{ToolError, ToolKind, ToolRegistry};

/// Default number of model decisions per run
pub const DEFAULT_MAX_STEPS: usize = 5;

/// Contract text is silently truncated to this many characters before it
/// enters the transcript, bounding token cost
pub const MAX_CONTRACT_CHARS: usize = 120_000;

/// At most this many tool calls are honored per step; extra requests are
/// dropped without error
pub const MAX_TOOL_CALLS_PER_STEP: usize = 2;

/// Fatal errors that escape `AgentLoop::run` instead of becoming a structured
/// outcome: model transport failures, unknown tool names, and tool-internal
/// failures
#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    #[error("model call failed: {0}")]
    Model(#[from] ProviderError),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// State accumulated across steps as tool results arrive
///
/// Never reset mid-run; each field is only overwritten wholesale by a
/// non-empty result from the matching tool kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunState {
    /// Clause text keyed by clause category
    pub extracted_clauses: Map<String, Value>,
    /// Latest risk report
    pub risk_summary: Map<String, Value>,
}

impl RunState {
    /// Folds one tool result into the accumulated state
    pub fn absorb(&mut self, kind: ToolKind, result: &Map<String, Value>) {
        match kind {
            ToolKind::ClauseExtraction => {
                if let Some(Value::Object(clauses)) = result.get("clauses") {
                    if !clauses.is_empty() {
                        self.extracted_clauses = clauses.clone();
                    }
                }
            }
            ToolKind::RiskScoring => {
                if !result.is_empty() {
                    self.risk_summary = result.clone();
                }
            }
            ToolKind::General => {}
        }
    }
}

/// Terminal result of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentOutcome {
    /// The model produced a final analysis (merged with accumulated state)
    Final(FinalReport),
    /// The run terminated without a final analysis
    Error(RunFailure),
}

impl AgentOutcome {
    /// Returns the final report, if the run succeeded
    pub fn as_final(&self) -> Option<&FinalReport> {
        match self {
            AgentOutcome::Final(report) => Some(report),
            AgentOutcome::Error(_) => None,
        }
    }

    /// Returns the failure, if the run terminated without a final analysis
    pub fn as_error(&self) -> Option<&RunFailure> {
        match self {
            AgentOutcome::Final(_) => None,
            AgentOutcome::Error(failure) => Some(failure),
        }
    }
}

/// The merged final analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    /// The model's prose summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
    /// The model's self-reported confidence in [0, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Clause text by category; accumulated state wins over the model's copy
    #[serde(default)]
    pub extracted_clauses: Map<String, Value>,
    /// Risk report; accumulated state wins over the model's copy
    #[serde(default)]
    pub risk_summary: Map<String, Value>,
    /// Any other fields the model put in its final object
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

/// A structured run failure, carrying whatever was accumulated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    /// What terminated the run
    pub error: String,
    /// The offending parsed object, for unrecognized-status failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_clauses: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_summary: Option<Map<String, Value>>,
}

/// Orchestrates one bounded multi-turn exchange between the model and the
/// registered tools
pub struct AgentLoop {
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    tracer: Tracer,
    run_context: Option<Map<String, Value>>,
}

impl AgentLoop {
    /// Creates a new loop over the given model, tools and tracer
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolRegistry, tracer: Tracer) -> Self {
        Self {
            model,
            tools,
            tracer,
            run_context: None,
        }
    }

    /// Attaches caller-supplied context (party role, jurisdiction, ...) that
    /// is embedded in the seed user message
    pub fn with_run_context(mut self, context: Map<String, Value>) -> Self {
        self.run_context = Some(context);
        self
    }

    /// Returns this run's id (shared with every trace event)
    pub fn run_id(&self) -> Uuid {
        self.tracer.run_id()
    }

    /// Returns the tracer for inspection
    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Flushes buffered trace events to the durable log
    pub fn flush_trace(&mut self) -> io::Result<()> {
        self.tracer.flush()
    }

    /// Runs the loop to a terminal state
    ///
    /// Structured terminations (final analysis, unrecognized status, JSON
    /// failure after the one repair turn, step-budget exhaustion) come back
    /// as `Ok(AgentOutcome)`. Unknown tool names, tool-internal failures and
    /// model transport errors are fatal and surface as `Err(AgentError)`.
    pub async fn run(
        &mut self,
        contract_text: &str,
        max_steps: usize,
    ) -> Result<AgentOutcome, AgentError> {
        let tool_specs = self.tools.list_specs();

        let mut transcript = vec![ChatMessage::system(self.model.system_prompt(&tool_specs))];

        let mut seed = Map::new();
        seed.insert("task".to_string(), json!(prompts::TASK));
        seed.insert(
            "contract_text".to_string(),
            json!(truncate_chars(contract_text, MAX_CONTRACT_CHARS)),
        );
        if let Some(context) = &self.run_context {
            seed.insert("context".to_string(), Value::Object(context.clone()));
        }
        transcript.push(ChatMessage::user(Value::Object(seed).to_string()));

        let mut state = RunState::default();

        for step in 0..max_steps {
            tracing::debug!(run_id = %self.tracer.run_id(), step, "agent loop step");

            let raw = self.chat_traced(step, &transcript).await?;

            let parsed = match parse_model_output(&raw) {
                Ok(value) => value,
                Err(first_err) => {
                    tracing::warn!(
                        step,
                        error = %first_err,
                        "model reply was not valid JSON, requesting repair"
                    );
                    transcript.push(ChatMessage::user(prompts::REPAIR_INSTRUCTION));

                    let retried = self.chat_traced(step, &transcript).await?;
                    match parse_model_output(&retried) {
                        Ok(value) => value,
                        Err(second_err) => {
                            tracing::error!(
                                step,
                                error = %second_err,
                                "repair attempt also failed to parse, terminating run"
                            );
                            return Ok(AgentOutcome::Error(RunFailure {
                                error: format!(
                                    "model response was not valid JSON after one repair attempt: {second_err}"
                                ),
                                raw: None,
                                extracted_clauses: Some(state.extracted_clauses),
                                risk_summary: Some(state.risk_summary),
                            }));
                        }
                    }
                }
            };

            match classify(parsed) {
                ModelReply::ToolCalls(mut calls) => {
                    if calls.len() > MAX_TOOL_CALLS_PER_STEP {
                        tracing::debug!(
                            step,
                            requested = calls.len(),
                            honored = MAX_TOOL_CALLS_PER_STEP,
                            "capping tool calls for this step"
                        );
                        calls.truncate(MAX_TOOL_CALLS_PER_STEP);
                    }

                    // Strictly in list order; no parallel execution within a step.
                    for call in calls {
                        let tool = self.tools.get(&call.name)?;
                        let kind = tool.kind();

                        let started = Instant::now();
                        let result = tool.run(call.args.clone()).await?;
                        let elapsed = started.elapsed();

                        self.tracer
                            .record_tool(step, &call.name, elapsed, &call.args, &result);
                        tracing::info!(
                            step,
                            tool = %call.name,
                            latency_ms = elapsed.as_millis() as u64,
                            "tool executed"
                        );

                        state.absorb(kind, &result);
                        transcript.push(ChatMessage::tool(
                            json!({"tool": call.name, "result": result}).to_string(),
                        ));
                    }
                }
                ModelReply::Final(details) => {
                    tracing::info!(
                        run_id = %self.tracer.run_id(),
                        step,
                        "run finished with final analysis"
                    );
                    return Ok(AgentOutcome::Final(merge_final(details, state)));
                }
                ModelReply::Unrecognized { status, raw } => {
                    let error = format!(
                        "unknown status: {}",
                        status.as_deref().unwrap_or("<missing>")
                    );
                    tracing::warn!(step, %error, "terminating run on unrecognized reply");
                    return Ok(AgentOutcome::Error(RunFailure {
                        error,
                        raw: Some(raw),
                        extracted_clauses: None,
                        risk_summary: None,
                    }));
                }
            }
        }

        tracing::warn!(
            run_id = %self.tracer.run_id(),
            max_steps,
            "step budget exhausted without a final analysis"
        );
        Ok(AgentOutcome::Error(RunFailure {
            error: "max_steps_exceeded".to_string(),
            raw: None,
            extracted_clauses: Some(state.extracted_clauses),
            risk_summary: Some(state.risk_summary),
        }))
    }

    /// Calls the model and records the latency and raw output
    async fn chat_traced(
        &mut self,
        step: usize,
        transcript: &[ChatMessage],
    ) -> Result<String, AgentError> {
        let started = Instant::now();
        let raw = self.model.chat(transcript).await?;
        let elapsed = started.elapsed();

        self.tracer.record_llm(step, elapsed, &raw);
        tracing::trace!(
            step,
            latency_ms = elapsed.as_millis() as u64,
            "model call completed"
        );
        Ok(raw)
    }
}

/// Merges the model's final object with the accumulated run state
///
/// Accumulated clauses/risk win when non-empty, otherwise the model's own
/// values are kept, otherwise the field stays empty. Clause values are
/// normalized so `null` becomes the empty string.
fn merge_final(mut details: Map<String, Value>, state: RunState) -> FinalReport {
    details.remove("status");

    let model_clauses = match details.remove("extracted_clauses") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    let model_risk = match details.remove("risk_summary") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let clauses = if state.extracted_clauses.is_empty() {
        model_clauses
    } else {
        state.extracted_clauses
    };
    let risk_summary = if state.risk_summary.is_empty() {
        model_risk
    } else {
        state.risk_summary
    };

    let final_answer = match details.remove("final_answer") {
        Some(Value::String(text)) => Some(text),
        Some(other) => {
            // Non-string answers stay in the extras untouched.
            details.insert("final_answer".to_string(), other);
            None
        }
        None => None,
    };
    let confidence = match details.remove("confidence") {
        Some(value) => match value.as_f64() {
            Some(number) => Some(number),
            None => {
                details.insert("confidence".to_string(), value);
                None
            }
        },
        None => None,
    };

    FinalReport {
        final_answer,
        confidence,
        extracted_clauses: normalize_clauses(clauses),
        risk_summary,
        extra: details,
    }
}

/// Replaces null clause values with empty strings
fn normalize_clauses(clauses: Map<String, Value>) -> Map<String, Value> {
    clauses
        .into_iter()
        .map(|(name, text)| match text {
            Value::Null => (name, Value::String(String::new())),
            other => (name, other),
        })
        .collect()
}

/// Truncates to at most `max_chars` characters on a char boundary
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

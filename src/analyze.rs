//! Top-level analysis entrypoint
//!
//! Wires the default tool set, a tracer and the configured model into one
//! agent run. The tracer is flushed on every path, but the run result itself
//! flows through unmodified: structured outcomes come back as the report,
//! fatal errors (unknown tool, tool failure, transport failure) propagate to
//! the caller.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::agent::{AgentLoop, AgentOutcome, Tracer};
use crate::config::Config;
use crate::providers::{ChatModel, GeminiModel};
use crate::tools::{ClauseExtractorTool, RiskHeuristicsTool, RiskRubricTool, ToolRegistry};

/// The outcome of one run plus the id its trace events carry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    #[serde(flatten)]
    pub outcome: AgentOutcome,
}

/// Builds the default tool set: clause extraction, heuristic scoring and
/// model-driven rubric scoring
pub fn default_tools(model: Arc<dyn ChatModel>) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(Box::new(ClauseExtractorTool));
    tools.register(Box::new(RiskHeuristicsTool));
    tools.register(Box::new(RiskRubricTool::new(model)));
    tools
}

/// Analyzes contract text with the configured Gemini model
pub async fn analyze_contract(
    contract_text: &str,
    run_context: Option<Map<String, Value>>,
    config: &Config,
) -> Result<AnalysisReport> {
    let api_key = config
        .api_key
        .as_deref()
        .context("GEMINI_API_KEY is not set")?;
    let model: Arc<dyn ChatModel> = Arc::new(
        GeminiModel::new(api_key, &config.model).context("failed to create Gemini provider")?,
    );
    analyze_with_model(model, contract_text, run_context, config).await
}

/// Analyzes contract text with a caller-supplied model (tests, other
/// providers)
pub async fn analyze_with_model(
    model: Arc<dyn ChatModel>,
    contract_text: &str,
    run_context: Option<Map<String, Value>>,
    config: &Config,
) -> Result<AnalysisReport> {
    let tools = default_tools(Arc::clone(&model));

    let mut agent = AgentLoop::new(model, tools, Tracer::new(&config.trace_log));
    if let Some(context) = run_context {
        agent = agent.with_run_context(context);
    }
    let run_id = agent.run_id();

    tracing::info!(%run_id, max_steps = config.max_steps, "starting contract analysis");
    let result = agent.run(contract_text, config.max_steps).await;

    // Flush happens on success and failure alike; a flush problem is logged
    // but never masks the run result.
    if let Err(e) = agent.flush_trace() {
        tracing::warn!(%run_id, error = %e, "failed to flush trace log");
    }

    let outcome = result?;
    Ok(AnalysisReport { run_id, outcome })
}

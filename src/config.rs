//! Application configuration
//!
//! Loaded from the environment: `GEMINI_API_KEY`, `GEMINI_MODEL`,
//! `REDLINE_TRACE_LOG`, `REDLINE_MAX_STEPS`. CLI flags override fields after
//! loading.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::agent::DEFAULT_MAX_STEPS;
use crate::providers::gemini::DEFAULT_MODEL;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Gemini API key; required to run an analysis
    pub api_key: Option<String>,
    /// Model name for both the agent and the rubric scorer
    #[serde(default = "default_model")]
    pub model: String,
    /// Where trace events are appended, one JSON object per line
    #[serde(default = "default_trace_log")]
    pub trace_log: PathBuf,
    /// Step budget per run
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_trace_log() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".redline").join("logs").join("runs.jsonl"))
        .unwrap_or_else(|| PathBuf::from("logs/runs.jsonl"))
}

fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            trace_log: default_trace_log(),
            max_steps: default_max_steps(),
        }
    }
}

impl Config {
    /// Loads configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let non_empty = |value: String| {
            let trimmed = value.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        };

        Self {
            api_key: env::var("GEMINI_API_KEY").ok().and_then(non_empty),
            model: env::var("GEMINI_MODEL")
                .ok()
                .and_then(non_empty)
                .unwrap_or_else(default_model),
            trace_log: env::var("REDLINE_TRACE_LOG")
                .ok()
                .and_then(non_empty)
                .map(PathBuf::from)
                .unwrap_or_else(default_trace_log),
            max_steps: env::var("REDLINE_MAX_STEPS")
                .ok()
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or_else(default_max_steps),
        }
    }
}

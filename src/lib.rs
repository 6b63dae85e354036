//! Contract-risk analysis agent
//!
//! A small bounded agent loop over a chat model: the model drives clause
//! extraction and risk scoring through a tool registry, every model and tool
//! call is traced to an NDJSON log, and the run always ends in a structured
//! outcome within a fixed step budget.

pub mod agent;
pub mod analyze;
pub mod cli;
pub mod config;
pub mod providers;
pub mod tools;

pub use analyze::{AnalysisReport, analyze_contract, analyze_with_model, default_tools};
pub use config::Config;

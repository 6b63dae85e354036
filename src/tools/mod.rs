//! Tool system for the contract-analysis agent
//!
//! Tools are named, schema-described functions the model may request during a
//! run. The registry keeps them in registration order because that order is
//! what the model sees in its system prompt.

use serde::Serialize;
use serde_json::{Map, Value};

pub mod clause_extractor;
pub mod risk_heuristics;
pub mod risk_rubric;

pub use clause_extractor::ClauseExtractorTool;
pub use risk_heuristics::RiskHeuristicsTool;
pub use risk_rubric::RiskRubricTool;

/// Errors raised during tool lookup and execution
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    /// Tool not found in the registry
    ///
    /// The agent loop does not catch this: an unknown tool name from the
    /// model is fatal for the run.
    #[error("unknown tool: {0}")]
    NotFound(String),

    /// Invalid arguments provided to the tool
    #[error("invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    /// Tool execution failed
    #[error("tool '{tool}' execution failed: {message}")]
    ExecutionFailed { tool: String, message: String },
}

impl ToolError {
    /// Get the tool name from the error
    pub fn tool_name(&self) -> &str {
        match self {
            ToolError::NotFound(name) => name,
            ToolError::InvalidArguments { tool, .. } => tool,
            ToolError::ExecutionFailed { tool, .. } => tool,
        }
    }
}

/// Result type for tool operations
pub type ToolResult<T> = std::result::Result<T, ToolError>;

/// Describes a tool to the model: name, description and argument schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    /// Unique tool name
    pub name: String,
    /// Description the model uses to decide when to call the tool
    pub description: String,
    /// JSON Schema for the tool's arguments
    pub input_schema: Value,
}

impl ToolSpec {
    /// Creates a new tool spec
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// What kind of output a tool produces
///
/// The loop uses this to decide which accumulator a tool result feeds, rather
/// than comparing tool-name strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Output is not accumulated across steps
    General,
    /// Result carries a `clauses` mapping that feeds `extracted_clauses`
    ClauseExtraction,
    /// Result is a risk report that feeds `risk_summary` wholesale
    RiskScoring,
}

/// Trait for implementing tools the agent can invoke
///
/// Tools are synchronous from the loop's point of view: one call, one result
/// mapping. Errors are not caught by the loop and propagate to the caller.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Returns the spec advertised to the model
    fn spec(&self) -> ToolSpec;

    /// Returns how the loop should treat this tool's results
    fn kind(&self) -> ToolKind {
        ToolKind::General
    }

    /// Executes the tool with the given arguments
    async fn run(&self, args: Map<String, Value>) -> ToolResult<Map<String, Value>>;
}

/// Registry of available tools, preserving registration order
///
/// Registering a tool under an existing name replaces it in place: the last
/// registration wins but keeps the original position, so `list_specs` order
/// is stable across re-registration.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates a new empty tool registry
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registers a tool, replacing any existing tool with the same name
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.spec().name;
        if let Some(existing) = self
            .tools
            .iter_mut()
            .find(|t| t.spec().name == name)
        {
            tracing::debug!(tool = %name, "replacing previously registered tool");
            *existing = tool;
        } else {
            self.tools.push(tool);
        }
    }

    /// Retrieves a tool by name
    ///
    /// Fails with `ToolError::NotFound` for unregistered names.
    pub fn get(&self, name: &str) -> ToolResult<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.spec().name == name)
            .map(|t| t.as_ref())
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// Returns all tool specs in registration order
    pub fn list_specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// Returns the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Checks if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait::async_trait]
    impl Tool for EchoTool {
        fn spec(&self) -> ToolSpec {
            ToolSpec::new(
                self.name,
                "Echoes a canned reply",
                json!({"type": "object", "properties": {}}),
            )
        }

        async fn run(&self, _args: Map<String, Value>) -> ToolResult<Map<String, Value>> {
            let mut out = Map::new();
            out.insert("reply".to_string(), json!(self.reply));
            Ok(out)
        }
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool {
            name: "echo",
            reply: "one",
        }));

        assert_eq!(registry.len(), 1);
        assert!(registry.get("echo").is_ok());

        assert!(matches!(
            registry.get("missing"),
            Err(ToolError::NotFound(ref n)) if n == "missing"
        ));
    }

    #[tokio::test]
    async fn test_duplicate_registration_last_wins() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool {
            name: "echo",
            reply: "first",
        }));
        registry.register(Box::new(EchoTool {
            name: "echo",
            reply: "second",
        }));

        assert_eq!(registry.len(), 1);
        let tool = registry.get("echo").unwrap();
        let result = tool.run(Map::new()).await.unwrap();
        assert_eq!(result["reply"], json!("second"));
    }

    #[test]
    fn test_list_specs_keeps_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool {
            name: "alpha",
            reply: "a",
        }));
        registry.register(Box::new(EchoTool {
            name: "beta",
            reply: "b",
        }));
        // Re-registering alpha must not move it behind beta.
        registry.register(Box::new(EchoTool {
            name: "alpha",
            reply: "a2",
        }));

        let names: Vec<String> = registry.list_specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_tool_error_tool_name() {
        let err = ToolError::NotFound("my_tool".to_string());
        assert_eq!(err.tool_name(), "my_tool");

        let err = ToolError::InvalidArguments {
            tool: "other_tool".to_string(),
            message: "bad args".to_string(),
        };
        assert_eq!(err.tool_name(), "other_tool");
    }

    #[test]
    fn test_tool_spec_serializes_with_schema() {
        let spec = ToolSpec::new("t", "does t", json!({"type": "object"}));
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["name"], "t");
        assert_eq!(value["input_schema"]["type"], "object");
    }
}

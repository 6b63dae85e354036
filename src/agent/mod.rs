pub mod agent_loop;
pub mod prompts;
pub mod response;
pub mod tracer;

pub use agent_loop::{
    AgentError, AgentLoop, AgentOutcome, DEFAULT_MAX_STEPS, FinalReport, MAX_CONTRACT_CHARS,
    MAX_TOOL_CALLS_PER_STEP, RunFailure, RunState,
};
pub use response::{ModelReply, ParseError, ToolCallRequest, classify, parse_model_output};
pub use tracer::{TraceEvent, Tracer};

//! Agent module - the tool-using research agent.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Build context with the task's system prompt and the user query
//! 2. Call the model with the gateway's tools
//! 3. If the model requests tool calls, execute them and feed results back
//! 4. Repeat until the model answers without tool calls or max iterations

mod agent_loop;
pub mod prompt;

pub use agent_loop::{Agent, AgentOutcome, AgentSettings, LogEntryType, RunLogEntry};

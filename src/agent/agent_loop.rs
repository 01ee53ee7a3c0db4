//! Core agent loop implementation.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::llm::{ChatMessage, CompletionOptions, LlmClient, Role, ToolCall};
use crate::tools::ToolRegistry;

/// Per-agent model settings.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_iterations: usize,
}

/// The agent's final answer and how it got there.
#[derive(Debug, Clone, Serialize)]
pub struct AgentOutcome {
    /// Final answer text, passed through untouched.
    pub text: String,

    /// Number of model calls made.
    pub iterations: usize,

    /// Tool calls, tool results and the final response, in order.
    pub log: Vec<RunLogEntry>,
}

/// A single entry in the run log.
#[derive(Debug, Clone, Serialize)]
pub struct RunLogEntry {
    /// Timestamp (RFC 3339)
    pub timestamp: String,

    pub entry_type: LogEntryType,

    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEntryType {
    ToolCall,
    ToolResult,
    Response,
}

/// A language model bound to a tool set and a fixed system prompt.
pub struct Agent {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    system_prompt: String,
    settings: AgentSettings,
}

impl Agent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
        system_prompt: impl Into<String>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            llm,
            tools,
            system_prompt: system_prompt.into(),
            settings,
        }
    }

    /// Submit one user query and drive the tool loop to a final answer.
    ///
    /// Tool failures are reported back to the model as tool results; model
    /// client failures abort the run.
    pub async fn run(&self, query: &str) -> anyhow::Result<AgentOutcome> {
        let run_id = Uuid::new_v4();
        let mut log = Vec::new();

        let mut messages = vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(query),
        ];

        let tool_schemas = self.tools.get_tool_schemas();
        let options = CompletionOptions {
            temperature: self.settings.temperature,
        };

        tracing::info!(
            %run_id,
            model = %self.settings.model,
            tools = self.tools.len(),
            "Starting agent run"
        );

        for iteration in 0..self.settings.max_iterations {
            tracing::debug!(%run_id, "Agent iteration {}", iteration + 1);

            let response = self
                .llm
                .chat_completion(&self.settings.model, &messages, Some(tool_schemas.as_slice()), options)
                .await?;

            if let Some(tool_calls) = response.tool_calls.filter(|calls| !calls.is_empty()) {
                messages.push(ChatMessage {
                    role: Role::Assistant,
                    content: response.content.clone(),
                    tool_calls: Some(tool_calls.clone()),
                    tool_call_id: None,
                });

                for tool_call in &tool_calls {
                    log.push(log_entry(
                        LogEntryType::ToolCall,
                        format!(
                            "Calling tool: {} with args: {}",
                            tool_call.function.name, tool_call.function.arguments
                        ),
                    ));

                    let result_str = match self.execute_tool_call(tool_call).await {
                        Ok(output) => output,
                        Err(e) => {
                            tracing::warn!(%run_id, "Tool {} failed: {:#}", tool_call.function.name, e);
                            format!("Error: {:#}", e)
                        }
                    };

                    log.push(log_entry(
                        LogEntryType::ToolResult,
                        truncate_for_log(&result_str, 1000),
                    ));

                    messages.push(ChatMessage::tool_result(tool_call.id.clone(), result_str));
                }

                continue;
            }

            let content = response.content.unwrap_or_default();
            if content.trim().is_empty() {
                tracing::warn!(%run_id, "Model returned an empty final answer");
            }
            log.push(log_entry(
                LogEntryType::Response,
                truncate_for_log(&content, 2000),
            ));
            tracing::info!(%run_id, iterations = iteration + 1, "Agent run complete");
            return Ok(AgentOutcome {
                text: content,
                iterations: iteration + 1,
                log,
            });
        }

        Err(anyhow::anyhow!(
            "Max iterations ({}) reached without completion",
            self.settings.max_iterations
        ))
    }

    async fn execute_tool_call(&self, tool_call: &ToolCall) -> anyhow::Result<String> {
        let raw = tool_call.function.arguments.trim();
        let args: serde_json::Value = if raw.is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(raw).map_err(|e| {
                anyhow::anyhow!("Invalid JSON arguments for {}: {}", tool_call.function.name, e)
            })?
        };

        self.tools.execute(&tool_call.function.name, args).await
    }
}

fn log_entry(entry_type: LogEntryType, content: String) -> RunLogEntry {
    RunLogEntry {
        timestamp: chrono::Utc::now().to_rfc3339(),
        entry_type,
        content,
    }
}

/// Truncate a string for logging purposes, on a char boundary.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}

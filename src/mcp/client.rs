//! MCP client - JSON-RPC over a spawned process or streamable HTTP.

use std::process::Stdio;
use std::sync::atomic::{AtomicI64, Ordering};

use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use super::{McpError, McpServerConfig, Transport, PROTOCOL_VERSION};

const SESSION_HEADER: &str = "mcp-session-id";

/// A live connection to one MCP server.
pub struct McpClient {
    name: String,
    connection: Connection,
    request_id: AtomicI64,
    server_info: ServerInfo,
}

enum Connection {
    Stdio(Mutex<StdioProcess>),
    Http(HttpSession),
}

struct StdioProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

struct HttpSession {
    http: reqwest::Client,
    url: String,
    session_id: Mutex<Option<String>>,
}

impl McpClient {
    /// Open the transport and perform the `initialize` handshake.
    pub async fn connect(config: &McpServerConfig) -> Result<Self, McpError> {
        let connection = match &config.transport {
            Transport::Stdio { command, args } => Connection::Stdio(Mutex::new(spawn(command, args)?)),
            Transport::Http { url } => Connection::Http(HttpSession {
                http: reqwest::Client::builder()
                    .build()
                    .map_err(|e| McpError::Transport(format!("failed to create HTTP client: {}", e)))?,
                url: url.clone(),
                session_id: Mutex::new(None),
            }),
        };

        let mut client = Self {
            name: config.name.clone(),
            connection,
            request_id: AtomicI64::new(1),
            server_info: ServerInfo::default(),
        };

        let result = client
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            )
            .await?;

        client.server_info = result
            .get("serverInfo")
            .cloned()
            .and_then(|info| serde_json::from_value(info).ok())
            .unwrap_or_default();

        client.notify("notifications/initialized").await?;

        tracing::debug!(
            "MCP server '{}' initialized ({} {})",
            client.name,
            client.server_info.name,
            client.server_info.version
        );

        Ok(client)
    }

    /// The configured service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    fn next_id(&self) -> i64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// List every tool the server offers, following pagination cursors.
    pub async fn list_tools(&self) -> Result<Vec<RemoteTool>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = match &cursor {
                Some(c) => json!({ "cursor": c }),
                None => json!({}),
            };
            let result = self.request("tools/list", params).await?;

            let page: ToolsPage = serde_json::from_value(result)
                .map_err(|e| McpError::Protocol(format!("invalid tools/list result: {}", e)))?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(tools)
    }

    /// Call a tool and return its text output.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, McpError> {
        let result = self
            .request(
                "tools/call",
                json!({
                    "name": name,
                    "arguments": arguments
                }),
            )
            .await?;

        let (text, is_error) = tool_result_text(&result);
        if is_error {
            return Err(McpError::ToolError(text));
        }
        Ok(text)
    }

    /// Terminate the server process or end the HTTP session.
    pub async fn shutdown(&self) {
        match &self.connection {
            Connection::Stdio(process) => {
                let mut process = process.lock().await;
                if let Err(e) = process.child.kill().await {
                    tracing::debug!("MCP server '{}' already exited: {}", self.name, e);
                }
            }
            Connection::Http(session) => {
                let Some(session_id) = session.session_id.lock().await.take() else {
                    return;
                };
                let result = session
                    .http
                    .delete(&session.url)
                    .header(SESSION_HEADER, session_id)
                    .send()
                    .await;
                if let Err(e) = result {
                    tracing::debug!("Failed to close MCP session for '{}': {}", self.name, e);
                }
            }
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id(),
            method,
            params,
        };

        let response = match &self.connection {
            Connection::Stdio(process) => request_stdio(process, &request).await?,
            Connection::Http(session) => request_http(session, &request).await?,
        };

        if let Some(error) = response.error {
            return Err(McpError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        response
            .result
            .ok_or_else(|| McpError::Protocol(format!("no result in response to {}", method)))
    }

    async fn notify(&self, method: &str) -> Result<(), McpError> {
        let notification = json!({
            "jsonrpc": "2.0",
            "method": method
        });

        match &self.connection {
            Connection::Stdio(process) => {
                let mut process = process.lock().await;
                write_line(&mut process.stdin, &notification).await
            }
            Connection::Http(session) => {
                let response = session
                    .post(&notification)
                    .await?;
                if !response.status().is_success() {
                    return Err(McpError::Transport(format!(
                        "notification {} rejected with status {}",
                        method,
                        response.status()
                    )));
                }
                Ok(())
            }
        }
    }
}

fn spawn(command: &str, args: &[String]) -> Result<StdioProcess, McpError> {
    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| McpError::Spawn {
            command: command.to_string(),
            source,
        })?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| McpError::Transport("failed to capture stdin".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| McpError::Transport("failed to capture stdout".into()))?;

    Ok(StdioProcess {
        child,
        stdin,
        stdout: BufReader::new(stdout),
    })
}

async fn write_line<T: Serialize>(stdin: &mut ChildStdin, message: &T) -> Result<(), McpError> {
    let mut line = serde_json::to_vec(message)
        .map_err(|e| McpError::Protocol(format!("JSON serialization error: {}", e)))?;
    line.push(b'\n');

    stdin
        .write_all(&line)
        .await
        .map_err(|e| McpError::Transport(format!("failed to write to stdin: {}", e)))?;
    stdin
        .flush()
        .await
        .map_err(|e| McpError::Transport(format!("failed to flush stdin: {}", e)))
}

async fn request_stdio(
    process: &Mutex<StdioProcess>,
    request: &JsonRpcRequest<'_>,
) -> Result<JsonRpcResponse, McpError> {
    let mut process = process.lock().await;
    write_line(&mut process.stdin, request).await?;

    // Servers may interleave notifications and log lines; skip until our id.
    let mut line = String::new();
    loop {
        line.clear();
        let read = process
            .stdout
            .read_line(&mut line)
            .await
            .map_err(|e| McpError::Transport(format!("failed to read from stdout: {}", e)))?;
        if read == 0 {
            return Err(McpError::Transport("server closed stdout".into()));
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<JsonRpcResponse>(trimmed) {
            Ok(response) if response.id == Some(json!(request.id)) => return Ok(response),
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("Ignoring non JSON-RPC line from server: {}", e);
                continue;
            }
        }
    }
}

async fn request_http(
    session: &HttpSession,
    request: &JsonRpcRequest<'_>,
) -> Result<JsonRpcResponse, McpError> {
    let response = session.post(request).await?;
    let status = response.status();
    let headers = response.headers().clone();

    if let Some(id) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) {
        *session.session_id.lock().await = Some(id.to_string());
    }

    let body = response
        .text()
        .await
        .map_err(|e| McpError::Transport(format!("failed to read response body: {}", e)))?;

    if !status.is_success() {
        return Err(McpError::Transport(format!(
            "{} returned HTTP {}: {}",
            request.method, status, body
        )));
    }

    if is_event_stream(&headers) {
        return parse_sse_response(&body, request.id).ok_or_else(|| {
            McpError::Protocol(format!("no response to {} in event stream", request.method))
        });
    }

    serde_json::from_str(&body)
        .map_err(|e| McpError::Protocol(format!("invalid JSON-RPC response: {}", e)))
}

impl HttpSession {
    async fn post<T: Serialize>(&self, body: &T) -> Result<reqwest::Response, McpError> {
        let mut builder = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);

        if let Some(id) = self.session_id.lock().await.as_ref() {
            builder = builder.header(SESSION_HEADER, id);
        }

        builder
            .send()
            .await
            .map_err(|e| McpError::Transport(format!("request failed: {}", e)))
    }
}

fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/event-stream"))
        .unwrap_or(false)
}

/// Find the JSON-RPC response with `id` among the `data:` lines of an SSE body.
fn parse_sse_response(body: &str, id: i64) -> Option<JsonRpcResponse> {
    let expected = json!(id);
    let mut data = String::new();

    // Events are separated by blank lines; multi-line data is concatenated.
    for line in body.lines().chain(std::iter::once("")) {
        if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.trim_start());
            continue;
        }
        if line.trim().is_empty() && !data.is_empty() {
            if let Ok(response) = serde_json::from_str::<JsonRpcResponse>(&data) {
                if response.id.as_ref() == Some(&expected) {
                    return Some(response);
                }
            }
            data.clear();
        }
    }

    None
}

/// Flatten a `tools/call` result into text, plus its `isError` flag.
fn tool_result_text(result: &Value) -> (String, bool) {
    let is_error = result
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let parts: Vec<String> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| match item.get("type").and_then(Value::as_str) {
                    Some("text") => item
                        .get("text")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    Some("resource") => item
                        .pointer("/resource/text")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| "[resource]".to_string()),
                    Some(other) => format!("[{}]", other),
                    None => item.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    if !parts.is_empty() {
        return (parts.join("\n"), is_error);
    }

    let fallback = result
        .get("structuredContent")
        .unwrap_or(result)
        .to_string();
    (fallback, is_error)
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: i64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ToolsPage {
    #[serde(default)]
    tools: Vec<RemoteTool>,
    #[serde(default, rename = "nextCursor")]
    next_cursor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// A tool as advertised by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

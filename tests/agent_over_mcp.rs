//! End-to-end: tool gateway over streamable HTTP, the agent loop and the
//! chat-completions client, against in-process mock servers.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use product_research::agent::prompt::DESCRIPTION_GENERATOR_PROMPT;
use product_research::agent::{Agent, AgentSettings, LogEntryType};
use product_research::llm::OpenAiClient;
use product_research::mcp::{McpError, McpServerConfig, ToolGateway, Transport};
use product_research::research::{ResearchRequest, ResearchService, Researcher};
use product_research::Config;

const SESSION: &str = "session-42";

#[derive(Default)]
struct McpState {
    methods: Mutex<Vec<String>>,
    closed_sessions: Mutex<Vec<String>>,
}

async fn mcp_post(
    State(state): State<Arc<McpState>>,
    headers: HeaderMap,
    Json(message): Json<Value>,
) -> Response {
    let method = message["method"].as_str().unwrap_or_default().to_string();
    state.methods.lock().unwrap().push(method.clone());

    let Some(id) = message.get("id").cloned() else {
        return StatusCode::ACCEPTED.into_response();
    };

    if method != "initialize" && headers.get("mcp-session-id").and_then(|v| v.to_str().ok()) != Some(SESSION) {
        return (StatusCode::BAD_REQUEST, "missing session").into_response();
    }

    match method.as_str() {
        "initialize" => (
            [("mcp-session-id", SESSION)],
            Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "protocolVersion": message["params"]["protocolVersion"],
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": "mock-search", "version": "0.0.1" }
                }
            })),
        )
            .into_response(),
        "tools/list" => {
            let body = json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "tools": [
                        {
                            "name": "search_prices",
                            "description": "Search marketplace prices",
                            "inputSchema": {
                                "type": "object",
                                "properties": { "query": { "type": "string" } },
                                "required": ["query"]
                            }
                        },
                        { "name": "write_file", "description": "Save a file" }
                    ]
                }
            });
            (
                [(header::CONTENT_TYPE, "text/event-stream")],
                format!("event: message\ndata: {}\n\n", body),
            )
                .into_response()
        }
        "tools/call" => {
            let result = match message["params"]["name"].as_str() {
                Some("search_prices") => json!({
                    "content": [{
                        "type": "text",
                        "text": format!(
                            "Amazon: $39.99, AliExpress: $8.50 for {}",
                            message["params"]["arguments"]["query"].as_str().unwrap_or("?")
                        )
                    }]
                }),
                _ => json!({
                    "content": [{ "type": "text", "text": "Access denied - path outside allowed directories" }],
                    "isError": true
                }),
            };
            Json(json!({ "jsonrpc": "2.0", "id": id, "result": result })).into_response()
        }
        _ => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32601, "message": "Method not found" }
        }))
        .into_response(),
    }
}

async fn mcp_delete(State(state): State<Arc<McpState>>, headers: HeaderMap) -> StatusCode {
    if let Some(id) = headers.get("mcp-session-id").and_then(|v| v.to_str().ok()) {
        state.closed_sessions.lock().unwrap().push(id.to_string());
    }
    StatusCode::OK
}

#[derive(Default)]
struct ChatState {
    replies: Mutex<VecDeque<Value>>,
    requests: Mutex<Vec<Value>>,
}

async fn chat_completions(
    State(state): State<Arc<ChatState>>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    if headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) != Some("Bearer sk-test") {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }
    state.requests.lock().unwrap().push(request);
    match state.replies.lock().unwrap().pop_front() {
        Some(message) => Json(json!({
            "choices": [{ "index": 0, "message": message, "finish_reason": "stop" }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
        }))
        .into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "no scripted reply").into_response(),
    }
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_mcp() -> (SocketAddr, Arc<McpState>) {
    let state = Arc::new(McpState::default());
    let app = Router::new()
        .route("/mcp", post(mcp_post).delete(mcp_delete))
        .with_state(state.clone());
    (spawn(app).await, state)
}

async fn spawn_chat(replies: Vec<Value>) -> (SocketAddr, Arc<ChatState>) {
    let state = Arc::new(ChatState {
        replies: Mutex::new(replies.into()),
        requests: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(state.clone());
    (spawn(app).await, state)
}

fn search_server(addr: SocketAddr) -> McpServerConfig {
    McpServerConfig {
        name: "tavily".to_string(),
        transport: Transport::Http {
            url: format!("http://{}/mcp", addr),
        },
    }
}

#[tokio::test]
async fn agent_calls_mcp_tools_and_returns_final_text() {
    let (mcp_addr, mcp_state) = spawn_mcp().await;
    let (chat_addr, chat_state) = spawn_chat(vec![
        json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [
                {
                    "id": "call_1",
                    "type": "function",
                    "function": { "name": "search_prices", "arguments": "{\"query\":\"sunset lamp\"}" }
                },
                {
                    "id": "call_2",
                    "type": "function",
                    "function": { "name": "write_file", "arguments": "{\"path\":\"/etc/passwd\"}" }
                }
            ]
        }),
        json!({ "role": "assistant", "content": "**Sunset Lamp**: PROFITABLE (45%)" }),
    ])
    .await;

    let gateway = ToolGateway::connect(&[search_server(mcp_addr)]).await.unwrap();
    assert_eq!(gateway.tool_names(), vec!["search_prices", "write_file"]);

    let llm = OpenAiClient::new("sk-test".to_string(), &format!("http://{}/v1", chat_addr));
    let agent = Agent::new(
        Arc::new(llm),
        gateway.registry(),
        "You are a product research assistant.",
        AgentSettings {
            model: "test-model".to_string(),
            temperature: Some(0.0),
            max_iterations: 5,
        },
    );

    let outcome = agent.run("Research sunset lamp").await.unwrap();
    gateway.shutdown().await;

    assert_eq!(outcome.text, "**Sunset Lamp**: PROFITABLE (45%)");
    assert_eq!(outcome.iterations, 2);
    let kinds: Vec<_> = outcome.log.iter().map(|e| e.entry_type).collect();
    assert_eq!(
        kinds,
        vec![
            LogEntryType::ToolCall,
            LogEntryType::ToolResult,
            LogEntryType::ToolCall,
            LogEntryType::ToolResult,
            LogEntryType::Response,
        ]
    );

    let requests = chat_state.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["model"], "test-model");
    assert_eq!(requests[0]["tools"][0]["function"]["name"], "search_prices");
    assert_eq!(
        requests[0]["tools"][1]["function"]["parameters"],
        json!({ "type": "object", "properties": {} })
    );

    let followup = requests[1]["messages"].as_array().unwrap();
    let tool_messages: Vec<&Value> = followup.iter().filter(|m| m["role"] == "tool").collect();
    assert_eq!(tool_messages.len(), 2);
    assert_eq!(tool_messages[0]["tool_call_id"], "call_1");
    assert_eq!(
        tool_messages[0]["content"],
        "Amazon: $39.99, AliExpress: $8.50 for sunset lamp"
    );
    let failure = tool_messages[1]["content"].as_str().unwrap();
    assert!(failure.starts_with("Error:"), "{}", failure);
    assert!(failure.contains("Access denied"), "{}", failure);

    let methods = mcp_state.methods.lock().unwrap().clone();
    assert_eq!(
        methods,
        vec![
            "initialize",
            "notifications/initialized",
            "tools/list",
            "tools/call",
            "tools/call",
        ]
    );
    assert_eq!(*mcp_state.closed_sessions.lock().unwrap(), vec![SESSION.to_string()]);
}

#[tokio::test]
async fn unreachable_server_fails_the_whole_gateway() {
    let (mcp_addr, mcp_state) = spawn_mcp().await;

    let unused = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let servers = [
        search_server(mcp_addr),
        McpServerConfig {
            name: "filesystem".to_string(),
            transport: Transport::Http {
                url: format!("http://{}/mcp", unused),
            },
        },
    ];

    match ToolGateway::connect(&servers).await {
        Err(McpError::Connect { server, source }) => {
            assert_eq!(server, "filesystem");
            assert!(matches!(*source, McpError::Transport(_)), "{}", source);
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("gateway connected to an unreachable server"),
    }

    // The server that did connect is closed again.
    assert_eq!(*mcp_state.closed_sessions.lock().unwrap(), vec![SESSION.to_string()]);
}

#[tokio::test]
async fn model_endpoint_errors_abort_the_run() {
    let (mcp_addr, _) = spawn_mcp().await;
    let (chat_addr, _) = spawn_chat(Vec::new()).await;

    let gateway = ToolGateway::connect(&[search_server(mcp_addr)]).await.unwrap();
    let llm = OpenAiClient::new("sk-wrong".to_string(), &format!("http://{}/v1", chat_addr));
    let agent = Agent::new(
        Arc::new(llm),
        gateway.registry(),
        "system",
        AgentSettings {
            model: "test-model".to_string(),
            temperature: None,
            max_iterations: 3,
        },
    );

    let err = agent.run("Research kettle").await.unwrap_err();
    gateway.shutdown().await;
    assert!(format!("{:#}", err).contains("401"), "{:#}", err);
}

fn service(output_dir: &std::path::Path, mcp_addr: SocketAddr, chat_addr: SocketAddr) -> ResearchService {
    let vars: HashMap<&str, String> = HashMap::from([
        ("OPENAI_API_KEY", "sk-test".to_string()),
        ("MODEL", "test-model".to_string()),
        ("TAVILY_API_KEY", "tvly-test".to_string()),
        ("OPENAI_BASE_URL", format!("http://{}/v1", chat_addr)),
        ("OUTPUT_DIR", output_dir.display().to_string()),
        ("MAX_ITERATIONS", "4".to_string()),
    ]);
    let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
    ResearchService::new(config).with_tool_servers(vec![search_server(mcp_addr)])
}

#[tokio::test]
async fn research_service_uses_a_fresh_session_per_request() {
    let (mcp_addr, mcp_state) = spawn_mcp().await;
    let (chat_addr, chat_state) = spawn_chat(vec![
        json!({ "role": "assistant", "content": "SHORT: Crisp sound." }),
        json!({ "role": "assistant", "content": "**Earbuds**: NOT PROFITABLE (9%)" }),
    ])
    .await;
    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("reports");
    let service = service(&output_dir, mcp_addr, chat_addr);

    let copy = service
        .research(&ResearchRequest::descriptions(
            "Wireless Earbuds",
            Some("https://example.com/earbuds"),
        ))
        .await
        .unwrap();
    let verdict = service
        .research(&ResearchRequest::profit("Wireless Earbuds"))
        .await
        .unwrap();

    assert_eq!(copy.text, "SHORT: Crisp sound.");
    assert_eq!(verdict.text, "**Earbuds**: NOT PROFITABLE (9%)");
    assert!(output_dir.is_dir());

    let requests = chat_state.requests.lock().unwrap();
    assert_eq!(requests[0]["messages"][0]["content"], DESCRIPTION_GENERATOR_PROMPT);
    assert!(requests[0]["messages"][1]["content"]
        .as_str()
        .unwrap()
        .contains("Product URL: https://example.com/earbuds"));
    let temperature = |i: usize| requests[i]["temperature"].as_f64().unwrap();
    assert!((temperature(0) - 0.7).abs() < 1e-6);
    assert_eq!(temperature(1), 0.0);
    // Second request starts from a clean history.
    assert_eq!(requests[1]["messages"].as_array().unwrap().len(), 2);

    let methods = mcp_state.methods.lock().unwrap();
    assert_eq!(methods.iter().filter(|m| *m == "initialize").count(), 2);
    assert_eq!(mcp_state.closed_sessions.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn research_service_closes_session_when_model_fails() {
    let (mcp_addr, mcp_state) = spawn_mcp().await;
    let (chat_addr, _) = spawn_chat(Vec::new()).await;
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path(), mcp_addr, chat_addr);

    let err = service
        .research(&ResearchRequest::quick_profit("kettle"))
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("500"), "{:#}", err);
    assert_eq!(*mcp_state.closed_sessions.lock().unwrap(), vec![SESSION.to_string()]);
}

#[tokio::test]
async fn research_service_rejects_blank_product_before_connecting() {
    let (mcp_addr, mcp_state) = spawn_mcp().await;
    let (chat_addr, chat_state) = spawn_chat(Vec::new()).await;
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path(), mcp_addr, chat_addr);

    assert!(service.research(&ResearchRequest::profit("   ")).await.is_err());
    assert!(mcp_state.methods.lock().unwrap().is_empty());
    assert!(chat_state.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn research_service_lists_tools_and_disconnects() {
    let (mcp_addr, mcp_state) = spawn_mcp().await;
    let (chat_addr, _) = spawn_chat(Vec::new()).await;
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path(), mcp_addr, chat_addr);

    let names = service.tool_names().await.unwrap();
    assert_eq!(names, vec!["search_prices", "write_file"]);
    assert_eq!(*mcp_state.closed_sessions.lock().unwrap(), vec![SESSION.to_string()]);
}

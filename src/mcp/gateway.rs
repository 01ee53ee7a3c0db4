//! Connects every configured tool service and exposes one flat tool list.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{McpClient, McpError, McpServerConfig, RemoteTool};
use crate::tools::{Tool, ToolRegistry};

/// A remote MCP tool, invocable through the client that advertised it.
pub struct McpTool {
    client: Arc<McpClient>,
    definition: RemoteTool,
}

impl McpTool {
    pub fn new(client: Arc<McpClient>, definition: RemoteTool) -> Self {
        Self { client, definition }
    }

    /// Name of the service this tool belongs to.
    pub fn server(&self) -> &str {
        self.client.name()
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn description(&self) -> &str {
        self.definition.description.as_deref().unwrap_or("")
    }

    fn parameters_schema(&self) -> Value {
        self.definition.input_schema.clone()
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let args = if args.is_null() {
            Value::Object(Default::default())
        } else {
            args
        };
        tracing::info!("Calling {}.{}", self.server(), self.definition.name);
        Ok(self.client.call_tool(&self.definition.name, args).await?)
    }
}

/// All connected tool services for one invocation.
pub struct ToolGateway {
    clients: Vec<Arc<McpClient>>,
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolGateway {
    /// Connect to each service in order and collect its tools.
    ///
    /// The first failure aborts the whole connection attempt; servers that
    /// were already started are shut down before the error is returned.
    pub async fn connect(servers: &[McpServerConfig]) -> Result<Self, McpError> {
        let mut gateway = Self {
            clients: Vec::with_capacity(servers.len()),
            tools: Vec::new(),
        };
        let mut seen = HashSet::new();

        for server in servers {
            tracing::info!("Connecting to MCP server '{}' ({})", server.name, server.transport);

            let connected = match McpClient::connect(server).await {
                Ok(client) => {
                    let client = Arc::new(client);
                    gateway.clients.push(client.clone());
                    client.list_tools().await.map(|tools| (client, tools))
                }
                Err(e) => Err(e),
            };

            let (client, remote_tools) = match connected {
                Ok(pair) => pair,
                Err(e) => {
                    gateway.shutdown().await;
                    return Err(McpError::Connect {
                        server: server.name.clone(),
                        source: Box::new(e),
                    });
                }
            };

            for definition in remote_tools {
                if !seen.insert(definition.name.clone()) {
                    tracing::warn!(
                        "Tool '{}' from '{}' shadows an earlier tool with the same name; skipping",
                        definition.name,
                        server.name
                    );
                    continue;
                }
                gateway
                    .tools
                    .push(Arc::new(McpTool::new(client.clone(), definition)));
            }
        }

        tracing::info!("Connected! Available tools: {:?}", gateway.tool_names());
        Ok(gateway)
    }

    /// The flat tool list, in service then advertisement order.
    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// A registry over the gateway's tools, for handing to an agent.
    pub fn registry(&self) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for tool in &self.tools {
            registry.register(tool.clone());
        }
        registry
    }

    /// Shut down every connected service.
    pub async fn shutdown(&self) {
        for client in &self.clients {
            client.shutdown().await;
        }
    }
}

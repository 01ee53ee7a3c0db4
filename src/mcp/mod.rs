//! Tool Provider Gateway - MCP client connections to external tool services.
//!
//! Each configured service is either a remote server reached over streamable
//! HTTP (the Tavily search server) or a local process spoken to over
//! stdin/stdout (the filesystem server). The gateway connects to all of them
//! and flattens their tools into one list.

mod client;
mod gateway;

use std::fmt;

use thiserror::Error;
use url::Url;

pub use client::{McpClient, RemoteTool, ServerInfo};
pub use gateway::{McpTool, ToolGateway};

/// MCP protocol revision sent during the handshake.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

#[derive(Debug, Error)]
pub enum McpError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("tool reported an error: {0}")]
    ToolError(String),

    #[error("failed to connect to '{server}': {source}")]
    Connect {
        server: String,
        #[source]
        source: Box<McpError>,
    },
}

/// How to reach a tool service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Spawn a local process and exchange newline-delimited JSON-RPC.
    Stdio { command: String, args: Vec<String> },
    /// POST JSON-RPC to a remote endpoint (streamable HTTP).
    Http { url: String },
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Stdio { command, args } => {
                write!(f, "stdio: {}", command)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
            Transport::Http { url } => write!(f, "http: {}", redact_url(url)),
        }
    }
}

/// A named tool service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpServerConfig {
    pub name: String,
    pub transport: Transport,
}

/// Mask query parameters that look like credentials.
pub fn redact_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let lower = k.to_lowercase();
            if lower.contains("key") || lower.contains("token") || lower.contains("secret") {
                (k.into_owned(), "***".to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();

    if pairs.is_empty() {
        return url.to_string();
    }

    url.query_pairs_mut().clear().extend_pairs(pairs);
    url.to_string()
}

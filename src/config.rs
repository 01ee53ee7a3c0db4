//! Configuration management for the product research agent.
//!
//! Configuration is read from environment variables (a `.env` file is loaded
//! by the binaries first):
//! - `OPENAI_API_KEY` - Required. Credential for the chat-completions provider.
//! - `MODEL` - Required. Model identifier passed to the provider.
//! - `TAVILY_API_KEY` - Required. Credential for the Tavily search MCP server.
//! - `OPENAI_BASE_URL` - Optional. Defaults to `https://api.openai.com/v1`.
//! - `TAVILY_MCP_URL` - Optional. Defaults to `https://mcp.tavily.com/mcp/`.
//! - `OUTPUT_DIR` - Optional. Report directory. Defaults to `outputs`.
//! - `HOST` - Optional. Web UI host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Web UI port. Defaults to `8501`.
//! - `MAX_ITERATIONS` - Optional. Maximum agent loop iterations. Defaults to `25`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

use crate::mcp::{McpServerConfig, Transport};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TAVILY_MCP_URL: &str = "https://mcp.tavily.com/mcp/";

/// npm package of the filesystem MCP server used for saving reports.
const FILESYSTEM_SERVER_PACKAGE: &str = "@modelcontextprotocol/server-filesystem";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Agent configuration.
#[derive(Clone)]
pub struct Config {
    /// Chat-completions API key
    pub openai_api_key: String,

    /// Chat-completions base URL (OpenAI-compatible)
    pub openai_base_url: String,

    /// Model identifier
    pub model: String,

    /// Tavily API key, embedded in the search server URL
    pub tavily_api_key: String,

    /// Tavily remote MCP endpoint, without the key
    pub tavily_mcp_url: String,

    /// Directory the filesystem server is scoped to
    pub output_dir: PathBuf,

    /// Web UI host
    pub host: String,

    /// Web UI port
    pub port: u16,

    /// Maximum iterations for the agent loop
    pub max_iterations: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("openai_api_key", &"<redacted>")
            .field("openai_base_url", &self.openai_base_url)
            .field("model", &self.model)
            .field("tavily_api_key", &"<redacted>")
            .field("tavily_mcp_url", &self.tavily_mcp_url)
            .field("output_dir", &self.output_dir)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` naming the first of
    /// `OPENAI_API_KEY`, `MODEL` or `TAVILY_API_KEY` that is unset or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let openai_api_key = required("OPENAI_API_KEY")?;
        let model = required("MODEL")?;
        let tavily_api_key = required("TAVILY_API_KEY")?;

        let openai_base_url = lookup("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());

        let tavily_mcp_url = lookup("TAVILY_MCP_URL")
            .unwrap_or_else(|| DEFAULT_TAVILY_MCP_URL.to_string());
        Url::parse(&tavily_mcp_url)
            .map_err(|e| ConfigError::InvalidValue("TAVILY_MCP_URL".to_string(), e.to_string()))?;

        let output_dir = lookup("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("outputs"));

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "8501".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let max_iterations: usize = lookup("MAX_ITERATIONS")
            .unwrap_or_else(|| "25".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("MAX_ITERATIONS".to_string(), format!("{}", e)))?;
        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ITERATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            openai_api_key,
            openai_base_url,
            model,
            tavily_api_key,
            tavily_mcp_url,
            output_dir,
            host,
            port,
            max_iterations,
        })
    }

    /// Tavily endpoint with the API key appended as `tavilyApiKey`.
    pub fn tavily_url(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.tavily_mcp_url)
            .map_err(|e| ConfigError::InvalidValue("TAVILY_MCP_URL".to_string(), e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("tavilyApiKey", &self.tavily_api_key);
        Ok(url)
    }

    /// The tool services every research task connects to: remote search and
    /// a filesystem server scoped to `output_dir`.
    pub fn mcp_servers(&self, output_dir: &Path) -> Result<Vec<McpServerConfig>, ConfigError> {
        Ok(vec![
            McpServerConfig {
                name: "tavily".to_string(),
                transport: Transport::Http {
                    url: self.tavily_url()?.to_string(),
                },
            },
            McpServerConfig {
                name: "filesystem".to_string(),
                transport: Transport::Stdio {
                    command: "npx".to_string(),
                    args: vec![
                        "-y".to_string(),
                        FILESYSTEM_SERVER_PACKAGE.to_string(),
                        output_dir.to_string_lossy().to_string(),
                    ],
                },
            },
        ])
    }
}

//! Research tasks - wires config, tool gateway, model and prompts together.
//!
//! Every request connects its own gateway, runs a fresh agent and shuts the
//! tool servers down again, so no state crosses invocations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use crate::agent::prompt::{
    self, ReportKind, DESCRIPTION_GENERATOR_PROMPT, INTERACTIVE_PROFIT_PROMPT,
    PROFIT_CALCULATOR_PROMPT,
};
use crate::agent::{Agent, AgentOutcome, AgentSettings};
use crate::config::Config;
use crate::llm::{LlmClient, OpenAiClient};
use crate::mcp::{McpServerConfig, ToolGateway};

/// Sampling temperature for price analysis.
const ANALYSIS_TEMPERATURE: f32 = 0.0;
/// Sampling temperature for creative writing.
const WRITING_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchTask {
    /// Compare marketplace prices and give a profitability verdict.
    ProfitAnalysis,
    /// Same analysis with the terser command-line prompts.
    QuickProfitAnalysis,
    /// Research a product and write three description variants.
    Descriptions { product_url: Option<String> },
}

/// One product to research.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchRequest {
    pub product: String,
    pub task: ResearchTask,
}

impl ResearchRequest {
    pub fn profit(product: &str) -> Self {
        Self {
            product: product.trim().to_string(),
            task: ResearchTask::ProfitAnalysis,
        }
    }

    pub fn quick_profit(product: &str) -> Self {
        Self {
            product: product.trim().to_string(),
            task: ResearchTask::QuickProfitAnalysis,
        }
    }

    pub fn descriptions(product: &str, product_url: Option<&str>) -> Self {
        Self {
            product: product.trim().to_string(),
            task: ResearchTask::Descriptions {
                product_url: product_url
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .map(str::to_string),
            },
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self.task {
            ResearchTask::ProfitAnalysis => PROFIT_CALCULATOR_PROMPT,
            ResearchTask::QuickProfitAnalysis => INTERACTIVE_PROFIT_PROMPT,
            ResearchTask::Descriptions { .. } => DESCRIPTION_GENERATOR_PROMPT,
        }
    }

    pub fn query(&self) -> String {
        match &self.task {
            ResearchTask::ProfitAnalysis => prompt::profit_query(&self.product),
            ResearchTask::QuickProfitAnalysis => prompt::interactive_profit_query(&self.product),
            ResearchTask::Descriptions { product_url } => {
                prompt::description_query(&self.product, product_url.as_deref())
            }
        }
    }

    pub fn report_kind(&self) -> ReportKind {
        match self.task {
            ResearchTask::ProfitAnalysis | ResearchTask::QuickProfitAnalysis => ReportKind::Analysis,
            ResearchTask::Descriptions { .. } => ReportKind::Descriptions,
        }
    }

    /// File the model is asked to save its report as.
    pub fn report_file_name(&self) -> String {
        prompt::report_file_name(&self.product, self.report_kind())
    }

    pub fn temperature(&self) -> f32 {
        match self.task {
            ResearchTask::Descriptions { .. } => WRITING_TEMPERATURE,
            _ => ANALYSIS_TEMPERATURE,
        }
    }
}

/// Runs research requests. Front ends depend on this, not on the agent.
#[async_trait]
pub trait Researcher: Send + Sync {
    async fn research(&self, request: &ResearchRequest) -> anyhow::Result<AgentOutcome>;

    /// Names of the tools a research run would get.
    async fn tool_names(&self) -> anyhow::Result<Vec<String>>;

    /// Directory reports are saved in.
    fn output_dir(&self) -> &Path;
}

/// The real researcher: MCP tools plus a hosted model.
pub struct ResearchService {
    config: Config,
    llm: Arc<dyn LlmClient>,
    tool_servers: Option<Vec<McpServerConfig>>,
}

impl ResearchService {
    pub fn new(config: Config) -> Self {
        let llm = Arc::new(OpenAiClient::new(
            config.openai_api_key.clone(),
            &config.openai_base_url,
        ));
        Self {
            config,
            llm,
            tool_servers: None,
        }
    }

    /// Connect to `servers` instead of the configured search and filesystem services.
    pub fn with_tool_servers(mut self, servers: Vec<McpServerConfig>) -> Self {
        self.tool_servers = Some(servers);
        self
    }

    /// Create the output directory and return its absolute path.
    async fn prepare_output_dir(&self) -> anyhow::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .with_context(|| {
                format!("Failed to create output directory {}", self.config.output_dir.display())
            })?;
        tokio::fs::canonicalize(&self.config.output_dir)
            .await
            .with_context(|| format!("Failed to resolve {}", self.config.output_dir.display()))
    }

    async fn connect_tools(&self) -> anyhow::Result<ToolGateway> {
        let output_dir = self.prepare_output_dir().await?;
        let servers = match &self.tool_servers {
            Some(servers) => servers.clone(),
            None => self.config.mcp_servers(&output_dir)?,
        };

        tracing::info!("Connecting to MCP servers...");
        ToolGateway::connect(&servers)
            .await
            .context("Failed to connect to tool servers")
    }
}

#[async_trait]
impl Researcher for ResearchService {
    async fn research(&self, request: &ResearchRequest) -> anyhow::Result<AgentOutcome> {
        anyhow::ensure!(!request.product.is_empty(), "Product name is empty");

        let gateway = self.connect_tools().await?;

        let agent = Agent::new(
            self.llm.clone(),
            gateway.registry(),
            request.system_prompt(),
            AgentSettings {
                model: self.config.model.clone(),
                temperature: Some(request.temperature()),
                max_iterations: self.config.max_iterations,
            },
        );

        tracing::info!("Researching '{}' ({:?})", request.product, request.report_kind());
        let outcome = agent.run(&request.query()).await;
        gateway.shutdown().await;
        outcome
    }

    async fn tool_names(&self) -> anyhow::Result<Vec<String>> {
        let gateway = self.connect_tools().await?;
        let names = gateway.tool_names();
        gateway.shutdown().await;
        Ok(names)
    }

    fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }
}

/// A report name that maps to a file directly inside the output directory:
/// no separators, no hidden files, no quoting.
pub fn is_report_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name.ends_with(".md")
        && !name.contains(['/', '\\', '"', '\0'])
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}

/// Path of the request's report if the model saved it where it can be served.
pub async fn saved_report(output_dir: &Path, request: &ResearchRequest) -> Option<PathBuf> {
    let name = request.report_file_name();
    if !is_report_file_name(&name) {
        tracing::debug!("Report name {:?} is not a plain file name", name);
        return None;
    }

    let path = output_dir.join(name);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Some(path),
        _ => None,
    }
}

//! # Product Research
//!
//! Agent-driven product research for e-commerce sellers.
//!
//! This library provides:
//! - An MCP client and tool gateway (web search over HTTP, file writes over stdio)
//! - A tool-based agent loop against an OpenAI-compatible chat endpoint
//! - Prompt templates for profit analyses and product descriptions
//! - An interactive command-line front end and a web front end
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Connect to the configured MCP servers and collect their tools
//! 2. Send the system prompt, the product query and the tool schemas to the model
//! 3. Execute any tool calls through the gateway and feed the results back
//! 4. Repeat until the model answers without tool calls
//!
//! ## Example
//!
//! ```rust,ignore
//! use product_research::{Config, research::{ResearchRequest, ResearchService, Researcher}};
//!
//! let service = ResearchService::new(Config::from_env()?);
//! let outcome = service.research(&ResearchRequest::profit("sunset lamp")).await?;
//! println!("{}", outcome.text);
//! ```

pub mod agent;
pub mod api;
pub mod cli;
pub mod config;
pub mod llm;
pub mod mcp;
pub mod research;
pub mod tools;

pub use config::Config;

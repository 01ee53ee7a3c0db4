//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::agent::RunLogEntry;

/// Form posted by the profit calculator tab.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfitForm {
    #[serde(default)]
    pub product_name: String,
}

/// Form posted by the description generator tab.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DescriptionForm {
    #[serde(default)]
    pub product_name: String,

    #[serde(default)]
    pub product_url: String,
}

/// JSON body for `POST /api/profit`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfitRequest {
    pub product_name: String,
}

/// JSON body for `POST /api/descriptions`.
#[derive(Debug, Clone, Deserialize)]
pub struct DescriptionRequest {
    pub product_name: String,

    #[serde(default)]
    pub product_url: Option<String>,
}

/// Result of a research run over the JSON API.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchResponse {
    /// The agent's final answer, verbatim
    pub result: String,

    /// Name of the saved report, if the model wrote one
    pub report_file: Option<String>,

    /// Number of model calls
    pub iterations: usize,

    /// Execution log
    pub log: Vec<RunLogEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

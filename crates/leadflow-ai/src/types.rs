//! Shared input/output types for the model-call wrappers.

use serde::Deserialize;

/// Company context forwarded into every prompt.
#[derive(Debug, Clone)]
pub struct CompanyContext {
    pub name: String,
    pub website: String,
    pub description: String,
    pub target_audience: String,
}

/// A structured search query produced by the generator.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedQuery {
    pub query: String,
    #[serde(default)]
    pub criteria: Vec<String>,
    pub rationale: String,
}

/// A past query with its lead yield, supplied as negative context to
/// exploration-mode generation.
#[derive(Debug, Clone)]
pub struct PastQuery {
    pub query: String,
    pub criteria: Vec<String>,
    pub leads_found: i64,
}

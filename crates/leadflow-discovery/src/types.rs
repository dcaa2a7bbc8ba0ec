//! Wire types for the webset discovery provider.

use serde::{Deserialize, Serialize};

/// Parameters for submitting a new webset search.
#[derive(Debug, Clone)]
pub struct WebsetSpec {
    pub query: String,
    pub count: u32,
    pub criteria: Vec<String>,
    /// Ask the provider to find a contact email per result.
    pub include_email: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateWebsetBody {
    pub search: SearchBody,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enrichments: Vec<EnrichmentSpec>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchBody {
    pub query: String,
    pub count: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub criteria: Vec<CriterionSpec>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CriterionSpec {
    pub description: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrichmentSpec {
    pub description: String,
    pub format: &'static str,
}

/// A webset job as reported by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct Webset {
    pub id: String,
    /// `running` while the search is in flight, `idle` once complete.
    pub status: String,
    #[serde(default)]
    pub searches: Vec<WebsetSearchStatus>,
}

impl Webset {
    /// Items found so far, from the first search's progress block.
    #[must_use]
    pub fn items_found(&self) -> i64 {
        self.searches
            .first()
            .and_then(|s| s.progress.as_ref())
            .map_or(0, |p| p.found)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebsetSearchStatus {
    #[serde(default)]
    pub progress: Option<SearchProgress>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchProgress {
    #[serde(default)]
    pub found: i64,
    #[serde(default)]
    pub analyzed: i64,
    #[serde(default)]
    pub completion: f64,
}

/// One result item from a completed webset.
#[derive(Debug, Clone, Deserialize)]
pub struct WebsetItem {
    pub id: String,
    pub properties: WebsetItemProperties,
    /// Raw enrichment payload; the shape varies by provider version, so it
    /// stays untyped and goes through [`crate::extract_email`].
    #[serde(default)]
    pub enrichments: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebsetItemProperties {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemsPage {
    #[serde(default)]
    pub data: Vec<WebsetItem>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

//! HTTP client for the webset discovery provider.
//!
//! Wraps `reqwest` with provider-specific error handling, API key management,
//! and typed response deserialization. Error bodies are surfaced as
//! [`DiscoveryError::ApiError`] with the provider's message when present.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::error::DiscoveryError;
use crate::retry::retry_with_backoff;
use crate::types::{
    CreateWebsetBody, CriterionSpec, EnrichmentSpec, ItemsPage, SearchBody, Webset, WebsetItem,
    WebsetSpec,
};

const DEFAULT_BASE_URL: &str = "https://api.exa.ai/websets/v0";

const EMAIL_ENRICHMENT: &str = "Find the email address for this person or creator";
const FOLLOWER_ENRICHMENT: &str = "Extract the follower or subscriber count if visible";

/// Client for the webset discovery API.
///
/// Manages the HTTP client, API key, and base URL. Use [`WebsetClient::new`]
/// for production or [`WebsetClient::with_base_url`] to point at a mock
/// server in tests.
pub struct WebsetClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl WebsetClient {
    /// Creates a new client pointed at the production discovery API.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, DiscoveryError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`DiscoveryError::ApiError`] if `base_url`
    /// is not a valid URL.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, DiscoveryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("leadflow/0.1 (lead-discovery)")
            .build()?;

        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            DiscoveryError::ApiError(format!("invalid base URL '{base_url}': {e}"))
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            max_retries: 3,
            backoff_base_ms: 1_000,
        })
    }

    /// Overrides the transient-error retry schedule. Tests pass `(n, 0)` to
    /// retry without real delays.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Submits a new webset search and returns the provider's job id.
    ///
    /// Always requests a follower-count enrichment; an email-finder
    /// enrichment is added when `spec.include_email` is set.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::ApiError`] if the provider rejects the request.
    /// - [`DiscoveryError::Http`] on network failure or non-2xx status.
    /// - [`DiscoveryError::Deserialize`] on an unexpected response shape.
    pub async fn submit(&self, spec: &WebsetSpec) -> Result<String, DiscoveryError> {
        let mut enrichments = vec![EnrichmentSpec {
            description: FOLLOWER_ENRICHMENT.to_string(),
            format: "number",
        }];
        if spec.include_email {
            enrichments.insert(
                0,
                EnrichmentSpec {
                    description: EMAIL_ENRICHMENT.to_string(),
                    format: "email",
                },
            );
        }

        let body = CreateWebsetBody {
            search: SearchBody {
                query: spec.query.clone(),
                count: spec.count,
                criteria: spec
                    .criteria
                    .iter()
                    .map(|c| CriterionSpec {
                        description: c.clone(),
                    })
                    .collect(),
            },
            enrichments,
        };

        let url = self.endpoint(&["websets"]);
        let value = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.post_json(&url, &body)
        })
        .await?;

        let webset: Webset = serde_json::from_value(value).map_err(|e| {
            DiscoveryError::Deserialize {
                context: "create webset".to_string(),
                source: e,
            }
        })?;

        Ok(webset.id)
    }

    /// Fetches the current status and progress of a webset.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::ApiError`] if the provider rejects the request.
    /// - [`DiscoveryError::Http`] on network failure or non-2xx status.
    /// - [`DiscoveryError::Deserialize`] on an unexpected response shape.
    pub async fn get(&self, webset_id: &str) -> Result<Webset, DiscoveryError> {
        let url = self.endpoint(&["websets", webset_id]);
        let value = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.get_json(&url)
        })
        .await?;

        serde_json::from_value(value).map_err(|e| DiscoveryError::Deserialize {
            context: format!("get webset {webset_id}"),
            source: e,
        })
    }

    /// Fetches all result items of a webset, following cursor pagination.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::ApiError`] if the provider rejects the request.
    /// - [`DiscoveryError::Http`] on network failure or non-2xx status.
    /// - [`DiscoveryError::Deserialize`] on an unexpected response shape.
    pub async fn list_items(&self, webset_id: &str) -> Result<Vec<WebsetItem>, DiscoveryError> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut url = self.endpoint(&["websets", webset_id, "items"]);
            if let Some(cursor) = &cursor {
                url.query_pairs_mut().append_pair("cursor", cursor);
            }

            let value = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
                self.get_json(&url)
            })
            .await?;

            let page: ItemsPage =
                serde_json::from_value(value).map_err(|e| DiscoveryError::Deserialize {
                    context: format!("list items for webset {webset_id}"),
                    source: e,
                })?;

            items.extend(page.data);

            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(items)
    }

    /// Builds a request URL from path segments under the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().expect("base URL cannot be a base");
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        url
    }

    async fn get_json(&self, url: &Url) -> Result<serde_json::Value, DiscoveryError> {
        let response = self
            .client
            .get(url.clone())
            .header("x-api-key", &self.api_key)
            .send()
            .await?;
        Self::read_json(url, response).await
    }

    async fn post_json<B: serde::Serialize>(
        &self,
        url: &Url,
        body: &B,
    ) -> Result<serde_json::Value, DiscoveryError> {
        let response = self
            .client
            .post(url.clone())
            .header("x-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;
        Self::read_json(url, response).await
    }

    /// Asserts a 2xx status and parses the body as JSON. A non-2xx response
    /// with a JSON `message` field becomes [`DiscoveryError::ApiError`] so
    /// operator-visible failures carry the provider's own wording.
    async fn read_json(
        url: &Url,
        response: reqwest::Response,
    ) -> Result<serde_json::Value, DiscoveryError> {
        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("message")
                        .and_then(serde_json::Value::as_str)
                        .map(ToOwned::to_owned)
                })
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(DiscoveryError::ApiError(message));
        }

        let response = response.error_for_status()?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| DiscoveryError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }
}

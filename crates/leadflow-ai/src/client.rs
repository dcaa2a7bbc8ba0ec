//! HTTP client for an OpenAI-compatible chat completions API.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::Serialize;

use crate::error::AiError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Model used for query generation, persona derivation, and routing.
pub(crate) const WORKHORSE_MODEL: &str = "gpt-4.1-mini";
/// Cheap, fast model for the contact-email extraction pass.
pub(crate) const EXTRACT_MODEL: &str = "gpt-4.1-nano";
/// Strongest tier, reserved for customer-facing email copy.
pub(crate) const COPY_MODEL: &str = "gpt-4.1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Client for the chat completions API.
///
/// Manages the HTTP client, API key, and base URL. Use [`ChatClient::new`]
/// for production or [`ChatClient::with_base_url`] to point at a mock
/// server in tests.
pub struct ChatClient {
    client: Client,
    api_key: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl ChatClient {
    /// Creates a new client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, AiError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed, or [`AiError::ApiError`] if `base_url` is not a
    /// valid URL.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("leadflow/0.1 (lead-pipeline)")
            .build()?;

        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| AiError::ApiError(format!("invalid base URL '{base_url}': {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            max_retries: 2,
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

    /// Sends one system+user exchange in JSON-object mode and returns the
    /// raw message content.
    ///
    /// # Errors
    ///
    /// - [`AiError::ApiError`] if the provider rejects the request.
    /// - [`AiError::Http`] on network failure or non-2xx status (after
    ///   transient retries are exhausted).
    /// - [`AiError::EmptyResponse`] if the completion has no content.
    pub async fn chat_json(
        &self,
        model: &str,
        system: &str,
        user: &str,
        temperature: f64,
        context: &str,
    ) -> Result<String, AiError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().expect("base URL cannot be a base");
            path.pop_if_empty();
            path.push("chat");
            path.push("completions");
        }

        let body = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature,
        };

        let value = retry_with_backoff(self.max_retries, self.backoff_base_ms, || async {
            let response = self
                .client
                .post(url.clone())
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if status.is_client_error() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<serde_json::Value>(&body)
                    .ok()
                    .and_then(|v| {
                        v.pointer("/error/message")
                            .and_then(serde_json::Value::as_str)
                            .map(ToOwned::to_owned)
                    })
                    .unwrap_or_else(|| format!("HTTP {status}"));
                return Err(AiError::ApiError(message));
            }

            let response = response.error_for_status()?;
            Ok(response.json::<serde_json::Value>().await?)
        })
        .await?;

        let content = value
            .pointer("/choices/0/message/content")
            .and_then(serde_json::Value::as_str)
            .map(ToOwned::to_owned);

        content.ok_or_else(|| AiError::EmptyResponse {
            context: context.to_string(),
        })
    }
}

/// Returns `true` for errors that are worth retrying after a back-off delay:
/// network failures and 5xx responses. Provider rejections and contract
/// violations are returned immediately.
fn is_retriable(err: &AiError) -> bool {
    match err {
        AiError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        _ => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on
/// transient errors, with exponential back-off and ±25 % jitter.
async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, AiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AiError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "AI transient error — retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_is_not_retriable() {
        assert!(!is_retriable(&AiError::ApiError("quota".to_owned())));
    }

    #[test]
    fn invalid_decision_is_not_retriable() {
        assert!(!is_retriable(&AiError::InvalidDecision("skip".to_owned())));
    }
}

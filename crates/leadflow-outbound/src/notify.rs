//! Notification channel for the daily digest email.

use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::json;

use crate::error::OutboundError;

const DEFAULT_BASE_URL: &str = "https://api.resend.com";

/// Client for the transactional email API used to deliver digests.
pub struct NotifyClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl NotifyClient {
    /// Creates a new client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, OutboundError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`OutboundError::ApiError`] if `base_url`
    /// is not a valid URL.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, OutboundError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("leadflow/0.1 (notify)")
            .build()?;

        let base_url =
            Url::parse(base_url.trim_end_matches('/')).map_err(|e| OutboundError::ApiError {
                status: 0,
                message: format!("invalid base URL '{base_url}': {e}"),
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
        })
    }

    /// Sends one HTML email to the given recipients.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError`] on rejection or network failure.
    pub async fn send(
        &self,
        from: &str,
        recipients: &[String],
        subject: &str,
        html: &str,
    ) -> Result<(), OutboundError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .expect("base URL cannot be a base")
            .pop_if_empty()
            .push("emails");

        let body = json!({
            "from": from,
            "to": recipients,
            "subject": subject,
            "html": html
        });

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OutboundError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}

//! HTTP client for the outbound email platform's v2 API.

use std::time::Duration;

use reqwest::{Client, Method, Url};
use serde_json::json;

use crate::error::OutboundError;
use crate::types::{
    CampaignAnalytics, ContactSpec, CreateCampaignSpec, SendingAccount, SequenceStepSpec,
};

const DEFAULT_BASE_URL: &str = "https://api.instantly.ai/api/v2";

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Client for the outbound platform API.
///
/// Manages the HTTP client, API key, and base URL. Use
/// [`OutboundClient::new`] for production or
/// [`OutboundClient::with_base_url`] to point at a mock server in tests.
pub struct OutboundClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl OutboundClient {
    /// Creates a new client pointed at the production platform API.
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
            .user_agent("leadflow/0.1 (outbound)")
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

    /// Registers a new campaign with its sequence and default weekday
    /// 09:00-17:00 send window, returning the platform's campaign id.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError`] on rejection, network failure, or an
    /// unexpected response shape.
    pub async fn create_campaign(&self, spec: &CreateCampaignSpec) -> Result<String, OutboundError> {
        let steps: Vec<serde_json::Value> = spec
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| build_step(i, step))
            .collect();

        let body = json!({
            "name": spec.name,
            "campaign_schedule": {
                "schedules": [{
                    "name": "Default Schedule",
                    "timing": {"from": "09:00", "to": "17:00"},
                    "days": {"0": false, "1": true, "2": true, "3": true, "4": true, "5": true, "6": false},
                    "timezone": "America/Chicago"
                }]
            },
            "sequences": [{"steps": steps}],
            "email_list": spec.email_list,
            "daily_limit": spec.daily_limit,
            "stop_on_reply": true,
            "link_tracking": true,
            "open_tracking": true
        });

        let value = self
            .request(Method::POST, &["campaigns"], &[], Some(&body))
            .await?;

        value
            .get("id")
            .and_then(serde_json::Value::as_str)
            .map(ToOwned::to_owned)
            .ok_or_else(|| OutboundError::Deserialize {
                context: "create campaign".to_string(),
                source: serde::de::Error::custom("response has no 'id' field"),
            })
    }

    /// Attaches a contact to a campaign.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError`] on rejection or network failure.
    pub async fn add_lead(
        &self,
        campaign_external_id: &str,
        contact: &ContactSpec,
    ) -> Result<(), OutboundError> {
        let body = json!({
            "campaign_id": campaign_external_id,
            "leads": [{
                "email": contact.email,
                "first_name": contact.first_name,
                "lead_url": contact.lead_url
            }]
        });

        self.request(Method::POST, &["leads"], &[], Some(&body))
            .await?;
        Ok(())
    }

    /// Activates (starts) a campaign. Safe before any contacts are
    /// attached: an empty campaign sends nothing.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError`] on rejection or network failure.
    pub async fn activate(&self, campaign_external_id: &str) -> Result<(), OutboundError> {
        self.request(
            Method::POST,
            &["campaigns", campaign_external_id, "activate"],
            &[],
            Some(&json!({})),
        )
        .await?;
        Ok(())
    }

    /// Pauses a campaign.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError`] on rejection or network failure.
    pub async fn pause(&self, campaign_external_id: &str) -> Result<(), OutboundError> {
        self.request(
            Method::POST,
            &["campaigns", campaign_external_id, "pause"],
            &[],
            Some(&json!({})),
        )
        .await?;
        Ok(())
    }

    /// Fetches delivery counters for a campaign.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError`] on rejection, network failure, or an
    /// unexpected response shape.
    pub async fn get_analytics(
        &self,
        campaign_external_id: &str,
    ) -> Result<CampaignAnalytics, OutboundError> {
        let value = self
            .request(
                Method::GET,
                &["campaigns", "analytics"],
                &[("campaign_id", campaign_external_id)],
                None,
            )
            .await?;

        serde_json::from_value(value).map_err(|e| OutboundError::Deserialize {
            context: format!("analytics for campaign {campaign_external_id}"),
            source: e,
        })
    }

    /// Lists the sending identities registered with the platform.
    ///
    /// # Errors
    ///
    /// Returns [`OutboundError`] on rejection, network failure, or an
    /// unexpected response shape.
    pub async fn list_accounts(&self) -> Result<Vec<SendingAccount>, OutboundError> {
        let value = self.request(Method::GET, &["accounts"], &[], None).await?;

        let items = value
            .get("items")
            .cloned()
            .unwrap_or(serde_json::Value::Array(vec![]));
        serde_json::from_value(items).map_err(|e| OutboundError::Deserialize {
            context: "list accounts".to_string(),
            source: e,
        })
    }

    async fn request(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, OutboundError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().expect("base URL cannot be a base");
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        for (k, v) in query {
            url.query_pairs_mut().append_pair(k, v);
        }

        let mut request = self
            .client
            .request(method, url.clone())
            .bearer_auth(&self.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OutboundError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        if text.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| OutboundError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }
}

/// Builds one sequence step in the platform's wire shape: the first step
/// sends immediately, later steps convert their day delay to minutes.
fn build_step(index: usize, step: &SequenceStepSpec) -> serde_json::Value {
    let delay_minutes = if index == 0 {
        0
    } else {
        step.delay_days.max(1) * MINUTES_PER_DAY
    };
    json!({
        "type": "email",
        "delay": delay_minutes,
        "variants": [{"subject": step.subject, "body": step.body}]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_has_no_delay() {
        let step = SequenceStepSpec {
            subject: "s".to_string(),
            body: "b".to_string(),
            delay_days: 0,
        };
        assert_eq!(build_step(0, &step)["delay"], 0);
    }

    #[test]
    fn follow_up_delay_is_converted_to_minutes() {
        let step = SequenceStepSpec {
            subject: String::new(),
            body: "b".to_string(),
            delay_days: 3,
        };
        assert_eq!(build_step(1, &step)["delay"], 3 * 24 * 60);
    }

    #[test]
    fn zero_day_follow_up_is_floored_to_one_day() {
        let step = SequenceStepSpec {
            subject: String::new(),
            body: "b".to_string(),
            delay_days: 0,
        };
        assert_eq!(build_step(2, &step)["delay"], 24 * 60);
    }
}

//! Wire types for the outbound email platform.

use serde::Deserialize;

/// One step of a sequence to register: delays are in days and converted to
/// the platform's minute granularity at request time.
#[derive(Debug, Clone)]
pub struct SequenceStepSpec {
    pub subject: String,
    pub body: String,
    pub delay_days: i32,
}

/// Parameters for registering a new campaign.
#[derive(Debug, Clone)]
pub struct CreateCampaignSpec {
    pub name: String,
    /// Sending identities (email accounts) the campaign sends from.
    pub email_list: Vec<String>,
    pub steps: Vec<SequenceStepSpec>,
    pub daily_limit: i32,
}

/// A contact to attach to a campaign.
#[derive(Debug, Clone)]
pub struct ContactSpec {
    pub email: String,
    pub first_name: String,
    /// The lead's source URL, forwarded as a template variable.
    pub lead_url: String,
}

/// Delivery counters for one campaign, as reported by the platform.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CampaignAnalytics {
    #[serde(default)]
    pub sent: i32,
    #[serde(default)]
    pub opened: i32,
    #[serde(default)]
    pub replied: i32,
    #[serde(default)]
    pub bounced: i32,
}

/// A sending identity registered with the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct SendingAccount {
    pub email: String,
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub daily_limit: Option<i32>,
}

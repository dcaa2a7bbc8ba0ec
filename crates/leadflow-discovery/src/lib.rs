//! Client for the external webset discovery provider.
//!
//! Submits search websets with enrichment hints, polls them to completion
//! with a bounded state machine, and extracts contact details from the raw
//! enrichment payloads the provider returns.

mod client;
mod error;
mod extract;
mod platform;
mod poller;
mod retry;
mod types;

pub use client::WebsetClient;
pub use error::DiscoveryError;
pub use extract::{extract_email, extract_follower_count};
pub use platform::detect_platform;
pub use poller::{poll_until_idle, PollConfig, PollOutcome};
pub use types::{
    SearchProgress, Webset, WebsetItem, WebsetItemProperties, WebsetSearchStatus, WebsetSpec,
};

//! Clients for the outbound email platform and the notification channel.
//!
//! The outbound platform owns campaign registration, contact attachment,
//! activation, and delivery analytics; its counters are the source of truth
//! for sent/open/reply numbers. The notification client delivers the daily
//! digest email.

mod client;
mod error;
mod notify;
mod types;

pub use client::OutboundClient;
pub use error::OutboundError;
pub use notify::NotifyClient;
pub use types::{
    CampaignAnalytics, ContactSpec, CreateCampaignSpec, SendingAccount, SequenceStepSpec,
};

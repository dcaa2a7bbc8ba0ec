//! Model calls behind the lead pipeline.
//!
//! One chat-completions client plus typed wrappers for each call the
//! pipeline makes: query generation, persona derivation, contact-email
//! extraction, campaign routing, and email-sequence generation. Responses
//! are parsed defensively — persona output goes through field-level repair
//! with safe defaults, while identity-critical outputs (routing decisions,
//! sequences) are validated strictly and rejected on contract violations.

mod client;
mod email_copy;
mod email_extract;
mod error;
mod json;
mod persona;
mod query_gen;
mod routing;
mod types;

pub use client::ChatClient;
pub use email_copy::{
    generate_sequence, validate_sequence, SequenceStep, BOOKING_LINK_PLACEHOLDER,
    DEFAULT_EMAIL_PROMPT,
};
pub use email_extract::extract_contact_email;
pub use error::AiError;
pub use persona::{derive_persona, repair_persona, PersonaProfile};
pub use query_gen::{generate_exploration_query, generate_focused_query};
pub use routing::{decide_campaign, CampaignSummary, LeadSummary, RoutingDecision};
pub use types::{CompanyContext, GeneratedQuery, PastQuery};

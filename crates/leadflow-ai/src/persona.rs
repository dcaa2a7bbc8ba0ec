//! Persona derivation with field-level schema repair.
//!
//! The persona call returns a rich structured object; any individual field
//! that is missing or has the wrong type falls back to a safe default
//! rather than failing the whole enrichment. Only a completely missing
//! JSON object is an error.

use serde_json::Value;

use crate::client::{ChatClient, WORKHORSE_MODEL};
use crate::error::AiError;
use crate::json::parse_json_object;
use crate::types::CompanyContext;

/// Structured persona derived for a lead.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonaProfile {
    pub category: String,
    pub full_name: String,
    pub title: String,
    pub bio: String,
    pub expertise: Vec<String>,
    pub social_links: Value,
    pub total_audience: i64,
    pub content_types: Vec<String>,
    /// Bounded 1-10.
    pub fit_score: i32,
    pub fit_reason: String,
    /// Contact email the model found, if any.
    pub email: Option<String>,
}

const SYSTEM: &str = "You are a lead enrichment specialist. You receive raw \
data about a lead discovered via web search plus context about the company \
reaching out to them. Work out who the lead is, what they create, how large \
their audience is, and how good a fit they are for the company. Check the raw \
data for a contact email; return null for the email only if it is truly not \
present. Return ONLY valid JSON with fields: category, full_name, title, bio, \
expertise (array), social_links (object), total_audience (number), \
content_types (array), fit_score (1-10), fit_reason, email (string or null).";

/// Derives a persona for a lead from its raw discovery payload.
///
/// # Errors
///
/// Returns [`AiError`] on call failure or when the output contains no JSON
/// object at all. Individual malformed fields are repaired, not errors.
pub async fn derive_persona(
    client: &ChatClient,
    lead_payload: &Value,
    company: &CompanyContext,
) -> Result<PersonaProfile, AiError> {
    // Cap the raw payload; webset enrichment blobs can be large and the tail
    // adds nothing.
    let mut raw = serde_json::to_string_pretty(lead_payload).unwrap_or_default();
    raw.truncate(5_000);

    let user = format!(
        "Enrich this lead.\n\n\
         **Raw Lead Data:**\n{raw}\n\n\
         **Company Context (who wants to reach them):**\n\
         - Company: {}\n\
         - What they do: {}\n\
         - Target audience: {}\n\n\
         Score fit_score 1-10 for how well this lead matches the company's \
         outreach target.",
        company.name, company.description, company.target_audience
    );

    let content = client
        .chat_json(WORKHORSE_MODEL, SYSTEM, &user, 0.3, "persona derivation")
        .await?;

    let value = parse_json_object(&content).ok_or_else(|| AiError::InvalidJson {
        context: "persona derivation".to_string(),
        reason: "no JSON object in output".to_string(),
    })?;

    Ok(repair_persona(&value))
}

/// Builds a [`PersonaProfile`] from a raw value, substituting safe defaults
/// for missing or mistyped fields.
#[must_use]
pub fn repair_persona(value: &Value) -> PersonaProfile {
    PersonaProfile {
        category: str_or(value, "category", "other"),
        full_name: str_or(value, "full_name", "Unknown"),
        title: str_or(value, "title", ""),
        bio: str_or(value, "bio", ""),
        expertise: str_vec(value, "expertise"),
        social_links: value
            .get("social_links")
            .filter(|v| v.is_object())
            .cloned()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        total_audience: value
            .get("total_audience")
            .and_then(Value::as_i64)
            .unwrap_or(0),
        content_types: str_vec(value, "content_types"),
        fit_score: value
            .get("fit_score")
            .and_then(Value::as_i64)
            .map_or(5, |n| n.clamp(1, 10))
            .try_into()
            .unwrap_or(5),
        fit_reason: str_or(value, "fit_reason", ""),
        email: value
            .get("email")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(ToOwned::to_owned),
    }
}

fn str_or(value: &Value, key: &str, default: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

fn str_vec(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

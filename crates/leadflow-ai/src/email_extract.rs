//! Cheap contact-email extraction from raw enrichment payloads.

use serde_json::Value;

use crate::client::{ChatClient, EXTRACT_MODEL};
use crate::error::AiError;
use crate::json::parse_json_object;

const SYSTEM: &str = "Extract the most relevant contact email address from \
this data. Return JSON: {\"email\": \"found@email.com\"} or {\"email\": null} \
if none found. Prefer personal or business emails over generic support \
addresses.";

/// Runs the fast extraction model over a raw payload to find a contact email.
///
/// Short-circuits without any API call when the serialized payload contains
/// no `@` — there is nothing to find. A malformed model answer is treated
/// as "no email found", not an error: this is the last fallback in the
/// resolution chain and the lead will be auto-skipped anyway.
///
/// # Errors
///
/// Returns [`AiError`] only on call failure (network, provider rejection).
pub async fn extract_contact_email(
    client: &ChatClient,
    raw_payload: &Value,
) -> Result<Option<String>, AiError> {
    let mut serialized = raw_payload.to_string();
    if !serialized.contains('@') {
        return Ok(None);
    }
    serialized.truncate(3_000);

    let content = client
        .chat_json(EXTRACT_MODEL, SYSTEM, &serialized, 0.0, "email extraction")
        .await?;

    Ok(parse_extracted_email(&content))
}

fn parse_extracted_email(content: &str) -> Option<String> {
    let value = parse_json_object(content)?;
    value
        .get("email")
        .and_then(Value::as_str)
        .filter(|s| s.contains('@'))
        .map(ToOwned::to_owned)
}

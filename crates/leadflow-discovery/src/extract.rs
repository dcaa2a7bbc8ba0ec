//! Extraction of contact details from raw webset enrichment payloads.
//!
//! The provider has shipped several enrichment shapes over time: a direct
//! `email` string, an array of enrichment objects tagged with a `format`,
//! and named description keys whose values are strings, `{value}` objects,
//! or `{result: [...]}` objects. Extraction tries each known shape in
//! order; the first match wins.

use serde_json::Value;

const EMAIL_KEYS: [&str; 3] = [
    "Find the email address for this person or creator",
    "email_address",
    "contact_email",
];

const FOLLOWER_KEY: &str = "Extract the follower or subscriber count if visible";

/// Pulls a contact email out of a raw enrichment payload, if present.
#[must_use]
pub fn extract_email(enrichments: &Value) -> Option<String> {
    // Direct email field
    if let Some(email) = enrichments.get("email").and_then(Value::as_str) {
        return Some(email.to_owned());
    }

    // Array of enrichment objects tagged with format = "email"
    if let Some(entries) = enrichments.as_array() {
        for entry in entries {
            if entry.get("format").and_then(Value::as_str) == Some("email") {
                if let Some(first) = entry
                    .get("result")
                    .and_then(Value::as_array)
                    .and_then(|r| r.first())
                    .and_then(Value::as_str)
                {
                    return Some(first.to_owned());
                }
            }
        }
    }

    // Named enrichment keys
    for key in EMAIL_KEYS {
        let Some(val) = enrichments.get(key) else {
            continue;
        };
        if let Some(s) = val.as_str() {
            return Some(s.to_owned());
        }
        if let Some(s) = val.get("value").and_then(Value::as_str) {
            return Some(s.to_owned());
        }
        if let Some(first) = val
            .get("result")
            .and_then(Value::as_array)
            .and_then(|r| r.first())
            .and_then(Value::as_str)
        {
            return Some(first.to_owned());
        }
    }

    None
}

/// Pulls a follower/subscriber count out of a raw enrichment payload.
///
/// Tries the direct `followers` field first, then the named enrichment
/// key. Accepts a bare number, a numeric string (with thousands
/// separators), or either shape nested under `value`.
#[must_use]
pub fn extract_follower_count(enrichments: &Value) -> Option<i64> {
    enrichments
        .get("followers")
        .and_then(as_count)
        .or_else(|| enrichments.get(FOLLOWER_KEY).and_then(as_count))
}

fn as_count(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    if let Some(s) = value.as_str() {
        return s.trim().replace(',', "").parse().ok();
    }
    if let Some(inner) = value.get("value") {
        return as_count(inner);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_email_field_wins() {
        let enrichments = json!({"email": "direct@example.com"});
        assert_eq!(
            extract_email(&enrichments).as_deref(),
            Some("direct@example.com")
        );
    }

    #[test]
    fn tagged_array_shape_is_supported() {
        let enrichments = json!([
            {"format": "number", "result": ["15000"]},
            {"format": "email", "result": ["tagged@example.com", "alt@example.com"]}
        ]);
        assert_eq!(
            extract_email(&enrichments).as_deref(),
            Some("tagged@example.com")
        );
    }

    #[test]
    fn tagged_array_with_empty_result_is_skipped() {
        let enrichments = json!([{"format": "email", "result": []}]);
        assert_eq!(extract_email(&enrichments), None);
    }

    #[test]
    fn named_key_string_shape() {
        let enrichments = json!({
            "Find the email address for this person or creator": "named@example.com"
        });
        assert_eq!(
            extract_email(&enrichments).as_deref(),
            Some("named@example.com")
        );
    }

    #[test]
    fn named_key_value_object_shape() {
        let enrichments = json!({"contact_email": {"value": "nested@example.com"}});
        assert_eq!(
            extract_email(&enrichments).as_deref(),
            Some("nested@example.com")
        );
    }

    #[test]
    fn named_key_result_array_shape() {
        let enrichments = json!({"email_address": {"result": ["array@example.com"]}});
        assert_eq!(
            extract_email(&enrichments).as_deref(),
            Some("array@example.com")
        );
    }

    #[test]
    fn no_email_anywhere_returns_none() {
        let enrichments = json!({"followers": 12000, "notes": "no contact info"});
        assert_eq!(extract_email(&enrichments), None);
    }

    #[test]
    fn follower_count_accepts_numbers_and_strings() {
        assert_eq!(extract_follower_count(&json!({"followers": 15000})), Some(15000));
        assert_eq!(
            extract_follower_count(&json!({"followers": "12,500"})),
            Some(12500)
        );
        assert_eq!(
            extract_follower_count(&json!({"followers": {"value": 900}})),
            Some(900)
        );
        assert_eq!(extract_follower_count(&json!({"followers": "soon"})), None);
    }

    #[test]
    fn follower_count_from_named_key() {
        let enrichments = json!({
            "Extract the follower or subscriber count if visible": {"value": "42000"}
        });
        assert_eq!(extract_follower_count(&enrichments), Some(42000));
    }
}

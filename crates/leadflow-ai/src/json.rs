//! Tolerant extraction of a JSON object from model output.
//!
//! Even in JSON mode, models occasionally wrap their answer in a markdown
//! fence or lead with prose. Extraction strips a fence when present and
//! otherwise takes the outermost `{ … }` span.

/// Returns the JSON-object portion of `text`, if any.
#[must_use]
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    // Fenced block: ```json ... ``` or ``` ... ```
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim());
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&trimmed[start..=end])
}

/// Parses the JSON-object portion of `text` into a `serde_json::Value`.
pub(crate) fn parse_json_object(text: &str) -> Option<serde_json::Value> {
    serde_json::from_str(extract_json_object(text)?).ok()
}

//! Search-query generation: focused (instruction-driven) and exploration.

use crate::client::{ChatClient, WORKHORSE_MODEL};
use crate::error::AiError;
use crate::json::parse_json_object;
use crate::types::{CompanyContext, GeneratedQuery, PastQuery};

const FOCUSED_SYSTEM: &str = "You generate search queries for a lead-discovery \
webset API on behalf of a company doing cold outreach. The user supplies a \
specific targeting instruction; produce ONE query that directly addresses it. \
The query should find people with a public social or web presence, reachable \
contact information, and a clear match to the instruction. \
Return ONLY valid JSON: \
{\"query\": \"...\", \"criteria\": [\"...\", \"...\"], \"rationale\": \"how this \
query addresses the instruction\"}";

const EXPLORATION_SYSTEM: &str = "You generate ONE search query per day for a \
lead-discovery webset API on behalf of a company doing cold outreach. There \
are no new targeting instructions, so your job is to explore: pick a segment, \
platform, or content type that is materially different from every past query \
you are shown. The query should find people with a public presence and \
reachable contact information. \
Return ONLY valid JSON: \
{\"query\": \"...\", \"criteria\": [\"...\", \"...\"], \"rationale\": \"what new \
angle this explores and how it differs from past queries\"}";

/// Generates a query targeted at one specific instruction.
///
/// The rationale in the result explicitly addresses the instruction, which
/// the caller persists alongside the query for operator review.
///
/// # Errors
///
/// Returns [`AiError`] on call failure or if the output does not match the
/// `{query, criteria, rationale}` contract.
pub async fn generate_focused_query(
    client: &ChatClient,
    company: &CompanyContext,
    instruction: &str,
) -> Result<GeneratedQuery, AiError> {
    let user = format!(
        "**Company Profile:**\n\
         Name: {}\n\
         Website: {}\n\
         Description: {}\n\
         Target Audience: {}\n\n\
         **Targeting instruction:**\n\
         \"{}\"\n\n\
         Generate ONE query that directly targets what this instruction asks for.",
        company.name, company.website, company.description, company.target_audience, instruction
    );

    let content = client
        .chat_json(WORKHORSE_MODEL, FOCUSED_SYSTEM, &user, 0.7, "focused query")
        .await?;

    parse_generated_query(&content, "focused query")
}

/// Generates a creative exploration query when no instructions are pending.
///
/// `past_queries` (typically the last ~20, with lead yields) are supplied as
/// negative context: the result must take a different angle than all of them.
///
/// # Errors
///
/// Returns [`AiError`] on call failure or if the output does not match the
/// `{query, criteria, rationale}` contract.
pub async fn generate_exploration_query(
    client: &ChatClient,
    company: &CompanyContext,
    agent_notes: Option<&str>,
    past_queries: &[PastQuery],
) -> Result<GeneratedQuery, AiError> {
    let past_context = if past_queries.is_empty() {
        "No past queries yet - this is the first one!".to_string()
    } else {
        past_queries
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. \"{}\" (found {} leads)", i + 1, q.query, q.leads_found))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let notes = agent_notes
        .map(|n| format!("Notes: {n}\n"))
        .unwrap_or_default();

    let user = format!(
        "**Company Profile:**\n\
         Name: {}\n\
         Website: {}\n\
         Description: {}\n\
         Target Audience: {}\n\
         {}\n\
         **Past Queries (DO NOT REPEAT - find something NEW):**\n\
         {}\n\n\
         Generate ONE query that explores a completely different angle.",
        company.name,
        company.website,
        company.description,
        company.target_audience,
        notes,
        past_context
    );

    let content = client
        .chat_json(
            WORKHORSE_MODEL,
            EXPLORATION_SYSTEM,
            &user,
            0.9,
            "exploration query",
        )
        .await?;

    parse_generated_query(&content, "exploration query")
}

/// Parses and validates the `{query, criteria, rationale}` contract.
fn parse_generated_query(content: &str, context: &str) -> Result<GeneratedQuery, AiError> {
    let value = parse_json_object(content).ok_or_else(|| AiError::InvalidJson {
        context: context.to_string(),
        reason: "no JSON object in output".to_string(),
    })?;

    let generated: GeneratedQuery =
        serde_json::from_value(value).map_err(|e| AiError::InvalidJson {
            context: context.to_string(),
            reason: e.to_string(),
        })?;

    if generated.query.trim().is_empty() {
        return Err(AiError::InvalidJson {
            context: context.to_string(),
            reason: "query is empty".to_string(),
        });
    }

    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_complete_answer() {
        let content = r#"{"query": "yoga instructors on youtube", "criteria": ["has email"], "rationale": "targets the instructed segment"}"#;
        let q = parse_generated_query(content, "test").expect("should parse");
        assert_eq!(q.query, "yoga instructors on youtube");
        assert_eq!(q.criteria, vec!["has email"]);
    }

    #[test]
    fn criteria_may_be_omitted() {
        let content = r#"{"query": "podcast hosts", "rationale": "r"}"#;
        let q = parse_generated_query(content, "test").expect("should parse");
        assert!(q.criteria.is_empty());
    }

    #[test]
    fn empty_query_is_rejected() {
        let content = r#"{"query": "  ", "criteria": [], "rationale": "r"}"#;
        let err = parse_generated_query(content, "test").unwrap_err();
        assert!(matches!(err, AiError::InvalidJson { .. }));
    }

    #[test]
    fn missing_rationale_is_rejected() {
        let content = r#"{"query": "podcast hosts"}"#;
        let err = parse_generated_query(content, "test").unwrap_err();
        assert!(matches!(err, AiError::InvalidJson { .. }));
    }
}

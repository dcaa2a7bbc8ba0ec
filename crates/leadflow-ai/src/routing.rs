//! The campaign routing decision call.
//!
//! Given an enriched lead and the company's routable campaigns with live
//! performance stats, the model picks exactly one action. The decision
//! contract is enforced in code, not just in the prompt: an unknown
//! campaign id, or a `skip` outside autonomous mode, is rejected as
//! [`AiError::InvalidDecision`].

use serde::{Deserialize, Serialize};

use crate::client::{ChatClient, WORKHORSE_MODEL};
use crate::error::AiError;
use crate::json::parse_json_object;
use crate::types::CompanyContext;

/// The lead fields the decision call sees.
#[derive(Debug, Clone)]
pub struct LeadSummary {
    pub email: String,
    pub full_name: Option<String>,
    pub category: Option<String>,
    pub platform: Option<String>,
    pub bio: Option<String>,
    pub expertise: Vec<String>,
    pub total_audience: Option<i64>,
    pub content_types: Vec<String>,
    pub fit_score: Option<i32>,
    pub fit_reason: Option<String>,
}

/// One routable campaign with live performance annotations.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignSummary {
    pub id: i64,
    pub name: String,
    pub persona: Option<String>,
    pub leads_count: i32,
    pub max_leads: i32,
    pub emails_sent: i32,
    pub open_rate: String,
    pub reply_rate: String,
}

/// Exactly one of: attach to an existing campaign, create a new one, or
/// (autonomous mode only) skip.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RoutingDecision {
    AddToExisting { campaign_id: i64, reason: String },
    CreateNew {
        suggested_name: String,
        suggested_persona: String,
        reason: String,
    },
    Skip { reason: String },
}

/// Decides where a lead should be routed.
///
/// In non-autonomous mode `skip` is not an available action: the prompt
/// does not offer it and an answer using it anyway is rejected, so the
/// engine always proposes an existing or new campaign and defers the
/// skip/accept call to a human.
///
/// # Errors
///
/// Returns [`AiError::InvalidDecision`] on contract violations,
/// [`AiError::InvalidJson`] on unparseable output, or the underlying call
/// error.
pub async fn decide_campaign(
    client: &ChatClient,
    lead: &LeadSummary,
    campaigns: &[CampaignSummary],
    company: &CompanyContext,
    auto_mode: bool,
) -> Result<RoutingDecision, AiError> {
    let system = build_system_prompt(auto_mode);

    let campaign_context = if campaigns.is_empty() {
        "No active campaigns exist yet.".to_string()
    } else {
        serde_json::to_string_pretty(campaigns).unwrap_or_default()
    };

    let user = format!(
        "Route this lead to a campaign.\n\n\
         **Lead:**\n\
         - Name: {}\n\
         - Email: {}\n\
         - Category: {}\n\
         - Platform: {}\n\
         - Bio: {}\n\
         - Expertise: {}\n\
         - Audience: {}\n\
         - Content Types: {}\n\
         - Fit Score: {}/10\n\
         - Fit Reason: {}\n\n\
         **Company:** {}\n\
         - Description: {}\n\
         - Target Audience: {}\n\n\
         **Available Campaigns ({}):**\n{}",
        lead.full_name.as_deref().unwrap_or("Unknown"),
        lead.email,
        lead.category.as_deref().unwrap_or("unknown"),
        lead.platform.as_deref().unwrap_or("unknown"),
        lead.bio.as_deref().unwrap_or("N/A"),
        join_or_na(&lead.expertise),
        lead.total_audience
            .map_or_else(|| "Unknown".to_string(), |n| n.to_string()),
        join_or_na(&lead.content_types),
        lead.fit_score
            .map_or_else(|| "N/A".to_string(), |n| n.to_string()),
        lead.fit_reason.as_deref().unwrap_or("N/A"),
        company.name,
        company.description,
        company.target_audience,
        campaigns.len(),
        campaign_context,
    );

    let content = client
        .chat_json(WORKHORSE_MODEL, &system, &user, 0.3, "routing decision")
        .await?;

    let valid_ids: Vec<i64> = campaigns.iter().map(|c| c.id).collect();
    parse_decision(&content, auto_mode, &valid_ids)
}

fn build_system_prompt(auto_mode: bool) -> String {
    let mut prompt = String::from(
        "You are a campaign routing agent for an outbound email system.\n\n\
         Decide where to route a newly enriched lead:\n\
         1. add_to_existing - add to an existing active campaign that fits this lead's persona\n\
         2. create_new - no suitable campaign exists; suggest creating a new one\n",
    );
    if auto_mode {
        prompt.push_str(
            "3. skip - lead is not worth emailing (low fit score, irrelevant)\n",
        );
    }
    prompt.push_str(
        "\nGuidelines:\n\
         - Match leads to campaigns by persona/category and platform alignment\n\
         - Prefer campaigns that are under capacity (leads_count < max_leads)\n\
         - Avoid campaigns with a reply rate under 1% unless they have sent \
         too few emails for that to mean anything\n",
    );
    if auto_mode {
        prompt.push_str("- A lead with fit score 3 or below should generally be skipped\n");
    } else {
        prompt.push_str(
            "- NEVER skip a lead. Always pick an existing campaign or create a \
             new one; a human decides whether to skip.\n",
        );
    }
    prompt.push_str(
        "- When creating a new campaign, suggest a clear persona and a descriptive name\n\
         - Keep the reason to 1-2 sentences\n\n\
         Return ONLY valid JSON in one of these shapes:\n\
         {\"action\": \"add_to_existing\", \"campaign_id\": <id>, \"reason\": \"...\"}\n\
         {\"action\": \"create_new\", \"suggested_name\": \"...\", \"suggested_persona\": \"...\", \"reason\": \"...\"}\n",
    );
    if auto_mode {
        prompt.push_str("{\"action\": \"skip\", \"reason\": \"...\"}\n");
    }
    prompt
}

/// Parses and validates a routing decision against the contract.
fn parse_decision(
    content: &str,
    auto_mode: bool,
    valid_campaign_ids: &[i64],
) -> Result<RoutingDecision, AiError> {
    let value = parse_json_object(content).ok_or_else(|| AiError::InvalidJson {
        context: "routing decision".to_string(),
        reason: "no JSON object in output".to_string(),
    })?;

    let decision: RoutingDecision =
        serde_json::from_value(value).map_err(|e| AiError::InvalidJson {
            context: "routing decision".to_string(),
            reason: e.to_string(),
        })?;

    match &decision {
        RoutingDecision::AddToExisting { campaign_id, .. } => {
            if !valid_campaign_ids.contains(campaign_id) {
                return Err(AiError::InvalidDecision(format!(
                    "campaign {campaign_id} is not among the routable campaigns"
                )));
            }
        }
        RoutingDecision::Skip { .. } if !auto_mode => {
            return Err(AiError::InvalidDecision(
                "skip is not an available action outside autonomous mode".to_string(),
            ));
        }
        _ => {}
    }

    Ok(decision)
}

fn join_or_na(items: &[String]) -> String {
    if items.is_empty() {
        "N/A".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_to_existing() {
        let content = r#"{"action": "add_to_existing", "campaign_id": 7, "reason": "persona match"}"#;
        let decision = parse_decision(content, false, &[3, 7]).expect("should parse");
        assert_eq!(
            decision,
            RoutingDecision::AddToExisting {
                campaign_id: 7,
                reason: "persona match".to_string()
            }
        );
    }

    #[test]
    fn parses_create_new() {
        let content = r#"{"action": "create_new", "suggested_name": "Yoga Instructors", "suggested_persona": "yoga instructor", "reason": "no fit"}"#;
        let decision = parse_decision(content, false, &[]).expect("should parse");
        assert!(matches!(decision, RoutingDecision::CreateNew { .. }));
    }

    #[test]
    fn skip_is_allowed_in_auto_mode() {
        let content = r#"{"action": "skip", "reason": "fit score 2"}"#;
        let decision = parse_decision(content, true, &[]).expect("should parse");
        assert!(matches!(decision, RoutingDecision::Skip { .. }));
    }

    #[test]
    fn skip_is_rejected_outside_auto_mode() {
        let content = r#"{"action": "skip", "reason": "fit score 2"}"#;
        let err = parse_decision(content, false, &[]).unwrap_err();
        assert!(matches!(err, AiError::InvalidDecision(_)));
    }

    #[test]
    fn unknown_campaign_id_is_rejected() {
        let content = r#"{"action": "add_to_existing", "campaign_id": 99, "reason": "r"}"#;
        let err = parse_decision(content, true, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, AiError::InvalidDecision(_)));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let content = r#"{"action": "defer", "reason": "r"}"#;
        let err = parse_decision(content, true, &[]).unwrap_err();
        assert!(matches!(err, AiError::InvalidJson { .. }));
    }
}

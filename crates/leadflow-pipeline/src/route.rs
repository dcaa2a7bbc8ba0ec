//! Stage 4: the campaign router.
//!
//! The decision engine proposes exactly one action per enriched lead. Its
//! outcome is stored as a non-binding suggestion; the binding attachment —
//! the outbound-platform call, the `routed` transition, and the campaign
//! counter — happens only through [`confirm_routing`], invoked either by
//! the autopilot safety check or by an explicit operator action.

use futures::stream::{self, StreamExt};
use sqlx::PgPool;

use leadflow_ai::{decide_campaign, CampaignSummary, LeadSummary, RoutingDecision};
use leadflow_core::AppConfig;
use leadflow_db::{
    get_campaign, get_company, get_lead, get_query, increment_campaign_leads, list_routable_campaigns,
    mark_lead_routed, mark_lead_skipped, set_suggested_campaign, CampaignRow, LeadRow,
};
use leadflow_outbound::ContactSpec;

use crate::campaigns::create_campaign_for_persona;
use crate::{company_context, Clients, PipelineError};

/// Terminal state of one routing pass for a lead.
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    /// Autopilot confirmed the suggestion; the lead is attached.
    AutoRouted { campaign_id: i64 },
    /// A suggestion was recorded; a human confirms or rejects it.
    Suggested { campaign_id: i64 },
    /// The lead was skipped with a recorded reason.
    Skipped { reason: String },
}

/// Aggregate outcome of a confirmation batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfirmBatchOutcome {
    pub attached: u32,
    pub already_routed: u32,
    pub failed: u32,
}

/// Produces (and possibly auto-confirms) a campaign suggestion for an
/// enriched lead.
///
/// Guards, in order: an already-settled lead short-circuits; a lead that
/// is not `enriched` is not routable; a lead with no email is skipped
/// before the decision call is made at all. A `create_new` decision
/// materializes the campaign *before* the suggestion is persisted, so the
/// suggested campaign always exists by the time it is visible.
///
/// # Errors
///
/// Returns [`PipelineError`] on decision-call failures (including contract
/// violations), campaign-creation failures, or store errors. The lead's
/// suggestion fields are untouched on error, so the next cycle retries
/// cleanly.
pub async fn suggest_campaign(
    pool: &PgPool,
    clients: &Clients,
    lead_id: i64,
) -> Result<RouteOutcome, PipelineError> {
    let lead = get_lead(pool, lead_id).await?;

    // Already settled: re-running the router is a no-op.
    match lead.campaign_status.as_str() {
        "routed" => {
            return Ok(RouteOutcome::AutoRouted {
                campaign_id: lead.campaign_id.unwrap_or_default(),
            });
        }
        "skipped" => {
            return Ok(RouteOutcome::Skipped {
                reason: lead.skip_reason.clone().unwrap_or_default(),
            });
        }
        _ => {}
    }

    if lead.enrichment_status != "enriched" {
        return Err(PipelineError::LeadNotRoutable {
            id: lead_id,
            reason: format!("enrichment_status is '{}'", lead.enrichment_status),
        });
    }

    // No email: skipped before any decision call.
    let Some(email) = lead.email.clone() else {
        let reason = "Lead has no email address";
        mark_lead_skipped(pool, lead_id, reason).await?;
        return Ok(RouteOutcome::Skipped {
            reason: reason.to_string(),
        });
    };

    let query = get_query(pool, lead.query_id).await?;
    let company = get_company(pool, query.company_id).await?;
    let campaigns = list_routable_campaigns(pool, company.id).await?;

    let summaries: Vec<CampaignSummary> = campaigns.iter().map(campaign_summary).collect();
    let lead_summary = lead_summary(&lead, email);

    let decision = decide_campaign(
        &clients.ai,
        &lead_summary,
        &summaries,
        &company_context(&company),
        company.autopilot,
    )
    .await?;

    tracing::info!(lead_id, decision = ?decision, "routing decision");

    let (campaign_id, reason) = match decision {
        RoutingDecision::Skip { reason } => {
            mark_lead_skipped(pool, lead_id, &reason).await?;
            return Ok(RouteOutcome::Skipped { reason });
        }
        RoutingDecision::AddToExisting {
            campaign_id,
            reason,
        } => (campaign_id, reason),
        RoutingDecision::CreateNew {
            suggested_name,
            suggested_persona,
            reason,
        } => {
            // Created before the suggestion is persisted: a suggestion never
            // references a campaign that does not exist.
            let campaign = create_campaign_for_persona(
                pool,
                clients,
                &company,
                &suggested_name,
                &suggested_persona,
            )
            .await?;
            (campaign.id, reason)
        }
    };

    set_suggested_campaign(pool, lead_id, campaign_id, &reason).await?;

    // Autopilot safety check: every condition concrete, every condition
    // required. Any one failing leaves the lead suggested-but-unconfirmed.
    let campaign = get_campaign(pool, campaign_id).await?;
    if autopilot_eligible(
        company.autopilot,
        company.autopilot_min_fit_score,
        lead.fit_score,
        &campaign,
    ) {
        tracing::info!(
            lead_id,
            campaign_id,
            fit_score = lead.fit_score,
            "autopilot confirming suggestion"
        );
        confirm_routing(pool, clients, lead_id, Some(campaign_id)).await?;
        return Ok(RouteOutcome::AutoRouted { campaign_id });
    }

    Ok(RouteOutcome::Suggested { campaign_id })
}

/// Binds a lead to a campaign: outbound attach, `routed` transition, and
/// counter increment.
///
/// Idempotent: an already-`routed` lead returns `Ok(false)` before any
/// outbound call is made, and the guarded transition ensures a lost race
/// never double-increments the campaign counter. `campaign_id = None`
/// confirms the stored suggestion.
///
/// # Errors
///
/// Returns [`PipelineError::LeadNotRoutable`] when the lead has no email or
/// no target campaign, or the underlying outbound/store error.
pub async fn confirm_routing(
    pool: &PgPool,
    clients: &Clients,
    lead_id: i64,
    campaign_id: Option<i64>,
) -> Result<bool, PipelineError> {
    let lead = get_lead(pool, lead_id).await?;

    if lead.campaign_status == "routed" {
        tracing::info!(lead_id, "lead already routed; confirm is a no-op");
        return Ok(false);
    }

    let Some(target) = campaign_id.or(lead.suggested_campaign_id) else {
        return Err(PipelineError::LeadNotRoutable {
            id: lead_id,
            reason: "no campaign suggested".to_string(),
        });
    };
    let Some(email) = lead.email.clone() else {
        return Err(PipelineError::LeadNotRoutable {
            id: lead_id,
            reason: "no email address".to_string(),
        });
    };

    let campaign = get_campaign(pool, target).await?;

    let first_name = lead
        .full_name
        .as_deref()
        .and_then(|name| name.split_whitespace().next())
        .unwrap_or("")
        .to_string();

    clients
        .outbound
        .add_lead(
            &campaign.external_id,
            &ContactSpec {
                email,
                first_name,
                lead_url: lead.url.clone(),
            },
        )
        .await?;

    // Guarded transition; only the winner of a concurrent confirm race
    // increments the counter.
    if mark_lead_routed(pool, lead_id, target).await? {
        increment_campaign_leads(pool, target).await?;
        tracing::info!(lead_id, campaign_id = target, "lead routed to campaign");
        Ok(true)
    } else {
        tracing::warn!(
            lead_id,
            campaign_id = target,
            "routed transition matched no rows; concurrent confirm won"
        );
        Ok(false)
    }
}

/// Confirms routing for a batch of leads under the attachment concurrency
/// cap (slightly higher than enrichment's, still global per deployment).
pub async fn confirm_routing_batch(
    pool: &PgPool,
    clients: &Clients,
    config: &AppConfig,
    lead_ids: &[i64],
) -> ConfirmBatchOutcome {
    let concurrency = config.attach_concurrency.max(1);

    let results: Vec<(i64, Result<bool, PipelineError>)> = stream::iter(lead_ids)
        .map(|&lead_id| async move {
            (lead_id, confirm_routing(pool, clients, lead_id, None).await)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut outcome = ConfirmBatchOutcome::default();
    for (lead_id, result) in results {
        match result {
            Ok(true) => outcome.attached += 1,
            Ok(false) => outcome.already_routed += 1,
            Err(e) => {
                outcome.failed += 1;
                tracing::error!(lead_id, error = %e, "confirm routing failed");
            }
        }
    }
    outcome
}

/// The autopilot gate: autopilot on, fit score at or above the company
/// threshold, and the target campaign concretely active, accepting, and
/// under capacity.
fn autopilot_eligible(
    autopilot: bool,
    min_fit_score: i32,
    fit_score: Option<i32>,
    campaign: &CampaignRow,
) -> bool {
    autopilot
        && fit_score.is_some_and(|score| score >= min_fit_score)
        && campaign.status == "active"
        && campaign.is_accepting_leads
        && campaign.leads_count < campaign.max_leads
}

fn campaign_summary(campaign: &CampaignRow) -> CampaignSummary {
    CampaignSummary {
        id: campaign.id,
        name: campaign.name.clone(),
        persona: campaign.persona.clone(),
        leads_count: campaign.leads_count,
        max_leads: campaign.max_leads,
        emails_sent: campaign.emails_sent,
        open_rate: format!("{:.1}%", campaign.open_rate() * 100.0),
        reply_rate: format!("{:.1}%", campaign.reply_rate() * 100.0),
    }
}

fn lead_summary(lead: &LeadRow, email: String) -> LeadSummary {
    LeadSummary {
        email,
        full_name: lead.full_name.clone(),
        category: lead.category.clone(),
        platform: lead.platform.clone(),
        bio: lead.bio.clone(),
        expertise: lead.expertise.clone().unwrap_or_default(),
        total_audience: lead.total_audience,
        content_types: lead.content_types.clone().unwrap_or_default(),
        fit_score: lead.fit_score,
        fit_reason: lead.fit_reason.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn campaign(status: &str, accepting: bool, leads_count: i32, max_leads: i32) -> CampaignRow {
        CampaignRow {
            id: 7,
            public_id: Uuid::new_v4(),
            company_id: 1,
            external_id: "ext_7".to_string(),
            name: "Podcast Hosts".to_string(),
            status: status.to_string(),
            persona: Some("podcast host".to_string()),
            leads_count,
            emails_sent: 0,
            opens: 0,
            replies: 0,
            is_accepting_leads: accepting,
            max_leads,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn eligible_when_every_condition_holds() {
        // Fit 8, threshold 7, campaign active/accepting/under capacity.
        let c = campaign("active", true, 10, 500);
        assert!(autopilot_eligible(true, 7, Some(8), &c));
    }

    #[test]
    fn score_below_threshold_is_never_auto_attached() {
        let c = campaign("active", true, 10, 500);
        assert!(!autopilot_eligible(true, 7, Some(6), &c));
    }

    #[test]
    fn autopilot_off_blocks_attachment_regardless_of_score() {
        let c = campaign("active", true, 10, 500);
        assert!(!autopilot_eligible(false, 7, Some(10), &c));
    }

    #[test]
    fn missing_fit_score_blocks_attachment() {
        let c = campaign("active", true, 10, 500);
        assert!(!autopilot_eligible(true, 7, None, &c));
    }

    #[test]
    fn inactive_campaign_blocks_attachment() {
        let c = campaign("paused", true, 10, 500);
        assert!(!autopilot_eligible(true, 7, Some(9), &c));
    }

    #[test]
    fn non_accepting_campaign_blocks_attachment() {
        let c = campaign("active", false, 10, 500);
        assert!(!autopilot_eligible(true, 7, Some(9), &c));
    }

    #[test]
    fn at_capacity_campaign_blocks_attachment() {
        let c = campaign("active", true, 500, 500);
        assert!(!autopilot_eligible(true, 7, Some(9), &c));
    }

    #[test]
    fn threshold_is_inclusive() {
        let c = campaign("active", true, 10, 500);
        assert!(autopilot_eligible(true, 7, Some(7), &c));
    }

    #[test]
    fn rates_are_formatted_for_the_decision_prompt() {
        let mut c = campaign("active", true, 10, 500);
        c.emails_sent = 200;
        c.opens = 90;
        c.replies = 3;
        let summary = campaign_summary(&c);
        assert_eq!(summary.open_rate, "45.0%");
        assert_eq!(summary.reply_rate, "1.5%");
    }
}

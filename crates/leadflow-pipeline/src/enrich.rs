//! Stage 3: the enrichment worker.
//!
//! Derives a persona for each discovered lead, resolves a usable email with
//! strict precedence, and hands enriched leads to the router synchronously.
//! Batches run under a small bounded pool — global per deployment, not per
//! company — to respect upstream rate limits; excess work queues in the
//! stream rather than being rejected.

use futures::stream::{self, StreamExt};
use serde_json::json;
use sqlx::PgPool;

use leadflow_ai::{derive_persona, extract_contact_email};
use leadflow_core::AppConfig;
use leadflow_db::{
    apply_lead_enrichment, get_company, get_lead, get_query, mark_lead_enriching,
    mark_lead_enrichment_failed, mark_lead_skipped, DbError, PersonaFields,
};

use crate::route::{suggest_campaign, RouteOutcome};
use crate::{company_context, Clients, PipelineError};

const NO_EMAIL_SKIP_REASON: &str = "No email address found";

/// Aggregate outcome of one enrichment batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnrichBatchOutcome {
    pub enriched: u32,
    pub auto_routed: u32,
    pub suggested: u32,
    pub skipped: u32,
    pub failed: u32,
}

/// Enriches a batch of leads under the configured concurrency cap.
///
/// Individual lead failures are logged and counted; they never abort the
/// batch.
pub async fn enrich_leads(
    pool: &PgPool,
    clients: &Clients,
    config: &AppConfig,
    lead_ids: &[i64],
) -> EnrichBatchOutcome {
    let concurrency = config.enrich_concurrency.max(1);

    let results: Vec<(i64, Result<RouteOutcome, PipelineError>)> = stream::iter(lead_ids.iter().copied())
        .map(|lead_id| async move { (lead_id, enrich_lead(pool, clients, lead_id).await) })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut outcome = EnrichBatchOutcome::default();
    for (lead_id, result) in results {
        match result {
            Ok(RouteOutcome::AutoRouted { .. }) => {
                outcome.enriched += 1;
                outcome.auto_routed += 1;
            }
            Ok(RouteOutcome::Suggested { .. }) => {
                outcome.enriched += 1;
                outcome.suggested += 1;
            }
            Ok(RouteOutcome::Skipped { .. }) => outcome.skipped += 1,
            Err(e) => {
                outcome.failed += 1;
                tracing::error!(lead_id, error = %e, "lead enrichment failed");
            }
        }
    }

    tracing::info!(
        total = lead_ids.len(),
        auto_routed = outcome.auto_routed,
        suggested = outcome.suggested,
        skipped = outcome.skipped,
        failed = outcome.failed,
        "enrichment batch complete"
    );
    outcome
}

/// Enriches one lead end to end and invokes the router.
///
/// Steps: mark `enriching` → derive persona (schema-repaired) → resolve
/// email (discovery-time value, then persona's finding, then the cheap
/// extraction pass) → persist → auto-skip without an email, otherwise
/// route. Every step is an idempotent point update, so a retried job
/// re-derives and overwrites rather than corrupting state.
///
/// # Errors
///
/// Any model-call failure after retries marks the lead's
/// `enrichment_status = failed` — operator-correctable and re-enrichable,
/// deliberately distinct from the terminal no-email auto-skip — and
/// propagates the error.
pub async fn enrich_lead(
    pool: &PgPool,
    clients: &Clients,
    lead_id: i64,
) -> Result<RouteOutcome, PipelineError> {
    let lead = get_lead(pool, lead_id).await?;
    let query = get_query(pool, lead.query_id).await?;
    let company = get_company(pool, query.company_id).await?;

    mark_lead_enriching(pool, lead_id).await?;

    // Everything discovery knows about the lead, dumped raw for the model.
    let payload = json!({
        "url": lead.url,
        "name": lead.name,
        "email": lead.email,
        "platform": lead.platform,
        "follower_count": lead.follower_count,
        "enrichments": lead.raw_enrichment,
    });

    let context = company_context(&company);
    let persona = match derive_persona(&clients.ai, &payload, &context).await {
        Ok(persona) => persona,
        Err(e) => {
            mark_failed_best_effort(pool, lead_id).await;
            return Err(e.into());
        }
    };

    // Email precedence: discovery-time value, then the persona call's
    // finding, then a cheap extraction pass over the raw payload.
    let resolved_email = if let Some(email) = lead.email.clone() {
        Some(email)
    } else if let Some(email) = persona.email.clone() {
        Some(email)
    } else if let Some(raw) = &lead.raw_enrichment {
        match extract_contact_email(&clients.ai, raw).await {
            Ok(found) => found,
            Err(e) => {
                mark_failed_best_effort(pool, lead_id).await;
                return Err(e.into());
            }
        }
    } else {
        None
    };

    let fields = PersonaFields {
        category: persona.category,
        full_name: persona.full_name,
        title: persona.title,
        bio: persona.bio,
        expertise: persona.expertise,
        social_links: persona.social_links,
        total_audience: persona.total_audience,
        content_types: persona.content_types,
        fit_score: persona.fit_score,
        fit_reason: persona.fit_reason,
    };
    apply_lead_enrichment(pool, lead_id, &fields, resolved_email.as_deref()).await?;

    tracing::info!(
        lead_id,
        full_name = %fields.full_name,
        category = %fields.category,
        fit_score = fields.fit_score,
        email_found = resolved_email.is_some(),
        "lead enriched"
    );

    // No email by any method: terminal auto-skip, router never invoked.
    // A re-enrichment of an already-skipped lead lands here too; the
    // guarded transition rejecting it is not an error.
    if resolved_email.is_none() {
        match mark_lead_skipped(pool, lead_id, NO_EMAIL_SKIP_REASON).await {
            Ok(()) | Err(DbError::InvalidTransition { .. }) => {}
            Err(e) => return Err(e.into()),
        }
        return Ok(RouteOutcome::Skipped {
            reason: NO_EMAIL_SKIP_REASON.to_string(),
        });
    }

    suggest_campaign(pool, clients, lead_id).await
}

async fn mark_failed_best_effort(pool: &PgPool, lead_id: i64) {
    if let Err(e) = mark_lead_enrichment_failed(pool, lead_id).await {
        tracing::error!(lead_id, error = %e, "failed to mark lead enrichment failed");
    }
}

//! Stage 4b: the campaign creator.
//!
//! Materializes a fully registered, immediately activated campaign for a
//! persona: generate copy, register with the outbound platform, persist
//! the local record and its sequence, then activate. The whole chain
//! completes before the caller persists any suggestion referencing the
//! campaign, so a half-created campaign is never visible.

use sqlx::PgPool;

use leadflow_ai::generate_sequence;
use leadflow_db::{
    create_campaign as create_campaign_record, insert_campaign_emails, CampaignRow, CompanyRow,
    NewCampaign, NewCampaignEmail,
};
use leadflow_outbound::{CreateCampaignSpec, SequenceStepSpec};

use crate::{company_context, Clients, PipelineError};

const DEFAULT_MAX_LEADS: i32 = 500;
const DEFAULT_DAILY_LIMIT: i32 = 50;

/// Creates and activates a campaign for a suggested persona.
///
/// Activation before any leads are attached is safe by construction: an
/// empty campaign sends no mail.
///
/// # Errors
///
/// Returns [`PipelineError::NoSendingIdentities`] when the company has no
/// sending accounts configured, or the underlying generation, platform, or
/// store error. Nothing is persisted locally until the platform
/// registration has succeeded.
pub async fn create_campaign_for_persona(
    pool: &PgPool,
    clients: &Clients,
    company: &CompanyRow,
    suggested_name: &str,
    suggested_persona: &str,
) -> Result<CampaignRow, PipelineError> {
    if company.sending_emails.is_empty() {
        return Err(PipelineError::NoSendingIdentities(company.id));
    }

    // 1. Copy, tailored to the persona; length per company setting.
    let steps = generate_sequence(
        &clients.ai,
        &company_context(company),
        suggested_persona,
        company.default_sequence_length,
        company.email_prompt.as_deref(),
    )
    .await?;

    // 2. Register with the outbound platform; capture its id.
    let step_specs: Vec<SequenceStepSpec> = steps
        .iter()
        .map(|step| SequenceStepSpec {
            subject: step.subject.clone(),
            body: step.body.clone(),
            delay_days: step.delay_days,
        })
        .collect();

    let external_id = clients
        .outbound
        .create_campaign(&CreateCampaignSpec {
            name: suggested_name.to_string(),
            email_list: company.sending_emails.clone(),
            steps: step_specs,
            daily_limit: DEFAULT_DAILY_LIMIT,
        })
        .await?;

    // 3. Persist the local record and its write-once sequence rows.
    let campaign = create_campaign_record(
        pool,
        &NewCampaign {
            company_id: company.id,
            external_id: external_id.clone(),
            name: suggested_name.to_string(),
            status: "active".to_string(),
            persona: Some(suggested_persona.to_string()),
            is_accepting_leads: true,
            max_leads: DEFAULT_MAX_LEADS,
        },
    )
    .await?;

    let emails: Vec<NewCampaignEmail> = steps
        .iter()
        .map(|step| NewCampaignEmail {
            step: step.step,
            subject: step.subject.clone(),
            body: step.body.clone(),
            delay_days: step.delay_days,
        })
        .collect();
    insert_campaign_emails(pool, campaign.id, &emails).await?;

    // 4. Activate.
    clients.outbound.activate(&external_id).await?;

    tracing::info!(
        company_id = company.id,
        campaign_id = campaign.id,
        external_id = %external_id,
        persona = suggested_persona,
        steps = steps.len(),
        "campaign created and activated"
    );

    Ok(campaign)
}

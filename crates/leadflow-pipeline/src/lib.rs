//! The lead pipeline: query generation, discovery, enrichment, routing,
//! campaign creation, and analytics/digest sync.
//!
//! Each stage is an async job function over the shared `PgPool` and a
//! [`Clients`] bundle, triggerable independently by the scheduler, the
//! server's on-demand endpoints, or the CLI. Stages chain by handing ids
//! forward, never whole objects; the relational store is the single source
//! of truth for entity state, so a retried stage re-reads and re-derives
//! rather than trusting in-memory carry-over.

mod analytics;
mod campaigns;
mod digest;
mod discovery;
mod enrich;
mod query_gen;
mod route;

pub use analytics::sync_campaign_analytics;
pub use campaigns::create_campaign_for_persona;
pub use digest::{send_daily_digest, DigestSummary};
pub use discovery::{run_daily_discovery, run_query, DiscoveryOutcome};
pub use enrich::{enrich_lead, enrich_leads, EnrichBatchOutcome};
pub use query_gen::{generate_queries_for_company, run_query_generation, GenerationOutcome};
pub use route::{
    confirm_routing, confirm_routing_batch, suggest_campaign, ConfirmBatchOutcome, RouteOutcome,
};

use leadflow_ai::{AiError, ChatClient, CompanyContext};
use leadflow_core::AppConfig;
use leadflow_db::{CompanyRow, DbError};
use leadflow_discovery::{DiscoveryError, WebsetClient};
use leadflow_outbound::{NotifyClient, OutboundClient, OutboundError};
use thiserror::Error;

/// Errors surfaced by pipeline stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("discovery polling timed out after {attempts} attempts for webset {webset_id}")]
    DiscoveryTimeout { webset_id: String, attempts: u32 },

    #[error("company {0} has no sending identities configured")]
    NoSendingIdentities(i64),

    #[error("lead {id} is not routable: {reason}")]
    LeadNotRoutable { id: i64, reason: String },

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Outbound(#[from] OutboundError),
}

/// Collaborator clients, constructed once at process start and passed down.
///
/// Components take this bundle by reference, so tests can substitute
/// wiremock-backed clients via each client's `with_base_url`.
pub struct Clients {
    pub discovery: WebsetClient,
    pub ai: ChatClient,
    pub outbound: OutboundClient,
    /// Absent when no notification credential is configured; the digest
    /// stage fails loudly if recipients are configured without it.
    pub notify: Option<NotifyClient>,
}

impl Clients {
    /// Builds all collaborator clients from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingCredential`] for any absent required
    /// API key — the process fails fast instead of degrading into silent
    /// no-ops mid-pipeline.
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let discovery_key = config
            .discovery_api_key
            .as_deref()
            .ok_or(PipelineError::MissingCredential("LEADFLOW_DISCOVERY_API_KEY"))?;
        let ai_key = config
            .ai_api_key
            .as_deref()
            .ok_or(PipelineError::MissingCredential("LEADFLOW_AI_API_KEY"))?;
        let outbound_key = config
            .outbound_api_key
            .as_deref()
            .ok_or(PipelineError::MissingCredential("LEADFLOW_OUTBOUND_API_KEY"))?;

        let timeout = config.http_request_timeout_secs;

        let discovery =
            WebsetClient::with_base_url(discovery_key, timeout, &config.discovery_base_url)
                .map_err(PipelineError::Discovery)?
                .with_retry(config.max_retries, config.retry_backoff_base_ms);
        let ai = ChatClient::with_base_url(ai_key, timeout, &config.ai_base_url)
            .map_err(PipelineError::Ai)?
            .with_retry(config.ai_max_retries, config.retry_backoff_base_ms);
        let outbound =
            OutboundClient::with_base_url(outbound_key, timeout, &config.outbound_base_url)
                .map_err(PipelineError::Outbound)?;

        let notify = match config.notify_api_key.as_deref() {
            Some(key) => Some(
                NotifyClient::with_base_url(key, timeout, &config.notify_base_url)
                    .map_err(PipelineError::Outbound)?,
            ),
            None => None,
        };

        Ok(Self {
            discovery,
            ai,
            outbound,
            notify,
        })
    }
}

/// Projects a company row into the context every prompt receives.
pub(crate) fn company_context(company: &CompanyRow) -> CompanyContext {
    CompanyContext {
        name: company.name.clone(),
        website: company.website.clone(),
        description: company.description.clone(),
        target_audience: company.target_audience.clone(),
    }
}

//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring pipeline jobs: query generation before the daily discovery
//! run, hourly analytics sync, and the evening digest.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use leadflow_core::AppConfig;
use leadflow_pipeline::Clients;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    clients: Arc<Clients>,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_query_generation_job(&scheduler, pool.clone(), Arc::clone(&clients)).await?;
    register_discovery_job(
        &scheduler,
        pool.clone(),
        Arc::clone(&clients),
        Arc::clone(&config),
    )
    .await?;
    register_analytics_job(&scheduler, pool.clone(), Arc::clone(&clients)).await?;
    register_digest_job(&scheduler, pool, clients, config).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the daily query-generation job.
///
/// Runs at 08:30 UTC (`0 30 8 * * *`), before the 09:00 discovery run, so
/// freshly generated queries are picked up the same day. Override with
/// `LEADFLOW_QUERY_GEN_CRON`.
async fn register_query_generation_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    clients: Arc<Clients>,
) -> Result<(), JobSchedulerError> {
    let cron =
        std::env::var("LEADFLOW_QUERY_GEN_CRON").unwrap_or_else(|_| "0 30 8 * * *".to_string());
    let pool = Arc::new(pool);

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let clients = Arc::clone(&clients);

        Box::pin(async move {
            tracing::info!("scheduler: starting daily query generation");
            match leadflow_pipeline::run_query_generation(&pool, &clients).await {
                Ok(outcome) => tracing::info!(
                    generated = outcome.queries_generated,
                    failures = outcome.failures,
                    "scheduler: query generation complete"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: query generation failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered query generation job");
    Ok(())
}

/// Register the daily discovery job.
///
/// Runs at 09:00 UTC (`0 0 9 * * *`): one pending query per company is
/// executed, and every newly created lead flows straight into enrichment.
/// Override with `LEADFLOW_DISCOVERY_CRON`.
async fn register_discovery_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    clients: Arc<Clients>,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let cron =
        std::env::var("LEADFLOW_DISCOVERY_CRON").unwrap_or_else(|_| "0 0 9 * * *".to_string());
    let pool = Arc::new(pool);

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let clients = Arc::clone(&clients);
        let config = Arc::clone(&config);

        Box::pin(async move {
            tracing::info!("scheduler: starting daily discovery run");
            let outcomes =
                match leadflow_pipeline::run_daily_discovery(&pool, &clients, &config).await {
                    Ok(outcomes) => outcomes,
                    Err(e) => {
                        tracing::error!(error = %e, "scheduler: discovery run failed");
                        return;
                    }
                };

            // Enrichment only ever sees complete, deduplicated batches.
            for outcome in &outcomes {
                leadflow_pipeline::enrich_leads(
                    &pool,
                    &clients,
                    &config,
                    &outcome.created_lead_ids,
                )
                .await;
            }

            tracing::info!(runs = outcomes.len(), "scheduler: daily discovery complete");
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered discovery job");
    Ok(())
}

/// Register the hourly analytics sync (`0 0 * * * *`).
async fn register_analytics_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    clients: Arc<Clients>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 0 * * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let clients = Arc::clone(&clients);

        Box::pin(async move {
            match leadflow_pipeline::sync_campaign_analytics(&pool, &clients).await {
                Ok(updated) => {
                    tracing::info!(updated, "scheduler: analytics sync complete");
                }
                Err(e) => tracing::error!(error = %e, "scheduler: analytics sync failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!("scheduler: registered analytics job (hourly)");
    Ok(())
}

/// Register the daily digest job (18:00 UTC, `0 0 18 * * *`).
async fn register_digest_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    clients: Arc<Clients>,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 0 18 * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let clients = Arc::clone(&clients);
        let config = Arc::clone(&config);

        Box::pin(async move {
            match leadflow_pipeline::send_daily_digest(&pool, &clients, &config).await {
                Ok(summary) => tracing::info!(
                    leads_found = summary.leads_found,
                    emails_sent = summary.emails_sent,
                    "scheduler: daily digest complete"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: daily digest failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!("scheduler: registered digest job (daily 18:00 UTC)");
    Ok(())
}

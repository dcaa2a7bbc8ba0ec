//! Operator CLI for on-demand pipeline runs.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "leadflow-cli")]
#[command(about = "leadflow pipeline command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate search queries (all companies, or one with --company-id).
    GenerateQueries {
        #[arg(long)]
        company_id: Option<i64>,
    },
    /// Run one query against the discovery provider and enrich the results.
    RunQuery {
        query_id: i64,
        /// Skip the enrichment hand-off after discovery.
        #[arg(long)]
        no_enrich: bool,
    },
    /// Enrich one or more leads (bounded concurrency).
    Enrich {
        #[arg(required = true)]
        lead_ids: Vec<i64>,
    },
    /// Confirm the suggested routing for one or more leads.
    Confirm {
        #[arg(required = true)]
        lead_ids: Vec<i64>,
    },
    /// Pull delivery analytics for all active campaigns.
    SyncAnalytics,
    /// Compose and send the daily digest.
    Digest,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = leadflow_core::load_app_config_from_env()?;
    let pool_config = leadflow_db::PoolConfig::from_app_config(&config);
    let pool = leadflow_db::connect_pool(&config.database_url, pool_config).await?;
    let clients = leadflow_pipeline::Clients::from_config(&config)?;

    match cli.command {
        Commands::GenerateQueries { company_id } => {
            let outcome = match company_id {
                Some(company_id) => {
                    let company = leadflow_db::get_company(&pool, company_id).await?;
                    leadflow_pipeline::generate_queries_for_company(&pool, &clients, &company)
                        .await?
                }
                None => leadflow_pipeline::run_query_generation(&pool, &clients).await?,
            };
            println!(
                "generated {} queries ({} failures)",
                outcome.queries_generated, outcome.failures
            );
        }
        Commands::RunQuery {
            query_id,
            no_enrich,
        } => {
            let outcome =
                leadflow_pipeline::run_query(&pool, &clients, &config, query_id).await?;
            println!(
                "run {}: {} items found, {} new leads",
                outcome.run_id,
                outcome.items_found,
                outcome.created_lead_ids.len()
            );
            if !no_enrich && !outcome.created_lead_ids.is_empty() {
                let batch = leadflow_pipeline::enrich_leads(
                    &pool,
                    &clients,
                    &config,
                    &outcome.created_lead_ids,
                )
                .await;
                println!(
                    "enrichment: {} auto-routed, {} suggested, {} skipped, {} failed",
                    batch.auto_routed, batch.suggested, batch.skipped, batch.failed
                );
            }
        }
        Commands::Enrich { lead_ids } => {
            let batch = leadflow_pipeline::enrich_leads(&pool, &clients, &config, &lead_ids).await;
            println!(
                "{} auto-routed, {} suggested, {} skipped, {} failed",
                batch.auto_routed, batch.suggested, batch.skipped, batch.failed
            );
        }
        Commands::Confirm { lead_ids } => {
            let batch =
                leadflow_pipeline::confirm_routing_batch(&pool, &clients, &config, &lead_ids)
                    .await;
            println!(
                "{} attached, {} already routed, {} failed",
                batch.attached, batch.already_routed, batch.failed
            );
        }
        Commands::SyncAnalytics => {
            let updated = leadflow_pipeline::sync_campaign_analytics(&pool, &clients).await?;
            println!("updated {updated} campaigns");
        }
        Commands::Digest => {
            let summary = leadflow_pipeline::send_daily_digest(&pool, &clients, &config).await?;
            println!(
                "digest: {} leads ({} with email), {} sent, {} opens, {} replies",
                summary.leads_found,
                summary.leads_with_email,
                summary.emails_sent,
                summary.opens,
                summary.replies
            );
        }
    }

    Ok(())
}

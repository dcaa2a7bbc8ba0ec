//! Stage 5a: analytics sync.
//!
//! Pulls delivery counters per active campaign from the outbound platform
//! and overwrites the local values — the platform is the source of truth
//! for sent/open/reply numbers. One campaign's failure never aborts the
//! batch.

use sqlx::PgPool;

use leadflow_db::{list_active_campaigns, update_campaign_stats};

use crate::{Clients, PipelineError};

/// Syncs analytics for all active campaigns; returns how many were updated.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] only if the campaign list itself cannot
/// be loaded. Per-campaign sync failures are logged and skipped.
pub async fn sync_campaign_analytics(
    pool: &PgPool,
    clients: &Clients,
) -> Result<u32, PipelineError> {
    let campaigns = list_active_campaigns(pool).await?;
    let mut updated = 0u32;

    for campaign in &campaigns {
        let analytics = match clients.outbound.get_analytics(&campaign.external_id).await {
            Ok(analytics) => analytics,
            Err(e) => {
                tracing::error!(
                    campaign_id = campaign.id,
                    external_id = %campaign.external_id,
                    error = %e,
                    "analytics fetch failed; skipping campaign"
                );
                continue;
            }
        };

        match update_campaign_stats(
            pool,
            campaign.id,
            analytics.sent,
            analytics.opened,
            analytics.replied,
        )
        .await
        {
            Ok(()) => updated += 1,
            Err(e) => {
                tracing::error!(campaign_id = campaign.id, error = %e, "stats update failed");
            }
        }
    }

    tracing::info!(
        campaigns = campaigns.len(),
        updated,
        "campaign analytics sync complete"
    );
    Ok(updated)
}

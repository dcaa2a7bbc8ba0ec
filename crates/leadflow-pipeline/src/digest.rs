//! Stage 5b: the daily digest.
//!
//! Aggregates today's new-lead counts and cross-campaign delivery totals
//! into one summary email, records it in the digests audit table, and
//! delivers it via the notification channel.

use chrono::{Duration, Utc};
use sqlx::PgPool;

use leadflow_core::AppConfig;
use leadflow_db::{campaign_totals, count_leads_created_between, insert_digest};

use crate::{Clients, PipelineError};

/// The numbers one digest reports.
#[derive(Debug, Clone, Copy)]
pub struct DigestSummary {
    pub leads_found: i64,
    pub leads_with_email: i64,
    pub emails_sent: i64,
    pub opens: i64,
    pub replies: i64,
}

/// Composes and sends the daily digest.
///
/// With no recipients configured the send is skipped quietly (steady state
/// for deployments that watch the dashboard instead). Recipients configured
/// without a notification credential is a configuration fault and fails
/// loudly.
///
/// # Errors
///
/// Returns [`PipelineError::MissingCredential`] for the misconfiguration
/// above, or the underlying store/notification error.
pub async fn send_daily_digest(
    pool: &PgPool,
    clients: &Clients,
    config: &AppConfig,
) -> Result<DigestSummary, PipelineError> {
    let now = Utc::now();
    let today = now.date_naive();
    let start = today
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or(now);
    let end = start + Duration::days(1);

    let (leads_found, leads_with_email) = count_leads_created_between(pool, start, end).await?;
    let (emails_sent, opens, replies) = campaign_totals(pool).await?;

    let summary = DigestSummary {
        leads_found,
        leads_with_email,
        emails_sent,
        opens,
        replies,
    };

    if config.digest_recipients.is_empty() {
        tracing::info!("no digest recipients configured; skipping send");
        return Ok(summary);
    }

    let Some(notify) = &clients.notify else {
        return Err(PipelineError::MissingCredential("LEADFLOW_NOTIFY_API_KEY"));
    };

    let subject = format!("leadflow Daily Digest - {today}");
    let html = compose_digest_html(&today.to_string(), &summary);

    notify
        .send(&config.digest_from, &config.digest_recipients, &subject, &html)
        .await?;

    insert_digest(
        pool,
        None,
        today,
        i32::try_from(leads_found).unwrap_or(i32::MAX),
        i32::try_from(emails_sent).unwrap_or(i32::MAX),
        i32::try_from(opens).unwrap_or(i32::MAX),
        i32::try_from(replies).unwrap_or(i32::MAX),
    )
    .await?;

    tracing::info!(
        leads_found,
        emails_sent,
        opens,
        replies,
        recipients = config.digest_recipients.len(),
        "daily digest sent"
    );

    Ok(summary)
}

/// Renders the digest body.
fn compose_digest_html(date: &str, summary: &DigestSummary) -> String {
    format!(
        "<h1>leadflow Daily Digest</h1>\
         <p>Here's your daily summary for {date}:</p>\
         <h2>Leads</h2>\
         <ul>\
         <li><strong>{}</strong> new leads discovered</li>\
         <li><strong>{}</strong> with verified emails</li>\
         </ul>\
         <h2>Campaigns</h2>\
         <ul>\
         <li><strong>{}</strong> emails sent</li>\
         <li><strong>{}</strong> opens</li>\
         <li><strong>{}</strong> replies</li>\
         </ul>",
        summary.leads_found,
        summary.leads_with_email,
        summary.emails_sent,
        summary.opens,
        summary.replies,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_html_includes_every_counter() {
        let summary = DigestSummary {
            leads_found: 22,
            leads_with_email: 15,
            emails_sent: 300,
            opens: 120,
            replies: 9,
        };
        let html = compose_digest_html("2026-08-06", &summary);

        assert!(html.contains("2026-08-06"));
        assert!(html.contains("<strong>22</strong> new leads"));
        assert!(html.contains("<strong>15</strong> with verified emails"));
        assert!(html.contains("<strong>300</strong> emails sent"));
        assert!(html.contains("<strong>120</strong> opens"));
        assert!(html.contains("<strong>9</strong> replies"));
    }
}

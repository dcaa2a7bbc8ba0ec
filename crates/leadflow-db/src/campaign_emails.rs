//! Database operations for `campaign_emails` (generated sequence steps).
//!
//! Rows are write-once at campaign creation; there is no update path.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `campaign_emails` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CampaignEmailRow {
    pub id: i64,
    pub campaign_id: i64,
    pub step: i32,
    pub subject: String,
    pub body: String,
    pub delay_days: i32,
    pub created_at: DateTime<Utc>,
}

/// One sequence step to persist.
#[derive(Debug, Clone)]
pub struct NewCampaignEmail {
    pub step: i32,
    pub subject: String,
    pub body: String,
    pub delay_days: i32,
}

/// Inserts the full generated sequence for a campaign.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails.
pub async fn insert_campaign_emails(
    pool: &PgPool,
    campaign_id: i64,
    emails: &[NewCampaignEmail],
) -> Result<(), DbError> {
    for email in emails {
        sqlx::query(
            "INSERT INTO campaign_emails (campaign_id, step, subject, body, delay_days) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(campaign_id)
        .bind(email.step)
        .bind(&email.subject)
        .bind(&email.body)
        .bind(email.delay_days)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Returns a campaign's sequence steps in order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_campaign_emails(
    pool: &PgPool,
    campaign_id: i64,
) -> Result<Vec<CampaignEmailRow>, DbError> {
    let rows = sqlx::query_as::<_, CampaignEmailRow>(
        "SELECT id, campaign_id, step, subject, body, delay_days, created_at \
         FROM campaign_emails \
         WHERE campaign_id = $1 \
         ORDER BY step ASC",
    )
    .bind(campaign_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

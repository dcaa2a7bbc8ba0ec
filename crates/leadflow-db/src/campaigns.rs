//! Database operations for `campaigns`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `campaigns` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CampaignRow {
    pub id: i64,
    pub public_id: Uuid,
    pub company_id: i64,
    pub external_id: String,
    pub name: String,
    pub status: String,
    pub persona: Option<String>,
    pub leads_count: i32,
    pub emails_sent: i32,
    pub opens: i32,
    pub replies: i32,
    pub is_accepting_leads: bool,
    pub max_leads: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CampaignRow {
    /// Opens divided by sends; zero when nothing has been sent yet.
    #[must_use]
    pub fn open_rate(&self) -> f64 {
        if self.emails_sent <= 0 {
            return 0.0;
        }
        f64::from(self.opens) / f64::from(self.emails_sent)
    }

    /// Replies divided by sends; zero when nothing has been sent yet.
    #[must_use]
    pub fn reply_rate(&self) -> f64 {
        if self.emails_sent <= 0 {
            return 0.0;
        }
        f64::from(self.replies) / f64::from(self.emails_sent)
    }
}

/// Fields for inserting a newly registered campaign.
#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub company_id: i64,
    pub external_id: String,
    pub name: String,
    pub status: String,
    pub persona: Option<String>,
    pub is_accepting_leads: bool,
    pub max_leads: i32,
}

const CAMPAIGN_COLUMNS: &str = "id, public_id, company_id, external_id, name, status, persona, \
     leads_count, emails_sent, opens, replies, is_accepting_leads, max_leads, \
     created_at, updated_at";

/// Inserts a campaign record and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_campaign(pool: &PgPool, campaign: &NewCampaign) -> Result<CampaignRow, DbError> {
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "INSERT INTO campaigns (public_id, company_id, external_id, name, status, persona, \
             is_accepting_leads, max_leads) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {CAMPAIGN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(campaign.company_id)
    .bind(&campaign.external_id)
    .bind(&campaign.name)
    .bind(&campaign.status)
    .bind(&campaign.persona)
    .bind(campaign.is_accepting_leads)
    .bind(campaign.max_leads)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetches a single campaign by internal id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] on
/// query failure.
pub async fn get_campaign(pool: &PgPool, id: i64) -> Result<CampaignRow, DbError> {
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns a company's campaigns, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_campaigns(pool: &PgPool, company_id: i64) -> Result<Vec<CampaignRow>, DbError> {
    let rows = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns \
         WHERE company_id = $1 \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a company's campaigns eligible to receive routed leads:
/// `active` and accepting.
///
/// Capacity (`leads_count < max_leads`) is checked by the caller at
/// attach time, not here, so the router can still surface an at-capacity
/// campaign as context.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_routable_campaigns(
    pool: &PgPool,
    company_id: i64,
) -> Result<Vec<CampaignRow>, DbError> {
    let rows = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns \
         WHERE company_id = $1 AND status = 'active' AND is_accepting_leads = TRUE \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns all `active` campaigns across companies, for the analytics sync.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_campaigns(pool: &PgPool) -> Result<Vec<CampaignRow>, DbError> {
    let rows = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns \
         WHERE status = 'active' \
         ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Increments a campaign's routed-lead counter by one.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the campaign does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn increment_campaign_leads(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE campaigns SET leads_count = leads_count + 1, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Overwrites sent/opens/replies from the outbound platform, which is the
/// source of truth for delivery counters.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the campaign does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_campaign_stats(
    pool: &PgPool,
    id: i64,
    emails_sent: i32,
    opens: i32,
    replies: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE campaigns SET emails_sent = $1, opens = $2, replies = $3, updated_at = NOW() \
         WHERE id = $4",
    )
    .bind(emails_sent)
    .bind(opens)
    .bind(replies)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Sums delivery counters across all campaigns: `(sent, opens, replies)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn campaign_totals(pool: &PgPool) -> Result<(i64, i64, i64), DbError> {
    let row = sqlx::query_as::<_, (i64, i64, i64)>(
        "SELECT COALESCE(SUM(emails_sent), 0), COALESCE(SUM(opens), 0), \
                COALESCE(SUM(replies), 0) \
         FROM campaigns",
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Sets a campaign's status (`draft | active | paused | completed`).
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the campaign does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn set_campaign_status(pool: &PgPool, id: i64, status: &str) -> Result<(), DbError> {
    let result =
        sqlx::query("UPDATE campaigns SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

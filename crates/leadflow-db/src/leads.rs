//! Database operations for `leads`.
//!
//! Leads carry two independent status axes: `enrichment_status`
//! (`pending -> enriching -> enriched | failed`) and `campaign_status`
//! (`pending -> routed | skipped`). All transitions are guarded point
//! updates so retried jobs observe "no row matched" instead of clobbering
//! a concurrent writer.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `leads` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeadRow {
    pub id: i64,
    pub public_id: Uuid,
    pub query_id: i64,
    pub discovery_run_id: Option<i64>,
    pub url: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub platform: Option<String>,
    pub follower_count: Option<i64>,
    pub raw_enrichment: Option<serde_json::Value>,
    pub category: Option<String>,
    pub full_name: Option<String>,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub expertise: Option<Vec<String>>,
    pub social_links: Option<serde_json::Value>,
    pub total_audience: Option<i64>,
    pub content_types: Option<Vec<String>>,
    pub fit_score: Option<i32>,
    pub fit_reason: Option<String>,
    pub enrichment_status: String,
    pub enriched_at: Option<DateTime<Utc>>,
    pub campaign_status: String,
    pub suggested_campaign_id: Option<i64>,
    pub suggested_campaign_reason: Option<String>,
    pub campaign_id: Option<i64>,
    pub routed_at: Option<DateTime<Utc>>,
    pub skip_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a freshly discovered lead.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub query_id: i64,
    pub discovery_run_id: Option<i64>,
    pub url: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub platform: Option<String>,
    pub follower_count: Option<i64>,
    pub raw_enrichment: Option<serde_json::Value>,
}

/// Persona fields derived by enrichment, persisted in one update.
#[derive(Debug, Clone)]
pub struct PersonaFields {
    pub category: String,
    pub full_name: String,
    pub title: String,
    pub bio: String,
    pub expertise: Vec<String>,
    pub social_links: serde_json::Value,
    pub total_audience: i64,
    pub content_types: Vec<String>,
    pub fit_score: i32,
    pub fit_reason: String,
}

const LEAD_COLUMNS: &str = "id, public_id, query_id, discovery_run_id, url, email, name, \
     platform, follower_count, raw_enrichment, category, full_name, title, bio, expertise, \
     social_links, total_audience, content_types, fit_score, fit_reason, enrichment_status, \
     enriched_at, campaign_status, suggested_campaign_id, suggested_campaign_reason, \
     campaign_id, routed_at, skip_reason, created_at";

/// Inserts a discovered lead, suppressing duplicates.
///
/// The unique indexes on `url` and `email` are the dedup backstop for
/// concurrent discovery runs; `ON CONFLICT DO NOTHING` turns a lost race
/// into `None` rather than an error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails for any reason other than
/// a uniqueness conflict.
pub async fn insert_lead(pool: &PgPool, lead: &NewLead) -> Result<Option<LeadRow>, DbError> {
    let row = sqlx::query_as::<_, LeadRow>(&format!(
        "INSERT INTO leads (public_id, query_id, discovery_run_id, url, email, name, \
             platform, follower_count, raw_enrichment) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT DO NOTHING \
         RETURNING {LEAD_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(lead.query_id)
    .bind(lead.discovery_run_id)
    .bind(&lead.url)
    .bind(&lead.email)
    .bind(&lead.name)
    .bind(&lead.platform)
    .bind(lead.follower_count)
    .bind(&lead.raw_enrichment)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns which of the given URLs already belong to persisted leads.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn known_lead_urls(pool: &PgPool, urls: &[String]) -> Result<Vec<String>, DbError> {
    let rows = sqlx::query_scalar::<_, String>("SELECT url FROM leads WHERE url = ANY($1)")
        .bind(urls)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Returns which of the given emails already belong to persisted leads.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn known_lead_emails(pool: &PgPool, emails: &[String]) -> Result<Vec<String>, DbError> {
    let rows = sqlx::query_scalar::<_, String>(
        "SELECT email FROM leads WHERE email IS NOT NULL AND email = ANY($1)",
    )
    .bind(emails)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches a single lead by internal id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] on
/// query failure.
pub async fn get_lead(pool: &PgPool, id: i64) -> Result<LeadRow, DbError> {
    let row = sqlx::query_as::<_, LeadRow>(&format!(
        "SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns a company's leads, newest first, optionally filtered by either
/// status axis.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_leads(
    pool: &PgPool,
    company_id: i64,
    enrichment_status: Option<&str>,
    campaign_status: Option<&str>,
    limit: i64,
) -> Result<Vec<LeadRow>, DbError> {
    let rows = sqlx::query_as::<_, LeadRow>(
        "SELECT l.id, l.public_id, l.query_id, l.discovery_run_id, l.url, l.email, l.name, \
                l.platform, l.follower_count, l.raw_enrichment, l.category, l.full_name, \
                l.title, l.bio, l.expertise, l.social_links, l.total_audience, \
                l.content_types, l.fit_score, l.fit_reason, l.enrichment_status, \
                l.enriched_at, l.campaign_status, l.suggested_campaign_id, \
                l.suggested_campaign_reason, l.campaign_id, l.routed_at, l.skip_reason, \
                l.created_at \
         FROM leads l \
         JOIN queries q ON q.id = l.query_id \
         WHERE q.company_id = $1 \
           AND ($2::text IS NULL OR l.enrichment_status = $2) \
           AND ($3::text IS NULL OR l.campaign_status = $3) \
         ORDER BY l.created_at DESC, l.id DESC \
         LIMIT $4",
    )
    .bind(company_id)
    .bind(enrichment_status)
    .bind(campaign_status)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Marks a lead as `enriching`.
///
/// Deliberately unguarded on the prior status: operators may re-enrich a
/// `failed` or even `enriched` lead, and a retried job re-entering this
/// step is harmless.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the lead does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_lead_enriching(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE leads SET enrichment_status = 'enriching' WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Persists derived persona fields and marks the lead `enriched`.
///
/// `resolved_email` is only written when the lead has no email yet
/// (`COALESCE` keeps the discovery-time value authoritative).
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the lead does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn apply_lead_enrichment(
    pool: &PgPool,
    id: i64,
    persona: &PersonaFields,
    resolved_email: Option<&str>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE leads SET \
             category = $1, full_name = $2, title = $3, bio = $4, expertise = $5, \
             social_links = $6, total_audience = $7, content_types = $8, \
             fit_score = $9, fit_reason = $10, \
             email = COALESCE(email, $11), \
             enrichment_status = 'enriched', enriched_at = NOW() \
         WHERE id = $12",
    )
    .bind(&persona.category)
    .bind(&persona.full_name)
    .bind(&persona.title)
    .bind(&persona.bio)
    .bind(&persona.expertise)
    .bind(&persona.social_links)
    .bind(persona.total_audience)
    .bind(&persona.content_types)
    .bind(persona.fit_score)
    .bind(&persona.fit_reason)
    .bind(resolved_email)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Marks a lead's enrichment as `failed`.
///
/// Distinct from an auto-skip: a failed lead remains operator-correctable
/// and can be re-enriched.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the lead does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_lead_enrichment_failed(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE leads SET enrichment_status = 'failed' WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Skips a lead with a recorded reason.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the lead is not `pending` on
/// the campaign axis, or [`DbError::Sqlx`] if the update fails.
pub async fn mark_lead_skipped(pool: &PgPool, id: i64, reason: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE leads SET campaign_status = 'skipped', skip_reason = $1 \
         WHERE id = $2 AND campaign_status = 'pending'",
    )
    .bind(reason)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "lead",
            id,
            expected: "campaign_status = 'pending'",
        });
    }

    Ok(())
}

/// Returns a skipped lead to `pending` so it can be routed again.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the lead is not `skipped`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn unskip_lead(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE leads SET campaign_status = 'pending', skip_reason = NULL \
         WHERE id = $1 AND campaign_status = 'skipped'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "lead",
            id,
            expected: "campaign_status = 'skipped'",
        });
    }

    Ok(())
}

/// Records the router's non-binding campaign suggestion.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the lead does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn set_suggested_campaign(
    pool: &PgPool,
    id: i64,
    campaign_id: i64,
    reason: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE leads SET suggested_campaign_id = $1, suggested_campaign_reason = $2 \
         WHERE id = $3",
    )
    .bind(campaign_id)
    .bind(reason)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Binds a lead to a campaign: the `pending -> routed` transition.
///
/// Guarded on all routing preconditions — campaign axis still `pending`,
/// enrichment completed, email present — so calling it twice (or on an
/// ineligible lead) affects zero rows. Returns `true` when this call
/// performed the transition, `false` when the guard did not match; the
/// caller must only increment campaign counters on `true`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_lead_routed(pool: &PgPool, id: i64, campaign_id: i64) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE leads SET campaign_status = 'routed', campaign_id = $1, routed_at = NOW() \
         WHERE id = $2 AND campaign_status = 'pending' \
           AND enrichment_status = 'enriched' AND email IS NOT NULL",
    )
    .bind(campaign_id)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Counts leads created in the given window: `(total, with_email)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_leads_created_between(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(i64, i64), DbError> {
    let row = sqlx::query_as::<_, (i64, i64)>(
        "SELECT COUNT(*), COUNT(email) FROM leads \
         WHERE created_at >= $1 AND created_at < $2",
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

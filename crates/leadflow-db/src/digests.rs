//! Database operations for `digests` (sent daily-summary audit trail).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `digests` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DigestRow {
    pub id: i64,
    pub company_id: Option<i64>,
    pub digest_date: NaiveDate,
    pub leads_found: i32,
    pub emails_sent: i32,
    pub opens: i32,
    pub replies: i32,
    pub sent_at: DateTime<Utc>,
}

/// Records a sent digest. `company_id` is `None` for the deployment-wide
/// summary.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_digest(
    pool: &PgPool,
    company_id: Option<i64>,
    digest_date: NaiveDate,
    leads_found: i32,
    emails_sent: i32,
    opens: i32,
    replies: i32,
) -> Result<DigestRow, DbError> {
    let row = sqlx::query_as::<_, DigestRow>(
        "INSERT INTO digests (company_id, digest_date, leads_found, emails_sent, opens, replies) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id, company_id, digest_date, leads_found, emails_sent, opens, replies, sent_at",
    )
    .bind(company_id)
    .bind(digest_date)
    .bind(leads_found)
    .bind(emails_sent)
    .bind(opens)
    .bind(replies)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

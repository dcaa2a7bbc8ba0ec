//! Database operations for `companies`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `companies` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompanyRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub website: String,
    pub description: String,
    pub target_audience: String,
    pub agent_notes: Option<String>,
    pub sending_emails: Vec<String>,
    pub default_sequence_length: i32,
    pub email_prompt: Option<String>,
    pub autopilot: bool,
    pub autopilot_min_fit_score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a new company.
#[derive(Debug, Clone)]
pub struct NewCompany {
    pub name: String,
    pub website: String,
    pub description: String,
    pub target_audience: String,
    pub agent_notes: Option<String>,
    pub sending_emails: Vec<String>,
    pub default_sequence_length: i32,
    pub email_prompt: Option<String>,
    pub autopilot: bool,
    pub autopilot_min_fit_score: i32,
}

const COMPANY_COLUMNS: &str = "id, public_id, name, website, description, target_audience, \
     agent_notes, sending_emails, default_sequence_length, email_prompt, \
     autopilot, autopilot_min_fit_score, created_at, updated_at";

/// Inserts a new company and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_company(pool: &PgPool, company: &NewCompany) -> Result<CompanyRow, DbError> {
    let row = sqlx::query_as::<_, CompanyRow>(&format!(
        "INSERT INTO companies (public_id, name, website, description, target_audience, \
             agent_notes, sending_emails, default_sequence_length, email_prompt, \
             autopilot, autopilot_min_fit_score) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING {COMPANY_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&company.name)
    .bind(&company.website)
    .bind(&company.description)
    .bind(&company.target_audience)
    .bind(&company.agent_notes)
    .bind(&company.sending_emails)
    .bind(company.default_sequence_length)
    .bind(&company.email_prompt)
    .bind(company.autopilot)
    .bind(company.autopilot_min_fit_score)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetches a single company by internal id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] on
/// query failure.
pub async fn get_company(pool: &PgPool, id: i64) -> Result<CompanyRow, DbError> {
    let row = sqlx::query_as::<_, CompanyRow>(&format!(
        "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns all companies, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_companies(pool: &PgPool) -> Result<Vec<CompanyRow>, DbError> {
    let rows = sqlx::query_as::<_, CompanyRow>(&format!(
        "SELECT {COMPANY_COLUMNS} FROM companies ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

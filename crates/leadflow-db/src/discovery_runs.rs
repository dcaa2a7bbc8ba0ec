//! Database operations for `discovery_runs` (webset run audit trail).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `discovery_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DiscoveryRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub query_id: i64,
    pub webset_id: String,
    pub status: String,
    pub items_found: i32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

const RUN_COLUMNS: &str = "id, public_id, query_id, webset_id, status, items_found, \
     started_at, completed_at, error_message, created_at";

/// Creates a new discovery run in `running` status for a query.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_discovery_run(pool: &PgPool, query_id: i64) -> Result<DiscoveryRunRow, DbError> {
    let row = sqlx::query_as::<_, DiscoveryRunRow>(&format!(
        "INSERT INTO discovery_runs (public_id, query_id) \
         VALUES ($1, $2) \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(query_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Records the external webset job id once submission succeeds.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn set_discovery_run_webset(
    pool: &PgPool,
    id: i64,
    webset_id: &str,
) -> Result<(), DbError> {
    sqlx::query("UPDATE discovery_runs SET webset_id = $1 WHERE id = $2")
        .bind(webset_id)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Updates the live items-found counter during polling.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_discovery_run_progress(
    pool: &PgPool,
    id: i64,
    items_found: i32,
) -> Result<(), DbError> {
    sqlx::query("UPDATE discovery_runs SET items_found = $1 WHERE id = $2")
        .bind(items_found)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Marks a run as `completed` with the final item count.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_discovery_run(
    pool: &PgPool,
    id: i64,
    items_found: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE discovery_runs \
         SET status = 'completed', items_found = $1, completed_at = NOW() \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(items_found)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "discovery_run",
            id,
            expected: "status = 'running'",
        });
    }

    Ok(())
}

/// Marks a run as `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_discovery_run(
    pool: &PgPool,
    id: i64,
    error_message: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE discovery_runs \
         SET status = 'failed', error_message = $1, completed_at = NOW() \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "discovery_run",
            id,
            expected: "status = 'running'",
        });
    }

    Ok(())
}

/// Fetches a single run by internal id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] on
/// query failure.
pub async fn get_discovery_run(pool: &PgPool, id: i64) -> Result<DiscoveryRunRow, DbError> {
    let row = sqlx::query_as::<_, DiscoveryRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM discovery_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_discovery_runs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<DiscoveryRunRow>, DbError> {
    let rows = sqlx::query_as::<_, DiscoveryRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM discovery_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

//! Database operations for `queries` (generated search directives).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `queries` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueryRow {
    pub id: i64,
    pub public_id: Uuid,
    pub company_id: i64,
    pub query: String,
    pub criteria: Vec<String>,
    pub instruction_id: Option<i64>,
    pub rationale: String,
    pub status: String,
    pub last_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a new query.
#[derive(Debug, Clone)]
pub struct NewQuery {
    pub company_id: i64,
    pub query: String,
    pub criteria: Vec<String>,
    /// `None` marks an exploration query with no originating instruction.
    pub instruction_id: Option<i64>,
    pub rationale: String,
}

/// A past query annotated with how many leads it yielded, used as negative
/// context for exploration-mode generation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueryYieldRow {
    pub query: String,
    pub criteria: Vec<String>,
    pub leads_found: i64,
}

const QUERY_COLUMNS: &str = "id, public_id, company_id, query, criteria, instruction_id, \
     rationale, status, last_run_at, created_at";

/// Inserts a new query in `pending` status and returns the full row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_query(pool: &PgPool, query: &NewQuery) -> Result<QueryRow, DbError> {
    let row = sqlx::query_as::<_, QueryRow>(&format!(
        "INSERT INTO queries (public_id, company_id, query, criteria, instruction_id, rationale) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {QUERY_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(query.company_id)
    .bind(&query.query)
    .bind(&query.criteria)
    .bind(query.instruction_id)
    .bind(&query.rationale)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Inserts a focused query and consumes its originating instruction in one
/// transaction.
///
/// The instruction flip is guarded, so two racing generator runs cannot both
/// persist a query for the same instruction: the loser's transaction rolls
/// back entirely.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the instruction was already
/// consumed, [`DbError::NotFound`] if `query.instruction_id` is missing, or
/// [`DbError::Sqlx`] on failure.
pub async fn create_query_consuming_instruction(
    pool: &PgPool,
    query: &NewQuery,
) -> Result<QueryRow, DbError> {
    let instruction_id = query.instruction_id.ok_or(DbError::NotFound)?;

    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, QueryRow>(&format!(
        "INSERT INTO queries (public_id, company_id, query, criteria, instruction_id, rationale) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {QUERY_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(query.company_id)
    .bind(&query.query)
    .bind(&query.criteria)
    .bind(query.instruction_id)
    .bind(&query.rationale)
    .fetch_one(&mut *tx)
    .await?;

    let result = sqlx::query(
        "UPDATE instructions SET query_generated = TRUE \
         WHERE id = $1 AND query_generated = FALSE",
    )
    .bind(instruction_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(DbError::InvalidTransition {
            entity: "instruction",
            id: instruction_id,
            expected: "query_generated = false",
        });
    }

    tx.commit().await?;
    Ok(row)
}

/// Fetches a single query by internal id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] on
/// query failure.
pub async fn get_query(pool: &PgPool, id: i64) -> Result<QueryRow, DbError> {
    let row = sqlx::query_as::<_, QueryRow>(&format!(
        "SELECT {QUERY_COLUMNS} FROM queries WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recently created `pending` query for a company, if any.
///
/// This is the query the daily discovery cycle runs: exactly one per company
/// per cycle.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_pending_query(
    pool: &PgPool,
    company_id: i64,
) -> Result<Option<QueryRow>, DbError> {
    let row = sqlx::query_as::<_, QueryRow>(&format!(
        "SELECT {QUERY_COLUMNS} FROM queries \
         WHERE company_id = $1 AND status = 'pending' \
         ORDER BY created_at DESC, id DESC \
         LIMIT 1"
    ))
    .bind(company_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns a company's most recent queries annotated with lead yields,
/// newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn recent_queries_with_yields(
    pool: &PgPool,
    company_id: i64,
    limit: i64,
) -> Result<Vec<QueryYieldRow>, DbError> {
    let rows = sqlx::query_as::<_, QueryYieldRow>(
        "SELECT q.query, q.criteria, COUNT(l.id) AS leads_found \
         FROM queries q \
         LEFT JOIN leads l ON l.query_id = q.id \
         WHERE q.company_id = $1 \
         GROUP BY q.id \
         ORDER BY q.created_at DESC, q.id DESC \
         LIMIT $2",
    )
    .bind(company_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a company's queries, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_queries(
    pool: &PgPool,
    company_id: i64,
    limit: i64,
) -> Result<Vec<QueryRow>, DbError> {
    let rows = sqlx::query_as::<_, QueryRow>(&format!(
        "SELECT {QUERY_COLUMNS} FROM queries \
         WHERE company_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2"
    ))
    .bind(company_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Marks a query as `running`.
///
/// A query may be (re-)run from any settled state — `pending`, `completed`,
/// or `failed` — to support on-demand reruns; only a concurrently `running`
/// query is rejected.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the query is already running
/// (or does not exist), or [`DbError::Sqlx`] if the update fails.
pub async fn start_query(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE queries SET status = 'running' WHERE id = $1 AND status <> 'running'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "query",
            id,
            expected: "status <> 'running'",
        });
    }

    Ok(())
}

/// Marks a query as `completed` and stamps `last_run_at`.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the query is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_query(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE queries SET status = 'completed', last_run_at = NOW() \
         WHERE id = $1 AND status = 'running'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "query",
            id,
            expected: "status = 'running'",
        });
    }

    Ok(())
}

/// Marks a query as `failed`.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the query is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_query(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE queries SET status = 'failed', last_run_at = NOW() \
         WHERE id = $1 AND status = 'running'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "query",
            id,
            expected: "status = 'running'",
        });
    }

    Ok(())
}

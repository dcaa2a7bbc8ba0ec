//! Database operations for `instructions` (targeting directives).

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `instructions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InstructionRow {
    pub id: i64,
    pub company_id: i64,
    pub content: String,
    pub query_generated: bool,
    pub created_at: DateTime<Utc>,
}

/// Inserts a new targeting instruction for a company.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_instruction(
    pool: &PgPool,
    company_id: i64,
    content: &str,
) -> Result<InstructionRow, DbError> {
    let row = sqlx::query_as::<_, InstructionRow>(
        "INSERT INTO instructions (company_id, content) \
         VALUES ($1, $2) \
         RETURNING id, company_id, content, query_generated, created_at",
    )
    .bind(company_id)
    .bind(content)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns a company's unprocessed instructions, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unprocessed_instructions(
    pool: &PgPool,
    company_id: i64,
) -> Result<Vec<InstructionRow>, DbError> {
    let rows = sqlx::query_as::<_, InstructionRow>(
        "SELECT id, company_id, content, query_generated, created_at \
         FROM instructions \
         WHERE company_id = $1 AND query_generated = FALSE \
         ORDER BY created_at ASC, id ASC",
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Marks an instruction as consumed by query generation.
///
/// The flip is irreversible and guarded so a retried generator run cannot
/// consume the same instruction twice.
///
/// # Errors
///
/// Returns [`DbError::InvalidTransition`] if the instruction was already
/// processed (or does not exist), or [`DbError::Sqlx`] if the update fails.
pub async fn mark_instruction_processed(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE instructions SET query_generated = TRUE \
         WHERE id = $1 AND query_generated = FALSE",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidTransition {
            entity: "instruction",
            id,
            expected: "query_generated = false",
        });
    }

    Ok(())
}

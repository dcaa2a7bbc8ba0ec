//! Stage 1: query generation.
//!
//! FOCUSED mode: every unprocessed instruction, oldest first, yields one
//! query; each instruction is an independent step, so one failure leaves
//! the rest of the batch intact and that instruction unconsumed for the
//! next cycle. EXPLORATION mode (no pending instructions): one creative
//! query generated against the last 20 queries as negative context.

use sqlx::PgPool;

use leadflow_ai::{generate_exploration_query, generate_focused_query, PastQuery};
use leadflow_db::{
    create_query, create_query_consuming_instruction, list_companies,
    list_unprocessed_instructions, recent_queries_with_yields, CompanyRow, NewQuery,
};

use crate::{company_context, Clients, PipelineError};

const PAST_QUERY_CONTEXT: i64 = 20;

/// Per-company outcome of one generation cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenerationOutcome {
    pub queries_generated: u32,
    pub failures: u32,
}

/// Runs query generation for every company.
///
/// One company's failure never aborts its siblings: errors are logged,
/// counted, and left for the next cycle to retry.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] only if the company list itself cannot be
/// loaded.
pub async fn run_query_generation(
    pool: &PgPool,
    clients: &Clients,
) -> Result<GenerationOutcome, PipelineError> {
    let companies = list_companies(pool).await?;
    tracing::info!(count = companies.len(), "query generation: processing companies");

    let mut totals = GenerationOutcome::default();
    for company in &companies {
        match generate_queries_for_company(pool, clients, company).await {
            Ok(outcome) => {
                totals.queries_generated += outcome.queries_generated;
                totals.failures += outcome.failures;
            }
            Err(e) => {
                totals.failures += 1;
                tracing::error!(
                    company_id = company.id,
                    error = %e,
                    "query generation failed for company"
                );
            }
        }
    }

    Ok(totals)
}

/// Runs query generation for a single company (the on-demand trigger).
///
/// # Errors
///
/// Returns [`PipelineError`] if exploration-mode generation fails or the
/// store is unreachable. Focused-mode failures are per-instruction: they
/// are counted in the outcome, not propagated.
pub async fn generate_queries_for_company(
    pool: &PgPool,
    clients: &Clients,
    company: &CompanyRow,
) -> Result<GenerationOutcome, PipelineError> {
    let instructions = list_unprocessed_instructions(pool, company.id).await?;
    let context = company_context(company);
    let mut outcome = GenerationOutcome::default();

    if instructions.is_empty() {
        // EXPLORATION: no new instructions, find a materially different angle.
        let past = recent_queries_with_yields(pool, company.id, PAST_QUERY_CONTEXT).await?;
        let past: Vec<PastQuery> = past
            .into_iter()
            .map(|q| PastQuery {
                query: q.query,
                criteria: q.criteria,
                leads_found: q.leads_found,
            })
            .collect();

        let generated =
            generate_exploration_query(&clients.ai, &context, company.agent_notes.as_deref(), &past)
                .await?;

        let query = create_query(
            pool,
            &NewQuery {
                company_id: company.id,
                query: generated.query,
                criteria: generated.criteria,
                instruction_id: None,
                rationale: generated.rationale,
            },
        )
        .await?;

        tracing::info!(
            company_id = company.id,
            query_id = query.id,
            query = %query.query,
            "generated exploration query"
        );
        outcome.queries_generated += 1;
        return Ok(outcome);
    }

    // FOCUSED: one query per unprocessed instruction, oldest first. Each
    // instruction is its own step; a failure leaves it unconsumed so the
    // next cycle retries it, and the loop moves on.
    tracing::info!(
        company_id = company.id,
        count = instructions.len(),
        "found unprocessed instructions"
    );

    for instruction in &instructions {
        let generated =
            match generate_focused_query(&clients.ai, &context, &instruction.content).await {
                Ok(generated) => generated,
                Err(e) => {
                    outcome.failures += 1;
                    tracing::error!(
                        company_id = company.id,
                        instruction_id = instruction.id,
                        error = %e,
                        "focused query generation failed; instruction left for next cycle"
                    );
                    continue;
                }
            };

        match create_query_consuming_instruction(
            pool,
            &NewQuery {
                company_id: company.id,
                query: generated.query,
                criteria: generated.criteria,
                instruction_id: Some(instruction.id),
                rationale: generated.rationale,
            },
        )
        .await
        {
            Ok(query) => {
                tracing::info!(
                    company_id = company.id,
                    instruction_id = instruction.id,
                    query_id = query.id,
                    query = %query.query,
                    "generated focused query"
                );
                outcome.queries_generated += 1;
            }
            Err(e) => {
                outcome.failures += 1;
                tracing::error!(
                    company_id = company.id,
                    instruction_id = instruction.id,
                    error = %e,
                    "failed to persist focused query"
                );
            }
        }
    }

    Ok(outcome)
}

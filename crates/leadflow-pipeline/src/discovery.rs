//! Stage 2: the discovery runner.
//!
//! Submits a query to the webset provider, polls to completion with live
//! progress updates, deduplicates results against every known lead, and
//! materializes new Lead rows. Lead insertion and enrichment hand-off
//! happen only after the full result set is fetched and deduplicated —
//! partial batches are never handed forward.

use std::collections::HashSet;

use sqlx::PgPool;

use leadflow_core::AppConfig;
use leadflow_db::{
    complete_discovery_run, complete_query, create_discovery_run, fail_discovery_run, fail_query,
    get_query, insert_lead, known_lead_emails, known_lead_urls, latest_pending_query,
    list_companies, set_discovery_run_webset, start_query, update_discovery_run_progress, NewLead,
};
use leadflow_discovery::{
    detect_platform, extract_email, extract_follower_count, poll_until_idle, PollConfig,
    PollOutcome, WebsetItem, WebsetSpec,
};

use crate::{Clients, PipelineError};

/// Result of one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    pub run_id: i64,
    pub items_found: usize,
    /// Ids of the leads actually inserted (deduplicated survivors); the
    /// caller enqueues exactly one enrichment per entry.
    pub created_lead_ids: Vec<i64>,
}

/// One raw item reduced to insertable fields.
#[derive(Debug, Clone)]
struct CandidateLead {
    url: String,
    name: Option<String>,
    email: Option<String>,
    platform: Option<String>,
    follower_count: Option<i64>,
    raw_enrichment: Option<serde_json::Value>,
}

/// Runs the daily discovery cycle: for each company, the most recently
/// created `pending` query (if any) is executed.
///
/// Per-company failures are logged and skipped; companies interleave
/// arbitrarily and never block each other.
///
/// # Errors
///
/// Returns [`PipelineError::Db`] only if the company list itself cannot be
/// loaded.
pub async fn run_daily_discovery(
    pool: &PgPool,
    clients: &Clients,
    config: &AppConfig,
) -> Result<Vec<DiscoveryOutcome>, PipelineError> {
    let companies = list_companies(pool).await?;
    let mut outcomes = Vec::new();

    for company in &companies {
        let query = match latest_pending_query(pool, company.id).await {
            Ok(Some(query)) => query,
            Ok(None) => {
                tracing::info!(company_id = company.id, "no pending queries; skipping");
                continue;
            }
            Err(e) => {
                tracing::error!(company_id = company.id, error = %e, "failed to load pending query");
                continue;
            }
        };

        match run_query(pool, clients, config, query.id).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                tracing::error!(
                    company_id = company.id,
                    query_id = query.id,
                    error = %e,
                    "discovery run failed"
                );
            }
        }
    }

    Ok(outcomes)
}

/// Executes one query against the discovery provider.
///
/// Lifecycle: query `running` → webset submitted → bounded poll with live
/// `items_found` updates → items listed → dedup → insert → query and run
/// `completed`. Exceeding the poll ceiling is a hard failure: run and query
/// are both marked `failed` and no leads are inserted.
///
/// # Errors
///
/// Returns [`PipelineError::DiscoveryTimeout`] on poll exhaustion, or the
/// underlying error for submission/listing failures. In every error path
/// the run and query rows are already marked `failed`.
pub async fn run_query(
    pool: &PgPool,
    clients: &Clients,
    config: &AppConfig,
    query_id: i64,
) -> Result<DiscoveryOutcome, PipelineError> {
    let query = get_query(pool, query_id).await?;
    start_query(pool, query_id).await?;
    let run = create_discovery_run(pool, query_id).await?;

    tracing::info!(query_id, run_id = run.id, query = %query.query, "starting discovery run");

    let spec = WebsetSpec {
        query: query.query.clone(),
        count: config.discovery_result_count,
        criteria: query.criteria.clone(),
        include_email: true,
    };

    let webset_id = match clients.discovery.submit(&spec).await {
        Ok(id) => id,
        Err(e) => {
            fail_best_effort(pool, run.id, query_id, &format!("webset submission failed: {e}"))
                .await;
            return Err(e.into());
        }
    };
    set_discovery_run_webset(pool, run.id, &webset_id).await?;

    let poll_config = PollConfig {
        interval_ms: config.poll_interval_ms,
        max_attempts: config.poll_max_attempts,
    };

    let poll_result = poll_until_idle(&clients.discovery, &webset_id, poll_config, |_, found| {
        let pool = pool.clone();
        let run_id = run.id;
        async move {
            let found = i32::try_from(found).unwrap_or(i32::MAX);
            if let Err(e) = update_discovery_run_progress(&pool, run_id, found).await {
                tracing::warn!(run_id, error = %e, "failed to persist poll progress");
            }
        }
    })
    .await;

    let found = match poll_result {
        Ok(PollOutcome::Idle { found }) => found,
        Ok(PollOutcome::TimedOut { attempts, .. }) => {
            let message = format!("webset {webset_id} still running after {attempts} attempts");
            fail_best_effort(pool, run.id, query_id, &message).await;
            return Err(PipelineError::DiscoveryTimeout {
                webset_id,
                attempts,
            });
        }
        Err(e) => {
            fail_best_effort(pool, run.id, query_id, &format!("webset poll failed: {e}")).await;
            return Err(e.into());
        }
    };

    let items = match clients.discovery.list_items(&webset_id).await {
        Ok(items) => items,
        Err(e) => {
            fail_best_effort(pool, run.id, query_id, &format!("listing items failed: {e}")).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        query_id,
        run_id = run.id,
        found,
        items = items.len(),
        "webset complete; deduplicating"
    );

    // Full result set is in hand; reduce, dedup against known leads, insert.
    let candidates: Vec<CandidateLead> = items.iter().map(to_candidate).collect();

    let urls: Vec<String> = candidates.iter().map(|c| c.url.clone()).collect();
    let emails: Vec<String> = candidates.iter().filter_map(|c| c.email.clone()).collect();
    let known_urls: HashSet<String> = known_lead_urls(pool, &urls).await?.into_iter().collect();
    let known_emails: HashSet<String> =
        known_lead_emails(pool, &emails).await?.into_iter().collect();

    let fresh = partition_new_candidates(candidates, &known_urls, &known_emails);

    let mut created_lead_ids = Vec::new();
    for candidate in &fresh {
        let new_lead = NewLead {
            query_id,
            discovery_run_id: Some(run.id),
            url: candidate.url.clone(),
            email: candidate.email.clone(),
            name: candidate.name.clone(),
            platform: candidate.platform.clone(),
            follower_count: candidate.follower_count,
            raw_enrichment: candidate.raw_enrichment.clone(),
        };

        // The unique indexes re-check immediately before insert; a row a
        // concurrent runner inserted since the pre-filter comes back None.
        match insert_lead(pool, &new_lead).await? {
            Some(row) => created_lead_ids.push(row.id),
            None => {
                tracing::debug!(url = %candidate.url, "lead suppressed at insert; concurrent duplicate");
            }
        }
    }

    let items_found = i32::try_from(items.len()).unwrap_or(i32::MAX);
    complete_discovery_run(pool, run.id, items_found).await?;
    complete_query(pool, query_id).await?;

    tracing::info!(
        query_id,
        run_id = run.id,
        items = items.len(),
        created = created_lead_ids.len(),
        "discovery run complete"
    );

    Ok(DiscoveryOutcome {
        run_id: run.id,
        items_found: items.len(),
        created_lead_ids,
    })
}

/// Reduces one raw webset item to insertable lead fields.
fn to_candidate(item: &WebsetItem) -> CandidateLead {
    let email = item.enrichments.as_ref().and_then(|e| extract_email(e));
    let follower_count = item
        .enrichments
        .as_ref()
        .and_then(|e| extract_follower_count(e));

    CandidateLead {
        url: item.properties.url.clone(),
        name: item.properties.title.clone(),
        email,
        platform: detect_platform(&item.properties.url).map(ToOwned::to_owned),
        follower_count,
        raw_enrichment: item.enrichments.clone(),
    }
}

/// Drops candidates whose url or email is already known, and deduplicates
/// within the batch itself (a webset can surface the same profile twice).
fn partition_new_candidates(
    candidates: Vec<CandidateLead>,
    known_urls: &HashSet<String>,
    known_emails: &HashSet<String>,
) -> Vec<CandidateLead> {
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut seen_emails: HashSet<String> = HashSet::new();
    let mut fresh = Vec::new();

    for candidate in candidates {
        if known_urls.contains(&candidate.url) || seen_urls.contains(&candidate.url) {
            continue;
        }
        if let Some(email) = &candidate.email {
            if known_emails.contains(email) || seen_emails.contains(email) {
                continue;
            }
            seen_emails.insert(email.clone());
        }
        seen_urls.insert(candidate.url.clone());
        fresh.push(candidate);
    }

    fresh
}

/// Marks the run and query failed, logging rather than propagating secondary
/// errors so the original failure stays the reported one.
async fn fail_best_effort(pool: &PgPool, run_id: i64, query_id: i64, message: &str) {
    if let Err(e) = fail_discovery_run(pool, run_id, message).await {
        tracing::error!(run_id, error = %e, "failed to mark discovery run failed");
    }
    if let Err(e) = fail_query(pool, query_id).await {
        tracing::error!(query_id, error = %e, "failed to mark query failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(url: &str, email: Option<&str>) -> CandidateLead {
        CandidateLead {
            url: url.to_string(),
            name: None,
            email: email.map(ToOwned::to_owned),
            platform: None,
            follower_count: None,
            raw_enrichment: None,
        }
    }

    #[test]
    fn known_emails_are_dropped() {
        // 25 raw items, 3 sharing an email with existing leads -> 22 survive.
        let candidates: Vec<CandidateLead> = (0..25)
            .map(|i| {
                candidate(
                    &format!("https://example.com/{i}"),
                    Some(&format!("user{i}@example.com")),
                )
            })
            .collect();
        let known_emails: HashSet<String> = ["user3", "user7", "user19"]
            .iter()
            .map(|u| format!("{u}@example.com"))
            .collect();

        let fresh = partition_new_candidates(candidates, &HashSet::new(), &known_emails);
        assert_eq!(fresh.len(), 22);
    }

    #[test]
    fn known_urls_are_dropped() {
        let candidates = vec![
            candidate("https://example.com/a", None),
            candidate("https://example.com/b", None),
        ];
        let known_urls: HashSet<String> =
            std::iter::once("https://example.com/a".to_string()).collect();

        let fresh = partition_new_candidates(candidates, &known_urls, &HashSet::new());
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].url, "https://example.com/b");
    }

    #[test]
    fn duplicates_within_a_batch_are_collapsed() {
        let candidates = vec![
            candidate("https://example.com/a", Some("a@example.com")),
            candidate("https://example.com/a", None),
            candidate("https://example.com/b", Some("a@example.com")),
            candidate("https://example.com/c", None),
        ];

        let fresh = partition_new_candidates(candidates, &HashSet::new(), &HashSet::new());
        let urls: Vec<&str> = fresh.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/a", "https://example.com/c"]);
    }

    #[test]
    fn email_less_candidates_only_dedup_by_url() {
        let candidates = vec![
            candidate("https://example.com/a", None),
            candidate("https://example.com/b", None),
        ];

        let fresh = partition_new_candidates(candidates, &HashSet::new(), &HashSet::new());
        assert_eq!(fresh.len(), 2);
    }
}

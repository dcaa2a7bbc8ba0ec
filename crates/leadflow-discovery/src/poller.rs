//! Bounded polling state machine for in-flight websets.
//!
//! The loop tracks an attempt counter against a hard ceiling; exhausting it
//! is a terminal outcome, not a retry. The sleep interval is injected via
//! [`PollConfig`] so tests drive the machine with zero delay.

use std::future::Future;
use std::time::Duration;

use crate::client::WebsetClient;
use crate::error::DiscoveryError;

/// Interval and ceiling for one polling session.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        // 60 attempts x 5 s = 5 minutes before giving up.
        Self {
            interval_ms: 5_000,
            max_attempts: 60,
        }
    }
}

/// Terminal state of a polling session.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// The webset finished; `found` is the final item count.
    Idle { found: i64 },
    /// The attempt ceiling was exhausted while the webset was still running.
    TimedOut { attempts: u32, last_found: i64 },
}

/// Polls a webset until it reports `idle` or the attempt ceiling is reached.
///
/// `on_progress` is invoked after every poll with `(attempt, items_found)`
/// so the caller can persist live progress.
///
/// # Errors
///
/// Returns [`DiscoveryError`] if a status fetch fails terminally (the
/// client's own transient retry is already exhausted at that point).
pub async fn poll_until_idle<F, Fut>(
    client: &WebsetClient,
    webset_id: &str,
    config: PollConfig,
    mut on_progress: F,
) -> Result<PollOutcome, DiscoveryError>
where
    F: FnMut(u32, i64) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut attempts = 0u32;
    let mut last_found = 0i64;

    while attempts < config.max_attempts {
        if config.interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.interval_ms)).await;
        }
        attempts += 1;

        let webset = client.get(webset_id).await?;
        last_found = webset.items_found();

        tracing::debug!(
            webset_id,
            attempts,
            status = %webset.status,
            items_found = last_found,
            "webset poll"
        );

        on_progress(attempts, last_found).await;

        if webset.status == "idle" {
            return Ok(PollOutcome::Idle { found: last_found });
        }
    }

    Ok(PollOutcome::TimedOut {
        attempts,
        last_found,
    })
}

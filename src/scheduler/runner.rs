use super::queue::{QueuedItem, WorkQueue};
use crate::config::{Config, ReliabilityConfig};
use crate::health;
use crate::reconcile::{self, Deps};
use anyhow::Result;
use chrono::Utc;
use std::future::Future;
use tokio::time::{self, Duration};

const MIN_POLL_SECONDS: u64 = 1;

/// Poll the work queue and dispatch due items until shutdown.
///
/// Per-item failures are absorbed here: a bad invocation is logged and
/// its row removed, never allowed to stop future polls. Recurrence is
/// the executed unit's own re-enqueue, not the runner's.
pub async fn run(config: Config) -> Result<()> {
    let queue = WorkQueue::open(config.db_path());
    let deps = Deps::from_config(&config)?;
    let poll_secs = config.reliability.runner_poll_secs.max(MIN_POLL_SECONDS);
    let mut interval = time::interval(Duration::from_secs(poll_secs));
    let snapshot_path = config.workspace_dir.join("health.json");

    health::mark_ok("runner");
    tracing::info!(poll_secs, "reconciliation runner started");

    loop {
        interval.tick().await;

        let due = match queue.due_items(Utc::now()) {
            Ok(due) => due,
            Err(e) => {
                health::mark_error("runner", e.to_string());
                tracing::warn!("work queue query failed: {e:#}");
                continue;
            }
        };

        for queued in due {
            dispatch(&config, &deps, &queued).await;
            if let Err(e) = queue.remove(&queued.id) {
                health::mark_error("runner", e.to_string());
                tracing::warn!("failed to remove dispatched work item: {e:#}");
            }
        }

        health::mark_ok("runner");
        if let Err(e) = health::write_snapshot(&snapshot_path) {
            tracing::warn!("failed to write health snapshot: {e:#}");
        }
    }
}

async fn dispatch(config: &Config, deps: &Deps, queued: &QueuedItem) {
    match execute_with_retry(config, deps, queued).await {
        Ok(()) => {
            tracing::debug!(
                unit = queued.item.kind(),
                tenant = queued.item.tenant_id(),
                "work item completed"
            );
        }
        Err(e) => {
            // State is not corrupted by a lost invocation: the next
            // scheduled poll reconciles against current truth.
            health::mark_error("runner", e.to_string());
            tracing::warn!(
                unit = queued.item.kind(),
                tenant = queued.item.tenant_id(),
                "work item failed after retries: {e:#}"
            );
        }
    }
}

async fn execute_with_retry(config: &Config, deps: &Deps, queued: &QueuedItem) -> Result<()> {
    retry_with_backoff(&config.reliability, queued.item.kind(), || {
        reconcile::execute(deps, &queued.item)
    })
    .await
}

/// Job-execution-layer retry for transient provider/network errors,
/// with doubling backoff and a little jitter. Shared by queued work
/// items and the inline setup path in the CLI.
pub async fn retry_with_backoff<T, F, Fut>(
    reliability: &ReliabilityConfig,
    label: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let retries = reliability.job_retries;
    let mut backoff_ms = reliability.job_backoff_ms.max(100);
    let mut last_err = None;

    for attempt in 0..=retries {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::debug!(label, attempt, "attempt failed: {e:#}");
                last_err = Some(e);
            }
        }

        if attempt < retries {
            let jitter_ms = u64::from(Utc::now().timestamp_subsec_millis() % 250);
            time::sleep(Duration::from_millis(backoff_ms + jitter_ms)).await;
            backoff_ms = (backoff_ms.saturating_mul(2)).min(30_000);
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{label} failed")))
}

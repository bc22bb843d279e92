use super::{load_eligible, Deps};
use crate::domain::MonitoringStatus;
use crate::scheduler::WorkItem;
use anyhow::Result;
use std::time::Duration;

/// Progressive retry schedule, indexed by retry count. Early retries
/// assume transient propagation lag; later ones assume a stuck
/// provider-side state that the rebuild flow will have to clear.
const RETRY_DELAY_MINUTES: [u64; 6] = [5, 10, 20, 30, 30, 30];

pub(crate) fn retry_delay(retry_count: u32) -> Duration {
    let idx = (retry_count as usize).min(RETRY_DELAY_MINUTES.len() - 1);
    Duration::from_secs(RETRY_DELAY_MINUTES[idx] * 60)
}

/// Longer-horizon retry for the one failure mode the monitoring loop
/// does not own: the provider reports the certificate issued but edge
/// nodes are not serving it yet.
///
/// Keeps nudging the provider to re-verify; after
/// `rebuild_after_retries` fruitless nudges it escalates to a full
/// remove/re-add rebuild, and after `max_cert_retries` it abandons the
/// tenant to manual intervention.
pub async fn run(deps: &Deps, tenant_id: &str, retry_count: u32) -> Result<()> {
    let Some(mut record) = load_eligible(deps, tenant_id)? else {
        return Ok(());
    };

    // The monitoring loop's short budget may have lapsed (`failed`) while
    // propagation is still converging; only a reverted record stops us.
    if record.monitoring_status == MonitoringStatus::Inactive {
        tracing::debug!(tenant = tenant_id, "record inactive, dropping propagation retry");
        return Ok(());
    }

    let primary = record.primary_hostname();
    let report = deps.probe.check_health(&primary).await;
    if report.healthy && report.ssl_ready {
        if record.monitoring_status != MonitoringStatus::Active {
            record.monitoring_status = MonitoringStatus::Active;
            deps.store.save(&mut record)?;
        }
        tracing::info!(
            tenant = tenant_id,
            hostname = %primary,
            retry_count,
            "certificate now serving, propagation retries done"
        );
        return Ok(());
    }

    if retry_count < deps.settings.rebuild_after_retries {
        // Nudge the provider to re-check both variants; stagger the second
        // call so one tenant action does not burst the provider API.
        deps.scheduler.enqueue(
            WorkItem::Verify {
                tenant_id: tenant_id.to_string(),
                hostname: record.apex_hostname(),
            },
            Duration::ZERO,
        )?;
        deps.scheduler.enqueue(
            WorkItem::Verify {
                tenant_id: tenant_id.to_string(),
                hostname: record.www_hostname(),
            },
            deps.settings.verify_stagger(),
        )?;
    } else {
        // Re-verification alone has not worked; tear down and rebuild.
        tracing::info!(
            tenant = tenant_id,
            retry_count,
            "escalating to provider-side rebuild"
        );
        deps.scheduler.enqueue(
            WorkItem::RebuildRemove {
                tenant_id: tenant_id.to_string(),
            },
            Duration::ZERO,
        )?;
    }

    if retry_count < deps.settings.max_cert_retries {
        deps.scheduler.enqueue(
            WorkItem::CertRetry {
                tenant_id: tenant_id.to_string(),
                retry_count: retry_count + 1,
            },
            retry_delay(retry_count),
        )?;
    } else {
        tracing::warn!(
            tenant = tenant_id,
            hostname = %primary,
            retry_count,
            "propagation retries exhausted, abandoning (manual intervention required)"
        );
    }

    Ok(())
}

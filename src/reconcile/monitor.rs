use super::{load_eligible, Deps};
use crate::domain::MonitoringStatus;
use crate::scheduler::WorkItem;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// What a completed health poll means for the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollDecision {
    /// Probe passed: terminal success.
    Activate,
    /// Budget exhausted without passing: terminal failure.
    Fail,
    /// Keep polling.
    Continue,
}

pub(crate) fn poll_decision(healthy: bool, attempts: u32, max_attempts: u32) -> PollDecision {
    if healthy {
        PollDecision::Activate
    } else if attempts >= max_attempts {
        PollDecision::Fail
    } else {
        PollDecision::Continue
    }
}

/// Time still to wait before the next poll is due, or `None` if due now.
/// Keeps the recurring loop idempotent when it gets scheduled twice.
pub(crate) fn remaining_wait(
    last_checked_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    poll_interval: Duration,
) -> Option<Duration> {
    let last = last_checked_at?;
    let elapsed = (now - last).to_std().ok()?;
    if elapsed >= poll_interval {
        None
    } else {
        Some(poll_interval - elapsed)
    }
}

/// Recurring monitoring poll for one tenant.
///
/// Owns only *initial* convergence: DNS pointed correctly and the
/// provider's certificate issued, within a short tenant-facing budget.
/// Long-tail edge propagation is the certificate-propagation retry
/// loop's job, which this unit hands off to on budget exhaustion.
pub async fn run(deps: &Deps, tenant_id: &str) -> Result<()> {
    // Reconcile against current truth, not what was true at schedule time.
    let Some(mut record) = load_eligible(deps, tenant_id)? else {
        return Ok(());
    };

    if record.monitoring_status != MonitoringStatus::Monitoring {
        tracing::debug!(
            tenant = tenant_id,
            status = record.monitoring_status.as_str(),
            "not in monitoring, stale invocation ignored"
        );
        return Ok(());
    }

    let now = Utc::now();
    let poll_interval = deps.settings.poll_interval();
    if let Some(wait) = remaining_wait(record.last_checked_at, now, poll_interval) {
        deps.scheduler.enqueue(
            WorkItem::Monitor {
                tenant_id: tenant_id.to_string(),
            },
            wait,
        )?;
        return Ok(());
    }

    let primary = record.primary_hostname();
    let report = deps.probe.check_health(&primary).await;

    record.check_attempts += 1;
    record.last_checked_at = Some(now);

    match poll_decision(
        report.healthy && report.ssl_ready,
        record.check_attempts,
        deps.settings.max_check_attempts,
    ) {
        PollDecision::Activate => {
            record.monitoring_status = MonitoringStatus::Active;
            deps.store.save(&mut record)?;
            tracing::info!(tenant = tenant_id, hostname = %primary, "domain verified live");
        }
        PollDecision::Fail => {
            record.monitoring_status = MonitoringStatus::Failed;
            deps.store.save(&mut record)?;
            tracing::warn!(
                tenant = tenant_id,
                hostname = %primary,
                attempts = record.check_attempts,
                "monitoring budget exhausted"
            );
            escalate_if_propagation_lag(deps, tenant_id, &primary).await;
        }
        PollDecision::Continue => {
            deps.store.save(&mut record)?;
            deps.scheduler.enqueue(
                WorkItem::Monitor {
                    tenant_id: tenant_id.to_string(),
                },
                poll_interval,
            )?;
        }
    }

    Ok(())
}

/// If the provider already reports the certificate issued while the
/// probe keeps failing, the stall is edge propagation lag: hand off to
/// the longer-horizon retry loop. A plain DNS misconfiguration gets no
/// escalation — that is the tenant's record to fix.
async fn escalate_if_propagation_lag(deps: &Deps, tenant_id: &str, hostname: &str) {
    let issued = match deps.provider.find_domain_by_name(hostname).await {
        Ok(domain) => domain.is_some_and(|d| d.verified),
        Err(e) => {
            tracing::warn!(tenant = tenant_id, "provider lookup during escalation failed: {e:#}");
            false
        }
    };

    if issued {
        tracing::info!(
            tenant = tenant_id,
            hostname,
            "certificate issued but not serving, starting propagation retries"
        );
        if let Err(e) = deps.scheduler.enqueue(
            WorkItem::CertRetry {
                tenant_id: tenant_id.to_string(),
                retry_count: 0,
            },
            Duration::ZERO,
        ) {
            tracing::warn!(tenant = tenant_id, "failed to schedule propagation retry: {e:#}");
        }
    }
}

use super::Deps;
use crate::domain::MonitoringStatus;
use crate::scheduler::WorkItem;
use anyhow::{bail, Context, Result};
use std::time::Duration;

/// One-shot setup when a tenant switches to a custom hostname: register
/// the canonical hostname with the provider, enter `monitoring`, and
/// enqueue the first monitoring poll.
///
/// Unlike the recurring units, provider failures here propagate to the
/// caller — there is no recurring loop yet to self-heal, so the caller
/// surfaces the failure to the tenant.
pub async fn run(deps: &Deps, tenant_id: &str) -> Result<()> {
    let Some(mut record) = deps.store.get(tenant_id)? else {
        bail!("No domain record for tenant {tenant_id}");
    };

    if !record.tier_eligible || record.host_type != crate::domain::HostType::CustomDomain {
        tracing::debug!(
            tenant = tenant_id,
            "tenant not entitled to custom-domain setup, skipping"
        );
        return Ok(());
    }

    if !record.canonical_preference_recognized() {
        tracing::warn!(
            tenant = tenant_id,
            preference = %record.canonical_preference,
            "unrecognized canonical preference, registering stored hostname as-is"
        );
    }
    let primary = record.primary_hostname();

    // Idempotent registration: re-running setup after a partial failure
    // must not error on an already-registered hostname.
    let existing = deps
        .provider
        .find_domain_by_name(&primary)
        .await
        .with_context(|| format!("Failed to look up {primary} at provider"))?;
    if existing.is_none() {
        deps.provider
            .add_domain(&primary)
            .await
            .with_context(|| format!("Failed to register {primary} at provider"))?;
        tracing::info!(tenant = tenant_id, hostname = %primary, "registered domain at provider");
    } else {
        tracing::debug!(tenant = tenant_id, hostname = %primary, "domain already registered");
    }

    record.monitoring_enabled = true;
    record.monitoring_status = MonitoringStatus::Monitoring;
    // Attempts reset on every entry into `monitoring`.
    record.check_attempts = 0;
    record.last_checked_at = None;
    deps.store.save(&mut record)?;

    deps.scheduler.enqueue(
        WorkItem::Monitor {
            tenant_id: tenant_id.to_string(),
        },
        Duration::ZERO,
    )?;

    tracing::info!(tenant = tenant_id, hostname = %record.hostname, "monitoring started");
    Ok(())
}

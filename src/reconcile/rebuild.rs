use super::{load_eligible, Deps};
use crate::scheduler::WorkItem;
use anyhow::{Context, Result};
use std::time::Duration;

/// Rebuild phase 1: remove the provider-side domain objects for both
/// hostname variants, then schedule phase 2 after the provider's
/// cooldown window.
///
/// Both variants are always attempted regardless of the canonical
/// preference — either may have been registered by an earlier setup.
pub async fn remove(deps: &Deps, tenant_id: &str) -> Result<()> {
    let Some(record) = load_eligible(deps, tenant_id)? else {
        return Ok(());
    };

    for hostname in [record.apex_hostname(), record.www_hostname()] {
        let found = deps
            .provider
            .find_domain_by_name(&hostname)
            .await
            .with_context(|| format!("Failed to look up {hostname} for rebuild"))?;
        match found {
            Some(domain) => {
                deps.provider
                    .remove_domain(&domain.id)
                    .await
                    .with_context(|| format!("Failed to remove {hostname} at provider"))?;
                tracing::info!(tenant = tenant_id, hostname = %hostname, "removed domain for rebuild");
            }
            None => {
                tracing::debug!(tenant = tenant_id, hostname = %hostname, "no domain to remove");
            }
        }
    }

    deps.scheduler.enqueue(
        WorkItem::RebuildReadd {
            tenant_id: tenant_id.to_string(),
        },
        deps.settings.rebuild_cooldown(),
    )?;

    Ok(())
}

/// Rebuild phase 2: re-register the canonical hostname and re-trigger
/// verification for both variants, staggered so one tenant action does
/// not burst the provider API.
pub async fn readd(deps: &Deps, tenant_id: &str) -> Result<()> {
    // Eligibility re-validated after the cooldown; the tenant may have
    // reverted or downgraded while we waited.
    let Some(record) = load_eligible(deps, tenant_id)? else {
        return Ok(());
    };

    if !record.canonical_preference_recognized() {
        tracing::warn!(
            tenant = tenant_id,
            preference = %record.canonical_preference,
            "unrecognized canonical preference, re-adding stored hostname as-is"
        );
    }
    let primary = record.primary_hostname();

    // Only the canonical variant is a primary record; provider-side
    // redirect rules cover the other one. Re-fetch before mutating.
    let existing = deps
        .provider
        .find_domain_by_name(&primary)
        .await
        .with_context(|| format!("Failed to look up {primary} before re-add"))?;
    if existing.is_none() {
        deps.provider
            .add_domain(&primary)
            .await
            .with_context(|| format!("Failed to re-add {primary} at provider"))?;
        tracing::info!(tenant = tenant_id, hostname = %primary, "re-added domain after rebuild");
    }

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

    Ok(())
}

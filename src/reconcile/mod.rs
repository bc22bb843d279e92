pub mod cert_retry;
pub mod monitor;
pub mod rebuild;
pub mod setup;
pub mod verify;

use crate::config::{Config, MonitoringConfig};
use crate::domain::{DomainStore, TenantDomainRecord};
use crate::probe::{HealthProbe, LiveProbe};
use crate::provider::{self, ProvisioningProvider};
use crate::scheduler::{Scheduler, WorkItem, WorkQueue};
use anyhow::Result;
use std::sync::Arc;

/// Everything a workflow unit needs, injected so tests can substitute
/// fakes for the provider, probe, and scheduler.
pub struct Deps {
    pub store: DomainStore,
    pub provider: Arc<dyn ProvisioningProvider>,
    pub probe: Arc<dyn HealthProbe>,
    pub scheduler: Arc<dyn Scheduler>,
    pub settings: MonitoringConfig,
}

impl Deps {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            store: DomainStore::open(config.db_path()),
            provider: provider::create_provider(&config.provider)?,
            probe: Arc::new(LiveProbe::new()),
            scheduler: Arc::new(WorkQueue::open(config.db_path())),
            settings: config.monitoring.clone(),
        })
    }
}

/// Dispatch one dequeued work item to its workflow unit.
pub async fn execute(deps: &Deps, item: &WorkItem) -> Result<()> {
    match item {
        WorkItem::Monitor { tenant_id } => monitor::run(deps, tenant_id).await,
        WorkItem::CertRetry {
            tenant_id,
            retry_count,
        } => cert_retry::run(deps, tenant_id, *retry_count).await,
        WorkItem::RebuildRemove { tenant_id } => rebuild::remove(deps, tenant_id).await,
        WorkItem::RebuildReadd { tenant_id } => rebuild::readd(deps, tenant_id).await,
        WorkItem::Verify {
            tenant_id,
            hostname,
        } => verify::run(deps, tenant_id, hostname).await,
    }
}

/// Load the record and re-validate the eligibility guards against
/// current truth. `None` means "nothing to do": missing record or
/// ineligible state, both clean exits rather than errors.
pub(crate) fn load_eligible(deps: &Deps, tenant_id: &str) -> Result<Option<TenantDomainRecord>> {
    let Some(record) = deps.store.get(tenant_id)? else {
        tracing::debug!(tenant = tenant_id, "no domain record, nothing to reconcile");
        return Ok(None);
    };
    if !record.eligible() {
        tracing::debug!(
            tenant = tenant_id,
            host_type = record.host_type.as_str(),
            tier_eligible = record.tier_eligible,
            monitoring_enabled = record.monitoring_enabled,
            "record ineligible, stopping reconciliation"
        );
        return Ok(None);
    }
    Ok(Some(record))
}

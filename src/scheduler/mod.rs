pub mod queue;
pub mod runner;

#[cfg(test)]
pub mod recording;

pub use queue::WorkQueue;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One discrete, stateless unit of reconciliation work.
///
/// Parameters are hints from schedule time only; every unit re-reads the
/// current record and re-checks its guards when it actually runs, so a
/// stale invocation is safely ignorable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum WorkItem {
    /// Recurring monitoring poll for one tenant.
    Monitor { tenant_id: String },
    /// Certificate-propagation retry, `retry_count` starting at 0.
    CertRetry { tenant_id: String, retry_count: u32 },
    /// Rebuild phase 1: remove both hostname variants at the provider.
    RebuildRemove { tenant_id: String },
    /// Rebuild phase 2: re-add the canonical hostname and re-verify.
    RebuildReadd { tenant_id: String },
    /// Idempotent single-hostname verification trigger.
    Verify { tenant_id: String, hostname: String },
}

impl WorkItem {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Monitor { .. } => "monitor",
            Self::CertRetry { .. } => "cert_retry",
            Self::RebuildRemove { .. } => "rebuild_remove",
            Self::RebuildReadd { .. } => "rebuild_readd",
            Self::Verify { .. } => "verify",
        }
    }

    pub fn tenant_id(&self) -> &str {
        match self {
            Self::Monitor { tenant_id }
            | Self::CertRetry { tenant_id, .. }
            | Self::RebuildRemove { tenant_id }
            | Self::RebuildReadd { tenant_id }
            | Self::Verify { tenant_id, .. } => tenant_id,
        }
    }
}

/// The seam between workflow units: waiting is always "enqueue with
/// delay", never an in-process sleep. Not rescheduling ends a workflow.
pub trait Scheduler: Send + Sync {
    fn enqueue(&self, item: WorkItem, delay: Duration) -> Result<()>;
}

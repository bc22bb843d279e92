mod http;

#[cfg(test)]
pub mod fake;

pub use http::HttpProvider;

use crate::config::ProviderConfig;
use anyhow::{bail, Result};
use std::sync::Arc;

// ── Provider trait ───────────────────────────────────────────────

/// A domain object as the provisioning provider reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDomain {
    pub id: String,
    pub name: String,
    /// Whether the provider considers the domain verified / certificate issued.
    pub verified: bool,
}

/// Result of a provider-side verification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub verified: bool,
    pub queued: bool,
}

impl VerifyOutcome {
    pub fn label(self) -> &'static str {
        if self.verified {
            "verified"
        } else if self.queued {
            "queued"
        } else {
            "rejected"
        }
    }
}

/// Thin adapter over the remote domain/TLS provisioning API.
///
/// The API is eventually consistent: a read may not reflect a recent write
/// from this same process, and "not found" is a normal answer, never an
/// error. Callers re-fetch before mutating.
#[async_trait::async_trait]
pub trait ProvisioningProvider: Send + Sync {
    /// Human-readable provider name (e.g. "http")
    fn name(&self) -> &str;

    async fn find_domain_by_name(&self, hostname: &str) -> Result<Option<ProviderDomain>>;

    /// Register a hostname. Implementations treat "already exists" as
    /// success and return the existing domain object.
    async fn add_domain(&self, hostname: &str) -> Result<ProviderDomain>;

    async fn remove_domain(&self, domain_id: &str) -> Result<()>;

    async fn verify_domain(&self, domain_id: &str) -> Result<VerifyOutcome>;
}

// ── Factory ──────────────────────────────────────────────────────

/// Create a provisioning provider client from config.
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn ProvisioningProvider>> {
    match config.kind.as_str() {
        "http" | "" => Ok(Arc::new(HttpProvider::new(
            &config.api_base,
            config.api_token.as_deref(),
        ))),
        other => bail!("Unknown provisioning provider kind: \"{other}\". Valid: http"),
    }
}

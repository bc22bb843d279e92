//! In-memory provisioning provider for tests: records every call and
//! lets tests script verification outcomes and failures.

use super::{ProviderDomain, ProvisioningProvider, VerifyOutcome};
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub struct FakeProvider {
    domains: Mutex<HashMap<String, ProviderDomain>>,
    next_id: Mutex<u64>,
    verify_outcome: Mutex<VerifyOutcome>,
    fail_all: AtomicBool,

    pub add_calls: Mutex<Vec<String>>,
    pub remove_calls: Mutex<Vec<String>>,
    pub verify_calls: Mutex<Vec<String>>,
    pub find_calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            domains: Mutex::new(HashMap::new()),
            next_id: Mutex::new(0),
            // Unverified-but-queued is the common provider answer.
            verify_outcome: Mutex::new(VerifyOutcome {
                verified: false,
                queued: true,
            }),
            fail_all: AtomicBool::new(false),
            add_calls: Mutex::new(Vec::new()),
            remove_calls: Mutex::new(Vec::new()),
            verify_calls: Mutex::new(Vec::new()),
            find_calls: Mutex::new(Vec::new()),
        }
    }

    /// Pre-register a domain as the provider would report it.
    pub fn with_domain(self, name: &str, verified: bool) -> Self {
        {
            let mut domains = self.domains.lock().unwrap();
            let id = format!("dom-{}", domains.len() + 1);
            domains.insert(
                name.to_string(),
                ProviderDomain {
                    id,
                    name: name.to_string(),
                    verified,
                },
            );
        }
        self
    }

    pub fn set_verify_outcome(&self, outcome: VerifyOutcome) {
        *self.verify_outcome.lock().unwrap() = outcome;
    }

    /// Make every subsequent call fail, simulating a provider outage.
    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn domain_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.domains.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    fn check_outage(&self) -> Result<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            bail!("provider outage (simulated)");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProvisioningProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn find_domain_by_name(&self, hostname: &str) -> Result<Option<ProviderDomain>> {
        self.check_outage()?;
        self.find_calls.lock().unwrap().push(hostname.to_string());
        Ok(self.domains.lock().unwrap().get(hostname).cloned())
    }

    async fn add_domain(&self, hostname: &str) -> Result<ProviderDomain> {
        self.check_outage()?;
        self.add_calls.lock().unwrap().push(hostname.to_string());
        let mut domains = self.domains.lock().unwrap();
        if let Some(existing) = domains.get(hostname) {
            return Ok(existing.clone());
        }
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let domain = ProviderDomain {
            id: format!("dom-new-{}", *next_id),
            name: hostname.to_string(),
            verified: false,
        };
        domains.insert(hostname.to_string(), domain.clone());
        Ok(domain)
    }

    async fn remove_domain(&self, domain_id: &str) -> Result<()> {
        self.check_outage()?;
        self.remove_calls.lock().unwrap().push(domain_id.to_string());
        self.domains
            .lock()
            .unwrap()
            .retain(|_, d| d.id != domain_id);
        Ok(())
    }

    async fn verify_domain(&self, domain_id: &str) -> Result<VerifyOutcome> {
        self.check_outage()?;
        self.verify_calls.lock().unwrap().push(domain_id.to_string());
        let outcome = *self.verify_outcome.lock().unwrap();
        if outcome.verified {
            let mut domains = self.domains.lock().unwrap();
            for domain in domains.values_mut() {
                if domain.id == domain_id {
                    domain.verified = true;
                }
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_is_idempotent_on_existing_domain() {
        let provider = FakeProvider::new().with_domain("example.com", true);
        let first = provider.find_domain_by_name("example.com").await.unwrap().unwrap();
        let added = provider.add_domain("example.com").await.unwrap();
        assert_eq!(first.id, added.id);
        assert!(added.verified);
    }

    #[tokio::test]
    async fn remove_then_find_returns_none() {
        let provider = FakeProvider::new().with_domain("example.com", false);
        let domain = provider.find_domain_by_name("example.com").await.unwrap().unwrap();
        provider.remove_domain(&domain.id).await.unwrap();
        assert!(provider.find_domain_by_name("example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn outage_mode_fails_every_call() {
        let provider = FakeProvider::new();
        provider.fail_all(true);
        assert!(provider.find_domain_by_name("example.com").await.is_err());
        provider.fail_all(false);
        assert!(provider.find_domain_by_name("example.com").await.is_ok());
    }
}

use super::{HealthProbe, HealthReport};
use reqwest::Client;
use std::time::Duration;

/// Probes a hostname by resolving it over DNS, then issuing an HTTPS
/// request so the edge must present a usable certificate.
pub struct LiveProbe {
    client: Client,
    timeout: Duration,
}

impl Default for LiveProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveProbe {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(10))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .connect_timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            timeout,
        }
    }

    async fn dns_resolves(&self, hostname: &str) -> bool {
        let lookup = tokio::net::lookup_host((hostname, 443));
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(mut addrs)) => addrs.next().is_some(),
            _ => false,
        }
    }

    async fn tls_responds(&self, hostname: &str) -> bool {
        // Any completed response means DNS, TCP, and the TLS handshake all
        // worked; HTTP status is irrelevant here.
        self.client
            .get(format!("https://{hostname}/"))
            .send()
            .await
            .is_ok()
    }
}

#[async_trait::async_trait]
impl HealthProbe for LiveProbe {
    async fn check_health(&self, hostname: &str) -> HealthReport {
        if !self.dns_resolves(hostname).await {
            tracing::debug!(hostname, "probe: DNS resolution failed");
            return HealthReport::unhealthy();
        }

        let ssl_ready = self.tls_responds(hostname).await;
        if !ssl_ready {
            tracing::debug!(hostname, "probe: TLS request failed");
        }
        HealthReport {
            healthy: ssl_ready,
            ssl_ready,
        }
    }
}

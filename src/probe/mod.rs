mod live;

#[cfg(test)]
pub mod fake;

pub use live::LiveProbe;

/// Outcome of a live DNS + TLS readiness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    /// DNS resolved and a TLS-terminated request succeeded.
    pub healthy: bool,
    /// The TLS handshake specifically succeeded.
    pub ssl_ready: bool,
}

impl HealthReport {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            ssl_ready: true,
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ssl_ready: false,
        }
    }
}

/// Live DNS + TLS handshake check against a hostname.
///
/// Implementations never propagate errors: any internal failure is
/// reported as "not healthy" so a flaky probe cannot take down the
/// reconciliation loop that called it.
#[async_trait::async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check_health(&self, hostname: &str) -> HealthReport;
}

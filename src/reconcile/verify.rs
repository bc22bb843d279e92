use super::Deps;
use anyhow::{Context, Result};

/// Idempotent single-hostname verification trigger.
///
/// No persisted-state side effects of its own: the monitoring and retry
/// loops pick up whatever this nudge achieves on their next poll. A
/// missing or already-verified domain is a no-op, so the trigger can be
/// fired freely by setup, retries, and rebuilds.
pub async fn run(deps: &Deps, tenant_id: &str, hostname: &str) -> Result<()> {
    let found = deps
        .provider
        .find_domain_by_name(hostname)
        .await
        .with_context(|| format!("Failed to look up {hostname} for verification"))?;

    let Some(domain) = found else {
        tracing::debug!(tenant = tenant_id, hostname, "nothing to verify, domain not registered");
        return Ok(());
    };

    if domain.verified {
        tracing::debug!(tenant = tenant_id, hostname, "already verified, skipping");
        return Ok(());
    }

    let outcome = deps
        .provider
        .verify_domain(&domain.id)
        .await
        .with_context(|| format!("Failed to verify {hostname} at provider"))?;
    tracing::info!(
        tenant = tenant_id,
        hostname,
        outcome = outcome.label(),
        "verification triggered"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::{fixture, unhealthy_probe};
    use super::*;
    use crate::provider::fake::FakeProvider;
    use crate::provider::VerifyOutcome;

    #[tokio::test]
    async fn unverified_domain_gets_one_verify_call() {
        let fx = fixture(
            FakeProvider::new().with_domain("example.com", false),
            unhealthy_probe(),
        );

        run(&fx.deps, "t1", "example.com").await.unwrap();

        assert_eq!(fx.provider.verify_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn already_verified_domain_is_a_noop_twice_over() {
        let fx = fixture(
            FakeProvider::new().with_domain("example.com", true),
            unhealthy_probe(),
        );

        run(&fx.deps, "t1", "example.com").await.unwrap();
        run(&fx.deps, "t1", "example.com").await.unwrap();

        // No provider mutation on either call.
        assert!(fx.provider.verify_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn verification_marks_domain_verified_then_noops() {
        let fx = fixture(
            FakeProvider::new().with_domain("example.com", false),
            unhealthy_probe(),
        );
        fx.provider.set_verify_outcome(VerifyOutcome {
            verified: true,
            queued: false,
        });

        run(&fx.deps, "t1", "example.com").await.unwrap();
        run(&fx.deps, "t1", "example.com").await.unwrap();

        // First call verified the domain; the second saw it verified.
        assert_eq!(fx.provider.verify_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_domain_is_a_noop() {
        let fx = fixture(FakeProvider::new(), unhealthy_probe());

        run(&fx.deps, "t1", "gone.example.com").await.unwrap();

        assert!(fx.provider.verify_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_outage_surfaces_as_error_for_job_retry() {
        let fx = fixture(FakeProvider::new(), unhealthy_probe());
        fx.provider.fail_all(true);

        assert!(run(&fx.deps, "t1", "example.com").await.is_err());
    }
}

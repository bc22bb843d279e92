#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::similar_names,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use domainpilot::config::Config;
use domainpilot::domain::{HostType, MonitoringStatus, TenantDomainRecord};
use domainpilot::reconcile::{self, Deps};
use domainpilot::scheduler::runner;
use tracing_subscriber::{fmt, EnvFilter};

/// `DomainPilot` - custom-domain provisioning and certificate readiness.
#[derive(Parser, Debug)]
#[command(name = "domainpilot")]
#[command(version = "0.1.0")]
#[command(about = "Reconciles tenant custom domains against the provisioning provider.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the reconciliation runner (polls the work queue until killed)
    Run,
    /// Connect a custom hostname for a tenant and start monitoring it
    Connect {
        /// Tenant identifier
        tenant: String,
        /// Custom hostname, e.g. shop.example.com
        hostname: String,
        /// Which variant is primary: apex or www
        #[arg(long, default_value = "apex")]
        canonical: String,
    },
    /// Disconnect a tenant's custom hostname and stop monitoring
    Disconnect {
        /// Tenant identifier
        tenant: String,
    },
    /// Show a tenant's domain status
    Status {
        /// Tenant identifier
        tenant: String,
    },
    /// Trigger provider-side verification for one hostname
    Verify {
        /// Tenant identifier
        tenant: String,
        /// Hostname to verify (apex or www variant)
        hostname: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respects RUST_LOG, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = Config::load_or_init()?;

    match cli.command {
        Commands::Run => {
            tokio::select! {
                result = runner::run(config) => result,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown requested");
                    Ok(())
                }
            }
        }
        Commands::Connect {
            tenant,
            hostname,
            canonical,
        } => connect(&config, &tenant, &hostname, &canonical).await,
        Commands::Disconnect { tenant } => disconnect(&config, &tenant),
        Commands::Status { tenant } => status(&config, &tenant),
        Commands::Verify { tenant, hostname } => {
            let deps = Deps::from_config(&config)?;
            reconcile::verify::run(&deps, &tenant, &hostname).await
        }
    }
}

/// Record the hostname and run setup inline so a provider failure is
/// reported to the operator instead of disappearing into the queue.
async fn connect(config: &Config, tenant: &str, hostname: &str, canonical: &str) -> Result<()> {
    if !matches!(canonical, "apex" | "www") {
        bail!("--canonical must be 'apex' or 'www', got '{canonical}'");
    }

    let deps = Deps::from_config(config)?;
    let mut record = match deps.store.get(tenant)? {
        // Reconnecting replaces the hostname but keeps the row.
        Some(mut existing) => {
            existing.hostname = domainpilot::domain::normalize_hostname(hostname);
            existing.canonical_preference = canonical.to_string();
            existing.host_type = HostType::CustomDomain;
            existing
        }
        None => TenantDomainRecord::new(tenant, hostname, canonical),
    };
    record.monitoring_enabled = true;
    deps.store.save(&mut record)?;

    // Transient provider errors get the same bounded backoff as queued
    // work; an exhausted retry budget still surfaces to the operator.
    runner::retry_with_backoff(&config.reliability, "setup", || {
        reconcile::setup::run(&deps, tenant)
    })
    .await?;
    println!("Connected {} for tenant {tenant}; monitoring started.", record.hostname);
    Ok(())
}

/// Revert the tenant to its platform subdomain. In-flight queued work
/// sees the reverted record and drops out on its own.
fn disconnect(config: &Config, tenant: &str) -> Result<()> {
    let deps = Deps::from_config(config)?;
    let Some(mut record) = deps.store.get(tenant)? else {
        bail!("No domain record for tenant {tenant}");
    };

    record.host_type = HostType::PlatformSubdomain;
    record.monitoring_enabled = false;
    record.monitoring_status = MonitoringStatus::Inactive;
    deps.store.save(&mut record)?;

    println!("Disconnected {} for tenant {tenant}.", record.hostname);
    Ok(())
}

fn status(config: &Config, tenant: &str) -> Result<()> {
    let deps = Deps::from_config(config)?;
    let Some(record) = deps.store.get(tenant)? else {
        println!("Tenant {tenant}: not connected");
        return Ok(());
    };

    println!("Tenant:    {}", record.tenant_id);
    println!("Hostname:  {}", record.hostname);
    println!("Canonical: {}", record.canonical_preference);
    println!("Status:    {}", record.public_status());
    println!("Attempts:  {}", record.check_attempts);
    match record.last_checked_at {
        Some(at) => println!("Checked:   {}", at.to_rfc3339()),
        None => println!("Checked:   never"),
    }
    Ok(())
}

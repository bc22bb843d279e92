use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace directory - computed from home, not serialized
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,

    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Provisioning provider API endpoint and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider kind. Currently only "http" (REST provisioning API).
    #[serde(default = "default_provider_kind")]
    pub kind: String,
    /// Base URL of the provisioning API, e.g. `https://provisioning.example.net/v1`.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Bearer token for the provisioning API.
    #[serde(default)]
    pub api_token: Option<String>,
}

/// Job-execution-layer reliability knobs.
///
/// These cover transient provider/network failures of a single queued unit;
/// business-level retry budgets live in [`MonitoringConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    /// Retries per dispatched work item before giving up on that invocation.
    #[serde(default = "default_job_retries")]
    pub job_retries: u32,
    /// Base backoff (ms) between job retries, doubled per attempt.
    #[serde(default = "default_job_backoff_ms")]
    pub job_backoff_ms: u64,
    /// How often the runner polls the work queue for due items (seconds).
    #[serde(default = "default_runner_poll_secs")]
    pub runner_poll_secs: u64,
}

/// Reconciliation cadence and budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Minimum spacing between two health polls for one tenant (seconds).
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Monitoring polls allowed before the record goes `failed`.
    #[serde(default = "default_max_check_attempts")]
    pub max_check_attempts: u32,
    /// Certificate-propagation retries allowed before abandoning.
    #[serde(default = "default_max_cert_retries")]
    pub max_cert_retries: u32,
    /// Retry count at which re-verification escalates to a full rebuild.
    #[serde(default = "default_rebuild_after_retries")]
    pub rebuild_after_retries: u32,
    /// Cooldown between rebuild remove and re-add phases (seconds).
    #[serde(default = "default_rebuild_cooldown_secs")]
    pub rebuild_cooldown_secs: u64,
    /// Offset between the two staggered verification triggers (seconds).
    #[serde(default = "default_verify_stagger_secs")]
    pub verify_stagger_secs: u64,
}

fn default_provider_kind() -> String {
    "http".to_string()
}

fn default_api_base() -> String {
    "https://provisioning.invalid/v1".to_string()
}

fn default_job_retries() -> u32 {
    3
}

fn default_job_backoff_ms() -> u64 {
    500
}

fn default_runner_poll_secs() -> u64 {
    5
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_max_check_attempts() -> u32 {
    12
}

fn default_max_cert_retries() -> u32 {
    6
}

fn default_rebuild_after_retries() -> u32 {
    3
}

fn default_rebuild_cooldown_secs() -> u64 {
    10
}

fn default_verify_stagger_secs() -> u64 {
    30
}

impl MonitoringConfig {
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }

    pub fn rebuild_cooldown(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.rebuild_cooldown_secs)
    }

    pub fn verify_stagger(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.verify_stagger_secs)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            api_base: default_api_base(),
            api_token: None,
        }
    }
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            job_retries: default_job_retries(),
            job_backoff_ms: default_job_backoff_ms(),
            runner_poll_secs: default_runner_poll_secs(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_check_attempts: default_max_check_attempts(),
            max_cert_retries: default_max_cert_retries(),
            rebuild_after_retries: default_rebuild_after_retries(),
            rebuild_cooldown_secs: default_rebuild_cooldown_secs(),
            verify_stagger_secs: default_verify_stagger_secs(),
        }
    }
}

// ── Config impl ──────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
        let pilot_dir = home.join(".domainpilot");

        Self {
            workspace_dir: pilot_dir.join("workspace"),
            config_path: pilot_dir.join("config.toml"),
            provider: ProviderConfig::default(),
            reliability: ReliabilityConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let pilot_dir = home.join(".domainpilot");
        let config_path = pilot_dir.join("config.toml");

        if !pilot_dir.exists() {
            fs::create_dir_all(&pilot_dir).context("Failed to create .domainpilot directory")?;
        }
        fs::create_dir_all(pilot_dir.join("workspace"))
            .context("Failed to create workspace directory")?;

        let mut config = if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str::<Config>(&contents).context("Failed to parse config file")?
        } else {
            let config = Config::default();
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render default config")?;
            fs::write(&config_path, rendered).context("Failed to write default config")?;
            config
        };

        // Computed paths are skipped during serialization
        config.config_path = config_path;
        config.workspace_dir = pilot_dir.join("workspace");
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("DOMAINPILOT_PROVIDER_TOKEN") {
            if !token.is_empty() {
                self.provider.api_token = Some(token);
            }
        }
        if let Ok(base) = std::env::var("DOMAINPILOT_PROVIDER_API_BASE") {
            if !base.is_empty() {
                self.provider.api_base = base;
            }
        }
    }

    /// Path of the sqlite database holding domain records and the work queue.
    pub fn db_path(&self) -> PathBuf {
        self.workspace_dir.join("domainpilot.db")
    }
}

pub mod store;

pub use store::DomainStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── State machine enums ──────────────────────────────────────────

/// How the tenant's storefront hostname is served.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HostType {
    #[default]
    PlatformSubdomain,
    CustomDomain,
}

impl HostType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlatformSubdomain => "platform_subdomain",
            Self::CustomDomain => "custom_domain",
        }
    }

    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("custom_domain") {
            Self::CustomDomain
        } else {
            Self::PlatformSubdomain
        }
    }
}

/// Primary state machine field: `inactive → monitoring → {active | failed}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MonitoringStatus {
    #[default]
    Inactive,
    Monitoring,
    Active,
    Failed,
}

impl MonitoringStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Monitoring => "monitoring",
            Self::Active => "active",
            Self::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "monitoring" => Self::Monitoring,
            "active" => Self::Active,
            "failed" => Self::Failed,
            _ => Self::Inactive,
        }
    }
}

// ── Tenant domain record ─────────────────────────────────────────

/// Persisted configuration and reconciliation state for one tenant's
/// custom hostname. One row per tenant; re-attempting provisioning is
/// always a state transition, never a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantDomainRecord {
    pub tenant_id: String,
    /// Requested hostname, normalized, without scheme.
    pub hostname: String,
    /// Which of {apex, www} is primary. Stored raw; unrecognized values
    /// fall back to registering `hostname` unchanged.
    pub canonical_preference: String,
    pub host_type: HostType,
    /// Whether the tenant's plan entitles them to custom-domain
    /// provisioning. Re-checked on every reconciliation step.
    pub tier_eligible: bool,
    pub monitoring_status: MonitoringStatus,
    /// External on/off switch, independent of `monitoring_status`.
    pub monitoring_enabled: bool,
    /// Polls performed since the last entry into `monitoring`.
    pub check_attempts: u32,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantDomainRecord {
    pub fn new(tenant_id: &str, hostname: &str, canonical_preference: &str) -> Self {
        let now = Utc::now();
        Self {
            tenant_id: tenant_id.to_string(),
            hostname: normalize_hostname(hostname),
            canonical_preference: canonical_preference.to_string(),
            host_type: HostType::CustomDomain,
            tier_eligible: true,
            monitoring_status: MonitoringStatus::Inactive,
            monitoring_enabled: false,
            check_attempts: 0,
            last_checked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The hostname without its `www.` label.
    pub fn apex_hostname(&self) -> String {
        self.hostname
            .strip_prefix("www.")
            .unwrap_or(&self.hostname)
            .to_string()
    }

    /// The `www.` variant of the hostname.
    pub fn www_hostname(&self) -> String {
        format!("www.{}", self.apex_hostname())
    }

    /// The hostname the provider should carry as the primary record.
    ///
    /// Unrecognized preferences fall back to the raw stored hostname;
    /// callers log that case so a bad preference is not silently masked.
    pub fn primary_hostname(&self) -> String {
        match self.canonical_preference.as_str() {
            "apex" => self.apex_hostname(),
            "www" => self.www_hostname(),
            _ => self.hostname.clone(),
        }
    }

    pub fn canonical_preference_recognized(&self) -> bool {
        matches!(self.canonical_preference.as_str(), "apex" | "www")
    }

    /// Whether any reconciliation step may act on this record.
    /// Re-validated at the top of every unit, never cached.
    pub fn eligible(&self) -> bool {
        self.host_type == HostType::CustomDomain && self.tier_eligible && self.monitoring_enabled
    }

    /// Coarse tenant-facing status. No wire-level detail is exposed.
    pub fn public_status(&self) -> &'static str {
        match self.monitoring_status {
            MonitoringStatus::Inactive => "not connected",
            MonitoringStatus::Monitoring => "verifying",
            MonitoringStatus::Active => "live",
            MonitoringStatus::Failed => "needs attention",
        }
    }
}

/// Normalize a user-supplied hostname: lowercase, strip scheme, path,
/// port, and trailing dot.
pub fn normalize_hostname(raw: &str) -> String {
    let mut host = raw.trim().to_lowercase();
    if let Some(rest) = host.split_once("://").map(|(_, r)| r.to_string()) {
        host = rest;
    }
    if let Some((h, _)) = host.split_once('/') {
        host = h.to_string();
    }
    if let Some((h, _)) = host.split_once(':') {
        host = h.to_string();
    }
    host.trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hostname: &str, preference: &str) -> TenantDomainRecord {
        TenantDomainRecord::new("tenant-1", hostname, preference)
    }

    #[test]
    fn normalize_strips_scheme_path_port_and_dot() {
        assert_eq!(normalize_hostname("https://Example.COM/shop"), "example.com");
        assert_eq!(normalize_hostname("example.com."), "example.com");
        assert_eq!(normalize_hostname("example.com:443"), "example.com");
        assert_eq!(normalize_hostname("  www.example.com  "), "www.example.com");
    }

    #[test]
    fn variants_from_apex_hostname() {
        let r = record("example.com", "apex");
        assert_eq!(r.apex_hostname(), "example.com");
        assert_eq!(r.www_hostname(), "www.example.com");
    }

    #[test]
    fn variants_from_www_hostname() {
        let r = record("www.example.com", "www");
        assert_eq!(r.apex_hostname(), "example.com");
        assert_eq!(r.www_hostname(), "www.example.com");
    }

    #[test]
    fn primary_hostname_follows_preference() {
        assert_eq!(record("example.com", "apex").primary_hostname(), "example.com");
        assert_eq!(record("example.com", "www").primary_hostname(), "www.example.com");
        assert_eq!(record("www.example.com", "apex").primary_hostname(), "example.com");
    }

    #[test]
    fn unrecognized_preference_falls_back_to_raw_hostname() {
        let r = record("www.example.com", "banana");
        assert!(!r.canonical_preference_recognized());
        assert_eq!(r.primary_hostname(), "www.example.com");
    }

    #[test]
    fn eligibility_requires_all_three_guards() {
        let mut r = record("example.com", "apex");
        r.monitoring_enabled = true;
        assert!(r.eligible());

        let mut downgraded = r.clone();
        downgraded.tier_eligible = false;
        assert!(!downgraded.eligible());

        let mut disabled = r.clone();
        disabled.monitoring_enabled = false;
        assert!(!disabled.eligible());

        r.host_type = HostType::PlatformSubdomain;
        assert!(!r.eligible());
    }

    #[test]
    fn public_status_is_coarse() {
        let mut r = record("example.com", "apex");
        assert_eq!(r.public_status(), "not connected");
        r.monitoring_status = MonitoringStatus::Monitoring;
        assert_eq!(r.public_status(), "verifying");
        r.monitoring_status = MonitoringStatus::Active;
        assert_eq!(r.public_status(), "live");
        r.monitoring_status = MonitoringStatus::Failed;
        assert_eq!(r.public_status(), "needs attention");
    }

    #[test]
    fn status_parse_round_trips_and_defaults_to_inactive() {
        for status in [
            MonitoringStatus::Inactive,
            MonitoringStatus::Monitoring,
            MonitoringStatus::Active,
            MonitoringStatus::Failed,
        ] {
            assert_eq!(MonitoringStatus::parse(status.as_str()), status);
        }
        assert_eq!(MonitoringStatus::parse("garbage"), MonitoringStatus::Inactive);
    }
}

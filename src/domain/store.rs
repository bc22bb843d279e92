use super::{HostType, MonitoringStatus, TenantDomainRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// Sqlite-backed store for tenant domain records.
///
/// Updates are last-writer-wins on scalar fields: every workflow unit
/// re-reads the current row, advances the state machine, and saves.
#[derive(Debug, Clone)]
pub struct DomainStore {
    db_path: PathBuf,
}

impl DomainStore {
    pub fn open(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn get(&self, tenant_id: &str) -> Result<Option<TenantDomainRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT tenant_id, hostname, canonical_preference, host_type, tier_eligible,
                        monitoring_status, monitoring_enabled, check_attempts, last_checked_at,
                        created_at, updated_at
                 FROM tenant_domains WHERE tenant_id = ?1",
            )?;

            let row = stmt.query_row(params![tenant_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, bool>(6)?,
                    row.get::<_, u32>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, String>(9)?,
                    row.get::<_, String>(10)?,
                ))
            });

            let raw = match row {
                Ok(raw) => raw,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => return Err(e.into()),
            };

            let (
                tenant_id,
                hostname,
                canonical_preference,
                host_type,
                tier_eligible,
                monitoring_status,
                monitoring_enabled,
                check_attempts,
                last_checked_raw,
                created_raw,
                updated_raw,
            ) = raw;

            Ok(Some(TenantDomainRecord {
                tenant_id,
                hostname,
                canonical_preference,
                host_type: HostType::parse(&host_type),
                tier_eligible,
                monitoring_status: MonitoringStatus::parse(&monitoring_status),
                monitoring_enabled,
                check_attempts,
                last_checked_at: match last_checked_raw {
                    Some(raw) => Some(parse_rfc3339(&raw)?),
                    None => None,
                },
                created_at: parse_rfc3339(&created_raw)?,
                updated_at: parse_rfc3339(&updated_raw)?,
            }))
        })
    }

    /// Insert or replace the record for its tenant. Refreshes
    /// `updated_at` on the record itself so the caller's copy matches
    /// the row.
    pub fn save(&self, record: &mut TenantDomainRecord) -> Result<()> {
        record.updated_at = Utc::now();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO tenant_domains
                   (tenant_id, hostname, canonical_preference, host_type, tier_eligible,
                    monitoring_status, monitoring_enabled, check_attempts, last_checked_at,
                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(tenant_id) DO UPDATE SET
                   hostname = excluded.hostname,
                   canonical_preference = excluded.canonical_preference,
                   host_type = excluded.host_type,
                   tier_eligible = excluded.tier_eligible,
                   monitoring_status = excluded.monitoring_status,
                   monitoring_enabled = excluded.monitoring_enabled,
                   check_attempts = excluded.check_attempts,
                   last_checked_at = excluded.last_checked_at,
                   updated_at = excluded.updated_at",
                params![
                    record.tenant_id,
                    record.hostname,
                    record.canonical_preference,
                    record.host_type.as_str(),
                    record.tier_eligible,
                    record.monitoring_status.as_str(),
                    record.monitoring_enabled,
                    record.check_attempts,
                    record.last_checked_at.map(|t| t.to_rfc3339()),
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .context("Failed to save tenant domain record")?;
            Ok(())
        })
    }

    fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }

        let conn = Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open domain DB: {}", self.db_path.display()))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tenant_domains (
                tenant_id            TEXT PRIMARY KEY,
                hostname             TEXT NOT NULL,
                canonical_preference TEXT NOT NULL,
                host_type            TEXT NOT NULL,
                tier_eligible        INTEGER NOT NULL DEFAULT 1,
                monitoring_status    TEXT NOT NULL DEFAULT 'inactive',
                monitoring_enabled   INTEGER NOT NULL DEFAULT 0,
                check_attempts       INTEGER NOT NULL DEFAULT 0,
                last_checked_at      TEXT,
                created_at           TEXT NOT NULL,
                updated_at           TEXT NOT NULL
            );",
        )
        .context("Failed to initialize tenant_domains schema")?;

        f(&conn)
    }
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid RFC3339 timestamp in domain DB: {raw}"))?;
    Ok(parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store(tmp: &TempDir) -> DomainStore {
        DomainStore::open(tmp.path().join("domains.db"))
    }

    #[test]
    fn get_missing_tenant_returns_none() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);
        assert!(store.get("nobody").unwrap().is_none());
    }

    #[test]
    fn save_and_get_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        let mut record = TenantDomainRecord::new("tenant-1", "Example.com", "apex");
        record.monitoring_enabled = true;
        store.save(&mut record).unwrap();

        let loaded = store.get("tenant-1").unwrap().unwrap();
        assert_eq!(loaded.hostname, "example.com");
        assert_eq!(loaded.canonical_preference, "apex");
        assert_eq!(loaded.host_type, HostType::CustomDomain);
        assert_eq!(loaded.monitoring_status, MonitoringStatus::Inactive);
        assert!(loaded.monitoring_enabled);
        assert_eq!(loaded.check_attempts, 0);
        assert!(loaded.last_checked_at.is_none());
    }

    #[test]
    fn save_overwrites_scalar_state_fields() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        let mut record = TenantDomainRecord::new("tenant-1", "example.com", "www");
        store.save(&mut record).unwrap();

        record.monitoring_status = MonitoringStatus::Monitoring;
        record.monitoring_enabled = true;
        record.check_attempts = 4;
        record.last_checked_at = Some(Utc::now());
        store.save(&mut record).unwrap();

        let loaded = store.get("tenant-1").unwrap().unwrap();
        assert_eq!(loaded.monitoring_status, MonitoringStatus::Monitoring);
        assert_eq!(loaded.check_attempts, 4);
        assert!(loaded.last_checked_at.is_some());
    }

    #[test]
    fn save_keeps_in_memory_updated_at_in_sync_with_the_row() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        let mut record = TenantDomainRecord::new("tenant-1", "example.com", "apex");
        let stamped_at_creation = record.updated_at;
        store.save(&mut record).unwrap();

        assert!(record.updated_at >= stamped_at_creation);
        let loaded = store.get("tenant-1").unwrap().unwrap();
        assert_eq!(loaded.updated_at, record.updated_at);
    }

    #[test]
    fn tenants_are_independent_rows() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        store
            .save(&mut TenantDomainRecord::new("a", "a.example.com", "apex"))
            .unwrap();
        store
            .save(&mut TenantDomainRecord::new("b", "b.example.com", "www"))
            .unwrap();

        assert_eq!(store.get("a").unwrap().unwrap().hostname, "a.example.com");
        assert_eq!(store.get("b").unwrap().unwrap().hostname, "b.example.com");
    }
}

//! In-process component health, marked by the runner as it ticks.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub updated_at: String,
    pub last_error: Option<String>,
    pub consecutive_failures: u64,
}

static REGISTRY: OnceLock<Mutex<BTreeMap<String, ComponentHealth>>> = OnceLock::new();

fn registry() -> &'static Mutex<BTreeMap<String, ComponentHealth>> {
    REGISTRY.get_or_init(|| Mutex::new(BTreeMap::new()))
}

fn upsert<F>(component: &str, update: F)
where
    F: FnOnce(&mut ComponentHealth),
{
    if let Ok(mut map) = registry().lock() {
        let entry = map
            .entry(component.to_string())
            .or_insert_with(|| ComponentHealth {
                status: "starting".into(),
                updated_at: Utc::now().to_rfc3339(),
                last_error: None,
                consecutive_failures: 0,
            });
        update(entry);
        entry.updated_at = Utc::now().to_rfc3339();
    }
}

pub fn mark_ok(component: &str) {
    upsert(component, |entry| {
        entry.status = "ok".into();
        entry.last_error = None;
        entry.consecutive_failures = 0;
    });
}

pub fn mark_error(component: &str, error: impl ToString) {
    let err = error.to_string();
    upsert(component, move |entry| {
        entry.status = "error".into();
        entry.last_error = Some(err);
        entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);
    });
}

pub fn snapshot_json() -> serde_json::Value {
    let components = registry()
        .lock()
        .map_or_else(|_| BTreeMap::new(), |map| map.clone());
    serde_json::json!({
        "pid": std::process::id(),
        "updated_at": Utc::now().to_rfc3339(),
        "components": components,
    })
}

/// Write the current snapshot where external tooling can read it.
pub fn write_snapshot(path: &Path) -> Result<()> {
    let rendered = serde_json::to_string_pretty(&snapshot_json())
        .context("Failed to render health snapshot")?;
    std::fs::write(path, rendered)
        .with_context(|| format!("Failed to write health snapshot: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn snapshot_file_is_readable_json_with_components() {
        mark_ok("snapshot-component");
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("health.json");
        write_snapshot(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["components"]["snapshot-component"]["status"], "ok");
        assert!(parsed["pid"].is_u64());
    }

    #[test]
    fn error_then_ok_resets_failure_streak() {
        mark_error("test-component", "boom");
        mark_error("test-component", "boom again");
        let snap = snapshot_json();
        let entry = &snap["components"]["test-component"];
        assert_eq!(entry["status"], "error");
        assert_eq!(entry["consecutive_failures"], 2);

        mark_ok("test-component");
        let snap = snapshot_json();
        let entry = &snap["components"]["test-component"];
        assert_eq!(entry["status"], "ok");
        assert_eq!(entry["consecutive_failures"], 0);
        assert!(entry["last_error"].is_null());
    }
}

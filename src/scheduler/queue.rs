use super::{Scheduler, WorkItem};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// A queued item pulled off the store, ready to dispatch.
#[derive(Debug, Clone)]
pub struct QueuedItem {
    pub id: String,
    pub item: WorkItem,
    pub run_at: DateTime<Utc>,
}

/// Sqlite-backed delayed work queue.
///
/// Rows are one-shot: the runner removes each row after dispatching it.
/// Recurrence is always the executed unit enqueueing a fresh row with a
/// future `run_at`.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    db_path: PathBuf,
}

impl WorkQueue {
    pub fn open(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Items whose `run_at` has passed, oldest first.
    pub fn due_items(&self, now: DateTime<Utc>) -> Result<Vec<QueuedItem>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, item, run_at FROM work_items
                 WHERE run_at <= ?1 ORDER BY run_at ASC",
            )?;

            let rows = stmt.query_map(params![now.to_rfc3339()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;

            let mut items = Vec::new();
            for row in rows {
                let (id, item_raw, run_at_raw) = row?;
                let item: WorkItem = serde_json::from_str(&item_raw)
                    .with_context(|| format!("Invalid work item payload in queue: {item_raw}"))?;
                items.push(QueuedItem {
                    id,
                    item,
                    run_at: parse_rfc3339(&run_at_raw)?,
                });
            }
            Ok(items)
        })
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM work_items WHERE id = ?1", params![id])
                .context("Failed to remove work item")?;
            Ok(())
        })
    }

    pub fn len(&self) -> Result<usize> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT COUNT(*) FROM work_items")?;
            let count: usize = stmt.query_row([], |row| row.get(0))?;
            Ok(count)
        })
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create queue directory: {}", parent.display())
            })?;
        }

        let conn = Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open work queue DB: {}", self.db_path.display()))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS work_items (
                id         TEXT PRIMARY KEY,
                item       TEXT NOT NULL,
                run_at     TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_work_items_run_at ON work_items(run_at);",
        )
        .context("Failed to initialize work queue schema")?;

        f(&conn)
    }
}

impl Scheduler for WorkQueue {
    fn enqueue(&self, item: WorkItem, delay: Duration) -> Result<()> {
        let now = Utc::now();
        let run_at = now
            + ChronoDuration::from_std(delay)
                .context("Enqueue delay out of range")?;
        let payload = serde_json::to_string(&item).context("Failed to encode work item")?;

        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO work_items (id, item, run_at, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    Uuid::new_v4().to_string(),
                    payload,
                    run_at.to_rfc3339(),
                    now.to_rfc3339()
                ],
            )
            .context("Failed to enqueue work item")?;
            Ok(())
        })?;

        tracing::debug!(
            unit = item.kind(),
            tenant = item.tenant_id(),
            delay_secs = delay.as_secs(),
            "enqueued work item"
        );
        Ok(())
    }
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid RFC3339 timestamp in work queue: {raw}"))?;
    Ok(parsed.with_timezone(&Utc))
}

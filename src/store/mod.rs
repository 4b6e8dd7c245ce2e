//! Record Store
//! Mission: SQLite-backed persistence for projects, tasks, shifts, and the
//! time-entry ledger
//!
//! One connection serialized behind a mutex. The ledger's start() is the
//! only operation that needs the serialization for correctness; everything
//! else just rides along. A partial unique index backstops the
//! one-open-entry-per-user invariant at the schema level.

pub mod ledger;
pub mod records;

use anyhow::{Context, Result};
use parking_lot::Mutex; // Faster than std::sync::Mutex
use rusqlite::Connection;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{Project, Shift, Task, TimeEntry};

/// Schema for domain records and the time-entry ledger
const SCHEMA_SQL: &str = r#"
-- Enable WAL mode for better concurrent access
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA temp_store = MEMORY;

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT,
    created_at TEXT NOT NULL
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    assigned_user_id TEXT,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL,
    priority INTEGER NOT NULL,
    due_date TEXT,
    created_at TEXT NOT NULL
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_tasks_project
    ON tasks(project_id, created_at DESC);

CREATE INDEX IF NOT EXISTS idx_tasks_assignee
    ON tasks(assigned_user_id) WHERE assigned_user_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS shifts (
    id TEXT PRIMARY KEY,
    shift_type TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    assigned_json TEXT NOT NULL
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS time_entries (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    project_id TEXT NOT NULL,
    task_id TEXT,
    description TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT
) WITHOUT ROWID;

-- At most one open entry per user, enforced by the schema itself
CREATE UNIQUE INDEX IF NOT EXISTS idx_open_entry_per_user
    ON time_entries(user_id) WHERE end_time IS NULL;

CREATE INDEX IF NOT EXISTS idx_time_entries_user
    ON time_entries(user_id, start_time DESC);

CREATE INDEX IF NOT EXISTS idx_time_entries_project
    ON time_entries(project_id, start_time DESC);
"#;

/// Domain record store
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database and apply the schema
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {}", db_path))?;

        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize database schema")?;

        // Verify WAL mode is active
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap_or_default();

        if journal_mode.to_lowercase() != "wal" {
            warn!("WAL mode not active, journal_mode = {}", journal_mode);
        }

        info!("Record store initialized at: {}", db_path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn lock(&self) -> parking_lot::MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    /// One consistent point-in-time view of every collection the
    /// statistics aggregator folds over. All reads happen under a single
    /// lock acquisition, so the counts can never disagree with each other.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let conn = self.lock();

        Ok(Snapshot {
            projects: records::query_projects(&conn)?,
            tasks: records::query_tasks(&conn)?,
            shifts: records::query_shifts(&conn)?,
            entries: ledger::query_entries(&conn)?,
        })
    }
}

/// Point-in-time view of the record collections
pub struct Snapshot {
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub shifts: Vec<Shift>,
    pub entries: Vec<TimeEntry>,
}

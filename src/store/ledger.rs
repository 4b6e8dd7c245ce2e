//! Time-Entry Ledger
//! Mission: Enforce the timer state machine - at most one open entry per
//! user, one-way stop transitions, owner-gated mutation
//!
//! Per user the ledger is a two-state machine: Closed (no open entry) ->
//! Open (exactly one entry with end_time NULL) -> Closed. start() is the
//! only transition racing with itself; it runs as a check-then-insert
//! inside one IMMEDIATE transaction under the connection mutex, with the
//! partial unique index as a second line of defense.

use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::models::Principal;
use crate::error::ApiError;
use crate::models::TimeEntry;
use crate::store::Database;

/// Fields for a new timer
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimeEntry {
    pub project_id: Uuid,
    pub task_id: Option<Uuid>,
    #[serde(default)]
    pub description: String,
}

/// Patch for an existing entry. Absent fields are left untouched.
/// `end_time` may only adjust an already-closed entry; open entries are
/// closed exclusively through stop().
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryPatch {
    pub project_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

const ENTRY_COLUMNS: &str = "id, user_id, project_id, task_id, description, start_time, end_time";

fn row_to_entry(row: &Row) -> rusqlite::Result<TimeEntry> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let project_id: String = row.get(2)?;
    let task_id: Option<String> = row.get(3)?;
    let start_time: String = row.get(5)?;
    let end_time: Option<String> = row.get(6)?;

    Ok(TimeEntry {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        user_id: Uuid::parse_str(&user_id).unwrap_or_default(),
        project_id: Uuid::parse_str(&project_id).unwrap_or_default(),
        task_id: task_id.and_then(|t| Uuid::parse_str(&t).ok()),
        description: row.get(4)?,
        start_time: parse_ts(&start_time),
        end_time: end_time.as_deref().map(parse_ts),
    })
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn query_entries(conn: &Connection) -> anyhow::Result<Vec<TimeEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM time_entries ORDER BY start_time DESC",
        ENTRY_COLUMNS
    ))?;
    let entries = stmt
        .query_map([], row_to_entry)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

fn fetch_entry(conn: &Connection, entry_id: &Uuid) -> Result<Option<TimeEntry>, ApiError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM time_entries WHERE id = ?1",
        ENTRY_COLUMNS
    ))?;
    match stmt.query_row(params![entry_id.to_string()], row_to_entry) {
        Ok(entry) => Ok(Some(entry)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Whether an owner-or-admin check passes for this entry
fn may_modify(entry: &TimeEntry, principal: &Principal) -> bool {
    entry.user_id == principal.user_id || principal.is_admin()
}

impl Database {
    /// Start a timer. Fails with Conflict if the user already has an open
    /// entry; the check and the insert commit atomically so concurrent
    /// starts cannot both succeed.
    pub fn start_entry(
        &self,
        user_id: Uuid,
        new: NewTimeEntry,
        now: DateTime<Utc>,
    ) -> Result<TimeEntry, ApiError> {
        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to begin transaction")?;

        let open_count: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM time_entries WHERE user_id = ?1 AND end_time IS NULL",
                params![user_id.to_string()],
                |row| row.get(0),
            )
            .context("Failed to check for open entry")?;

        if open_count > 0 {
            return Err(ApiError::conflict("open entry already exists"));
        }

        let entry = TimeEntry {
            id: Uuid::new_v4(),
            user_id,
            project_id: new.project_id,
            task_id: new.task_id,
            description: new.description,
            start_time: now,
            end_time: None,
        };

        let inserted = tx.execute(
            "INSERT INTO time_entries (id, user_id, project_id, task_id, description, start_time, end_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)",
            params![
                entry.id.to_string(),
                entry.user_id.to_string(),
                entry.project_id.to_string(),
                entry.task_id.map(|t| t.to_string()),
                entry.description,
                entry.start_time.to_rfc3339(),
            ],
        );

        match inserted {
            Ok(_) => {}
            // The partial unique index catches a start that slipped past
            // the count check; surface it as the same conflict.
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(ApiError::conflict("open entry already exists"));
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().context("Failed to commit start")?;

        info!("Timer started: user={} entry={}", user_id, entry.id);
        Ok(entry)
    }

    /// Stop a timer. Owner-only - there is no admin override for stop.
    /// One-way: a stopped entry can never be re-opened.
    pub fn stop_entry(
        &self,
        entry_id: &Uuid,
        requesting_user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<TimeEntry, ApiError> {
        let conn = self.lock();

        let mut entry = fetch_entry(&conn, entry_id)?
            .ok_or_else(|| ApiError::not_found("Time entry not found"))?;

        if entry.user_id != requesting_user_id {
            return Err(ApiError::forbidden("Cannot stop another user's timer"));
        }

        if entry.end_time.is_some() {
            return Err(ApiError::conflict("entry already stopped"));
        }

        if now < entry.start_time {
            return Err(ApiError::invalid_input(
                "Stop time precedes start time; check system clock",
            ));
        }

        conn.execute(
            "UPDATE time_entries SET end_time = ?1 WHERE id = ?2",
            params![now.to_rfc3339(), entry_id.to_string()],
        )
        .context("Failed to stop entry")?;

        entry.end_time = Some(now);
        info!(
            "Timer stopped: user={} entry={} seconds={}",
            requesting_user_id,
            entry_id,
            (now - entry.start_time).num_seconds()
        );
        Ok(entry)
    }

    /// Fetch one entry by id
    pub fn get_entry(&self, entry_id: &Uuid) -> Result<Option<TimeEntry>, ApiError> {
        let conn = self.lock();
        fetch_entry(&conn, entry_id)
    }

    /// All entries, newest first
    pub fn list_entries(&self) -> Result<Vec<TimeEntry>, ApiError> {
        let conn = self.lock();
        Ok(query_entries(&conn)?)
    }

    /// One user's entries, newest first
    pub fn list_entries_for_user(&self, user_id: Uuid) -> Result<Vec<TimeEntry>, ApiError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM time_entries WHERE user_id = ?1 ORDER BY start_time DESC",
            ENTRY_COLUMNS
        ))?;
        let entries = stmt
            .query_map(params![user_id.to_string()], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list entries")?;
        Ok(entries)
    }

    /// Patch an entry. Permitted for the owner or an Admin principal.
    /// The open/closed state cannot change here: stop() is the only way
    /// to close, and nothing re-opens.
    pub fn update_entry(
        &self,
        entry_id: &Uuid,
        principal: &Principal,
        patch: TimeEntryPatch,
    ) -> Result<TimeEntry, ApiError> {
        let conn = self.lock();

        let entry = fetch_entry(&conn, entry_id)?
            .ok_or_else(|| ApiError::not_found("Time entry not found"))?;

        if !may_modify(&entry, principal) {
            return Err(ApiError::forbidden("Cannot edit another user's time entry"));
        }

        if entry.is_open() && patch.end_time.is_some() {
            return Err(ApiError::invalid_input(
                "Open entries are closed via stop, not update",
            ));
        }

        let updated = TimeEntry {
            id: entry.id,
            user_id: entry.user_id,
            project_id: patch.project_id.unwrap_or(entry.project_id),
            task_id: patch.task_id.or(entry.task_id),
            description: patch.description.unwrap_or(entry.description),
            start_time: patch.start_time.unwrap_or(entry.start_time),
            end_time: patch.end_time.or(entry.end_time),
        };

        if let Some(end) = updated.end_time {
            if end < updated.start_time {
                return Err(ApiError::invalid_input(
                    "Entry would end before it starts",
                ));
            }
        }

        conn.execute(
            "UPDATE time_entries
             SET project_id = ?1, task_id = ?2, description = ?3, start_time = ?4, end_time = ?5
             WHERE id = ?6",
            params![
                updated.project_id.to_string(),
                updated.task_id.map(|t| t.to_string()),
                updated.description,
                updated.start_time.to_rfc3339(),
                updated.end_time.map(|t| t.to_rfc3339()),
                entry_id.to_string(),
            ],
        )
        .context("Failed to update entry")?;

        Ok(updated)
    }

    /// Delete an entry. Permitted for the owner or an Admin principal.
    pub fn delete_entry(&self, entry_id: &Uuid, principal: &Principal) -> Result<(), ApiError> {
        let conn = self.lock();

        let entry = fetch_entry(&conn, entry_id)?
            .ok_or_else(|| ApiError::not_found("Time entry not found"))?;

        if !may_modify(&entry, principal) {
            return Err(ApiError::forbidden(
                "Cannot delete another user's time entry",
            ));
        }

        conn.execute(
            "DELETE FROM time_entries WHERE id = ?1",
            params![entry_id.to_string()],
        )
        .context("Failed to delete entry")?;

        Ok(())
    }
}

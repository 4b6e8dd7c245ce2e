//! Domain Records
//! Mission: Ordinary CRUD for projects, tasks, and shifts
//!
//! No state machines here: task status changes via an explicit transition
//! call, and a shift's assignment set is replaced wholesale on update.

use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Project, ProjectStatus, Shift, ShiftType, Task, TaskStatus};
use crate::store::Database;

// ===== Row mappers =====

const PROJECT_COLUMNS: &str = "id, name, description, status, start_date, end_date, created_at";
const TASK_COLUMNS: &str =
    "id, project_id, assigned_user_id, title, description, status, priority, due_date, created_at";
const SHIFT_COLUMNS: &str = "id, shift_type, start_time, end_time, assigned_json";

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
    let id: String = row.get(0)?;
    let status: String = row.get(3)?;
    let start_date: String = row.get(4)?;
    let end_date: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;

    Ok(Project {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        name: row.get(1)?,
        description: row.get(2)?,
        status: ProjectStatus::from_str(&status).unwrap_or(ProjectStatus::Active),
        start_date: parse_ts(&start_date),
        end_date: end_date.as_deref().map(parse_ts),
        created_at: parse_ts(&created_at),
    })
}

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    let id: String = row.get(0)?;
    let project_id: String = row.get(1)?;
    let assigned: Option<String> = row.get(2)?;
    let status: String = row.get(5)?;
    let due_date: Option<String> = row.get(7)?;
    let created_at: String = row.get(8)?;

    Ok(Task {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        project_id: Uuid::parse_str(&project_id).unwrap_or_default(),
        assigned_user_id: assigned.and_then(|a| Uuid::parse_str(&a).ok()),
        title: row.get(3)?,
        description: row.get(4)?,
        status: TaskStatus::from_str(&status).unwrap_or(TaskStatus::Todo),
        priority: row.get(6)?,
        due_date: due_date.as_deref().map(parse_ts),
        created_at: parse_ts(&created_at),
    })
}

fn row_to_shift(row: &Row) -> rusqlite::Result<Shift> {
    let id: String = row.get(0)?;
    let shift_type: String = row.get(1)?;
    let start_time: String = row.get(2)?;
    let end_time: String = row.get(3)?;
    let assigned_json: String = row.get(4)?;

    Ok(Shift {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        shift_type: ShiftType::from_str(&shift_type).unwrap_or(ShiftType::Morning),
        start_time: parse_ts(&start_time),
        end_time: parse_ts(&end_time),
        assigned_employee_ids: serde_json::from_str(&assigned_json).unwrap_or_default(),
    })
}

pub(crate) fn query_projects(conn: &Connection) -> anyhow::Result<Vec<Project>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM projects ORDER BY created_at DESC",
        PROJECT_COLUMNS
    ))?;
    let projects = stmt
        .query_map([], row_to_project)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(projects)
}

pub(crate) fn query_tasks(conn: &Connection) -> anyhow::Result<Vec<Task>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM tasks ORDER BY created_at DESC",
        TASK_COLUMNS
    ))?;
    let tasks = stmt
        .query_map([], row_to_task)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

pub(crate) fn query_shifts(conn: &Connection) -> anyhow::Result<Vec<Shift>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM shifts ORDER BY start_time",
        SHIFT_COLUMNS
    ))?;
    let shifts = stmt
        .query_map([], row_to_shift)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(shifts)
}

// ===== Request types =====

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub project_id: Uuid,
    pub assigned_user_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<TaskStatus>,
    pub priority: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShift {
    pub shift_type: ShiftType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub assigned_employee_ids: Vec<Uuid>,
}

// ===== Projects =====

impl Database {
    pub fn create_project(&self, new: NewProject, now: DateTime<Utc>) -> Result<Project, ApiError> {
        let project = Project {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            status: new.status.unwrap_or(ProjectStatus::Active),
            start_date: new.start_date.unwrap_or(now),
            end_date: new.end_date,
            created_at: now,
        };

        let conn = self.lock();
        conn.execute(
            "INSERT INTO projects (id, name, description, status, start_date, end_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                project.id.to_string(),
                project.name,
                project.description,
                project.status.as_str(),
                project.start_date.to_rfc3339(),
                project.end_date.map(|t| t.to_rfc3339()),
                project.created_at.to_rfc3339(),
            ],
        )
        .context("Failed to insert project")?;

        Ok(project)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        let conn = self.lock();
        Ok(query_projects(&conn)?)
    }

    pub fn get_project(&self, project_id: &Uuid) -> Result<Option<Project>, ApiError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM projects WHERE id = ?1",
            PROJECT_COLUMNS
        ))?;
        match stmt.query_row(params![project_id.to_string()], row_to_project) {
            Ok(project) => Ok(Some(project)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn update_project(
        &self,
        project_id: &Uuid,
        patch: ProjectPatch,
    ) -> Result<Project, ApiError> {
        let existing = self
            .get_project(project_id)?
            .ok_or_else(|| ApiError::not_found("Project not found"))?;

        let updated = Project {
            id: existing.id,
            name: patch.name.unwrap_or(existing.name),
            description: patch.description.unwrap_or(existing.description),
            status: patch.status.unwrap_or(existing.status),
            start_date: patch.start_date.unwrap_or(existing.start_date),
            end_date: patch.end_date.or(existing.end_date),
            created_at: existing.created_at,
        };

        let conn = self.lock();
        conn.execute(
            "UPDATE projects SET name = ?1, description = ?2, status = ?3, start_date = ?4, end_date = ?5
             WHERE id = ?6",
            params![
                updated.name,
                updated.description,
                updated.status.as_str(),
                updated.start_date.to_rfc3339(),
                updated.end_date.map(|t| t.to_rfc3339()),
                project_id.to_string(),
            ],
        )
        .context("Failed to update project")?;

        Ok(updated)
    }

    pub fn delete_project(&self, project_id: &Uuid) -> Result<(), ApiError> {
        let conn = self.lock();
        let rows = conn
            .execute(
                "DELETE FROM projects WHERE id = ?1",
                params![project_id.to_string()],
            )
            .context("Failed to delete project")?;

        if rows == 0 {
            return Err(ApiError::not_found("Project not found"));
        }
        Ok(())
    }
}

// ===== Tasks =====

impl Database {
    pub fn create_task(&self, new: NewTask, now: DateTime<Utc>) -> Result<Task, ApiError> {
        // Referential sanity only: the parent project must exist
        if self.get_project(&new.project_id)?.is_none() {
            return Err(ApiError::not_found("Project not found"));
        }

        let task = Task {
            id: Uuid::new_v4(),
            project_id: new.project_id,
            assigned_user_id: new.assigned_user_id,
            title: new.title,
            description: new.description,
            status: new.status.unwrap_or(TaskStatus::Todo),
            priority: new.priority.unwrap_or(0),
            due_date: new.due_date,
            created_at: now,
        };

        let conn = self.lock();
        conn.execute(
            "INSERT INTO tasks (id, project_id, assigned_user_id, title, description, status, priority, due_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                task.id.to_string(),
                task.project_id.to_string(),
                task.assigned_user_id.map(|u| u.to_string()),
                task.title,
                task.description,
                task.status.as_str(),
                task.priority,
                task.due_date.map(|t| t.to_rfc3339()),
                task.created_at.to_rfc3339(),
            ],
        )
        .context("Failed to insert task")?;

        Ok(task)
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let conn = self.lock();
        Ok(query_tasks(&conn)?)
    }

    pub fn list_tasks_for_project(&self, project_id: &Uuid) -> Result<Vec<Task>, ApiError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tasks WHERE project_id = ?1 ORDER BY created_at DESC",
            TASK_COLUMNS
        ))?;
        let tasks = stmt
            .query_map(params![project_id.to_string()], row_to_task)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list tasks")?;
        Ok(tasks)
    }

    pub fn get_task(&self, task_id: &Uuid) -> Result<Option<Task>, ApiError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS))?;
        match stmt.query_row(params![task_id.to_string()], row_to_task) {
            Ok(task) => Ok(Some(task)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn update_task(&self, task_id: &Uuid, patch: TaskPatch) -> Result<Task, ApiError> {
        let existing = self
            .get_task(task_id)?
            .ok_or_else(|| ApiError::not_found("Task not found"))?;

        let updated = Task {
            title: patch.title.unwrap_or(existing.title),
            description: patch.description.unwrap_or(existing.description),
            priority: patch.priority.unwrap_or(existing.priority),
            due_date: patch.due_date.or(existing.due_date),
            ..existing
        };

        let conn = self.lock();
        conn.execute(
            "UPDATE tasks SET title = ?1, description = ?2, priority = ?3, due_date = ?4 WHERE id = ?5",
            params![
                updated.title,
                updated.description,
                updated.priority,
                updated.due_date.map(|t| t.to_rfc3339()),
                task_id.to_string(),
            ],
        )
        .context("Failed to update task")?;

        Ok(updated)
    }

    /// Explicit status transition. The ledger never touches task status.
    pub fn set_task_status(&self, task_id: &Uuid, status: TaskStatus) -> Result<Task, ApiError> {
        let existing = self
            .get_task(task_id)?
            .ok_or_else(|| ApiError::not_found("Task not found"))?;

        let conn = self.lock();
        conn.execute(
            "UPDATE tasks SET status = ?1 WHERE id = ?2",
            params![status.as_str(), task_id.to_string()],
        )
        .context("Failed to set task status")?;

        Ok(Task { status, ..existing })
    }

    /// Set or clear the task's assignee
    pub fn assign_task(
        &self,
        task_id: &Uuid,
        assigned_user_id: Option<Uuid>,
    ) -> Result<Task, ApiError> {
        let existing = self
            .get_task(task_id)?
            .ok_or_else(|| ApiError::not_found("Task not found"))?;

        let conn = self.lock();
        conn.execute(
            "UPDATE tasks SET assigned_user_id = ?1 WHERE id = ?2",
            params![
                assigned_user_id.map(|u| u.to_string()),
                task_id.to_string()
            ],
        )
        .context("Failed to assign task")?;

        Ok(Task {
            assigned_user_id,
            ..existing
        })
    }

    pub fn delete_task(&self, task_id: &Uuid) -> Result<(), ApiError> {
        let conn = self.lock();
        let rows = conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![task_id.to_string()])
            .context("Failed to delete task")?;

        if rows == 0 {
            return Err(ApiError::not_found("Task not found"));
        }
        Ok(())
    }
}

// ===== Shifts =====

impl Database {
    pub fn create_shift(&self, new: NewShift) -> Result<Shift, ApiError> {
        if new.end_time < new.start_time {
            return Err(ApiError::invalid_input("Shift would end before it starts"));
        }

        let shift = Shift {
            id: Uuid::new_v4(),
            shift_type: new.shift_type,
            start_time: new.start_time,
            end_time: new.end_time,
            assigned_employee_ids: new.assigned_employee_ids,
        };

        let assigned_json = serde_json::to_string(&shift.assigned_employee_ids)
            .context("Failed to serialize assignments")?;

        let conn = self.lock();
        conn.execute(
            "INSERT INTO shifts (id, shift_type, start_time, end_time, assigned_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                shift.id.to_string(),
                shift.shift_type.as_str(),
                shift.start_time.to_rfc3339(),
                shift.end_time.to_rfc3339(),
                assigned_json,
            ],
        )
        .context("Failed to insert shift")?;

        Ok(shift)
    }

    pub fn list_shifts(&self) -> Result<Vec<Shift>, ApiError> {
        let conn = self.lock();
        Ok(query_shifts(&conn)?)
    }

    /// Full replacement, including the assignment set - no incremental
    /// add/remove semantics.
    pub fn update_shift(&self, shift_id: &Uuid, new: NewShift) -> Result<Shift, ApiError> {
        if new.end_time < new.start_time {
            return Err(ApiError::invalid_input("Shift would end before it starts"));
        }

        let assigned_json = serde_json::to_string(&new.assigned_employee_ids)
            .context("Failed to serialize assignments")?;

        let conn = self.lock();
        let rows = conn
            .execute(
                "UPDATE shifts SET shift_type = ?1, start_time = ?2, end_time = ?3, assigned_json = ?4
                 WHERE id = ?5",
                params![
                    new.shift_type.as_str(),
                    new.start_time.to_rfc3339(),
                    new.end_time.to_rfc3339(),
                    assigned_json,
                    shift_id.to_string(),
                ],
            )
            .context("Failed to update shift")?;

        if rows == 0 {
            return Err(ApiError::not_found("Shift not found"));
        }

        Ok(Shift {
            id: *shift_id,
            shift_type: new.shift_type,
            start_time: new.start_time,
            end_time: new.end_time,
            assigned_employee_ids: new.assigned_employee_ids,
        })
    }

    pub fn delete_shift(&self, shift_id: &Uuid) -> Result<(), ApiError> {
        let conn = self.lock();
        let rows = conn
            .execute(
                "DELETE FROM shifts WHERE id = ?1",
                params![shift_id.to_string()],
            )
            .context("Failed to delete shift")?;

        if rows == 0 {
            return Err(ApiError::not_found("Shift not found"));
        }
        Ok(())
    }
}

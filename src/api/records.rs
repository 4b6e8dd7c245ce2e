//! Record Endpoints
//! Mission: Gated CRUD for projects, tasks, and shifts
//!
//! Reads are open to any authenticated principal; writes require the
//! Admin capability, except task status transitions and assignment,
//! which any authenticated principal may perform.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{require_admin_cap, AppState};
use crate::auth::models::Principal;
use crate::error::ApiError;
use crate::models::{Project, Shift, Task, TaskStatus};
use crate::store::records::{NewProject, NewShift, NewTask, ProjectPatch, TaskPatch};

// ===== Projects =====

pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(state.db.list_projects()?))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
    state
        .db
        .get_project(&project_id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Project not found"))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<NewProject>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    require_admin_cap(&principal)?;
    let project = state.db.create_project(payload, Utc::now())?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<Uuid>,
    Json(patch): Json<ProjectPatch>,
) -> Result<Json<Project>, ApiError> {
    require_admin_cap(&principal)?;
    Ok(Json(state.db.update_project(&project_id, patch)?))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_admin_cap(&principal)?;
    state.db.delete_project(&project_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Tasks =====

pub async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.db.list_tasks()?))
}

pub async fn list_project_tasks(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.db.list_tasks_for_project(&project_id)?))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    require_admin_cap(&principal)?;
    let task = state.db.create_task(payload, Utc::now())?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, ApiError> {
    require_admin_cap(&principal)?;
    Ok(Json(state.db.update_task(&task_id, patch)?))
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: TaskStatus,
}

/// Explicit status transition - PUT /tasks/:id/status
pub async fn set_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<SetStatusRequest>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(state.db.set_task_status(&task_id, payload.status)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTaskRequest {
    pub user_id: Option<Uuid>,
}

/// Set or clear the assignee - PUT /tasks/:id/assign
pub async fn assign_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<AssignTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(state.db.assign_task(&task_id, payload.user_id)?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_admin_cap(&principal)?;
    state.db.delete_task(&task_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ===== Shifts =====

pub async fn list_shifts(State(state): State<AppState>) -> Result<Json<Vec<Shift>>, ApiError> {
    Ok(Json(state.db.list_shifts()?))
}

pub async fn create_shift(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<NewShift>,
) -> Result<(StatusCode, Json<Shift>), ApiError> {
    require_admin_cap(&principal)?;
    let shift = state.db.create_shift(payload)?;
    Ok((StatusCode::CREATED, Json(shift)))
}

/// Full replacement, assignment set included - PUT /shifts/:id
pub async fn update_shift(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(shift_id): Path<Uuid>,
    Json(payload): Json<NewShift>,
) -> Result<Json<Shift>, ApiError> {
    require_admin_cap(&principal)?;
    Ok(Json(state.db.update_shift(&shift_id, payload)?))
}

pub async fn delete_shift(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(shift_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_admin_cap(&principal)?;
    state.db.delete_shift(&shift_id)?;
    Ok(StatusCode::NO_CONTENT)
}

//! Time-Entry Endpoints
//! Mission: Expose the ledger's start/stop/edit operations over HTTP
//!
//! Handlers stamp `now` once at the boundary and hand it to the ledger,
//! which owns every precondition check.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::api::{require_admin_cap, AppState};
use crate::auth::models::Principal;
use crate::error::ApiError;
use crate::models::TimeEntry;
use crate::store::ledger::{NewTimeEntry, TimeEntryPatch};

#[derive(Serialize)]
pub struct EntriesResponse {
    pub count: usize,
    pub entries: Vec<TimeEntry>,
}

/// Start a timer - POST /timeentries
pub async fn start_entry(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<NewTimeEntry>,
) -> Result<(StatusCode, Json<TimeEntry>), ApiError> {
    let entry = state
        .db
        .start_entry(principal.user_id, payload, Utc::now())?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Stop a timer - PUT /timeentries/:id/stop
pub async fn stop_entry(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(entry_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.stop_entry(&entry_id, principal.user_id, Utc::now())?;
    Ok(StatusCode::NO_CONTENT)
}

/// All entries - GET /timeentries (Admin only)
pub async fn list_entries(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<EntriesResponse>, ApiError> {
    require_admin_cap(&principal)?;

    let entries = state.db.list_entries()?;
    Ok(Json(EntriesResponse {
        count: entries.len(),
        entries,
    }))
}

/// One user's entries - GET /timeentries/user/:id (owner or Admin)
pub async fn list_user_entries(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<EntriesResponse>, ApiError> {
    if user_id != principal.user_id {
        require_admin_cap(&principal)?;
    }

    let entries = state.db.list_entries_for_user(user_id)?;
    Ok(Json(EntriesResponse {
        count: entries.len(),
        entries,
    }))
}

/// Edit an entry - PUT /timeentries/:id (owner or Admin)
pub async fn update_entry(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(entry_id): Path<Uuid>,
    Json(patch): Json<TimeEntryPatch>,
) -> Result<Json<TimeEntry>, ApiError> {
    let entry = state.db.update_entry(&entry_id, &principal, patch)?;
    Ok(Json(entry))
}

/// Delete an entry - DELETE /timeentries/:id (owner or Admin)
pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(entry_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.delete_entry(&entry_id, &principal)?;
    Ok(StatusCode::NO_CONTENT)
}

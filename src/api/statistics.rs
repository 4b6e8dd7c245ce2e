//! Statistics Endpoint
//! Mission: Serve the admin summary report

use axum::{extract::State, Json};

use crate::api::AppState;
use crate::error::ApiError;
use crate::stats::{compute_statistics, StatisticsResponse};

/// Admin dashboard statistics - GET /statistics (Admin only, enforced by
/// the route-level guard). Recomputed from one store snapshot per call.
pub async fn get_statistics(
    State(state): State<AppState>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let users = state.auth.user_store.list_users()?;
    let snapshot = state.db.snapshot()?;

    Ok(Json(compute_statistics(&users, &snapshot)))
}

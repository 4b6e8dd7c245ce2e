//! Route Table
//! Mission: Wire the explicit middleware pipeline - verifier, guard,
//! handler - with no hidden global chain

use axum::{
    extract::FromRef,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::api::{records, statistics, timeentries};
use crate::auth::{api as auth_api, auth_middleware, require_admin, AuthState, JwtHandler};
use crate::middleware::logging::request_logging;
use crate::store::Database;
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: AuthState,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> AuthState {
        state.auth.clone()
    }
}

impl FromRef<AppState> for Arc<JwtHandler> {
    fn from_ref(state: &AppState) -> Arc<JwtHandler> {
        state.auth.jwt_handler.clone()
    }
}

/// Create the API router.
///
/// Three tiers: public (login, register, health), protected (token
/// verifier layer), admin (verifier layer + admin guard layer). Layers
/// run outermost-last, so every admin route authenticates before it
/// authorizes.
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/login", post(auth_api::login))
        .route("/api/auth/register", post(auth_api::register));

    let admin_routes = Router::new()
        .route("/statistics", get(statistics::get_statistics))
        .route(
            "/api/admin/users",
            get(auth_api::list_users).post(auth_api::create_user),
        )
        .route("/api/admin/users/:id", delete(auth_api::delete_user))
        .route("/api/admin/users/:id/active", put(auth_api::set_user_active))
        .route_layer(middleware::from_fn(require_admin));

    let protected_routes = Router::new()
        .route("/users/me", get(auth_api::get_current_user))
        .route(
            "/timeentries",
            get(timeentries::list_entries).post(timeentries::start_entry),
        )
        .route("/timeentries/user/:id", get(timeentries::list_user_entries))
        .route("/timeentries/:id/stop", put(timeentries::stop_entry))
        .route(
            "/timeentries/:id",
            put(timeentries::update_entry).delete(timeentries::delete_entry),
        )
        .route(
            "/projects",
            get(records::list_projects).post(records::create_project),
        )
        .route(
            "/projects/:id",
            get(records::get_project)
                .put(records::update_project)
                .delete(records::delete_project),
        )
        .route("/tasks", get(records::list_tasks).post(records::create_task))
        .route("/tasks/project/:id", get(records::list_project_tasks))
        .route(
            "/tasks/:id",
            put(records::update_task).delete(records::delete_task),
        )
        .route("/tasks/:id/status", put(records::set_task_status))
        .route("/tasks/:id/assign", put(records::assign_task))
        .route(
            "/shifts",
            get(records::list_shifts).post(records::create_shift),
        )
        .route(
            "/shifts/:id",
            put(records::update_shift).delete(records::delete_shift),
        )
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ===== Health =====

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

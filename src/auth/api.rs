//! Authentication API Endpoints
//! Mission: Login, registration, and admin user management

use crate::auth::{
    jwt::JwtHandler,
    models::{
        LoginRequest, LoginResponse, Principal, RegisterRequest, Role, UserResponse,
    },
    user_store::UserStore,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub user_store: Arc<UserStore>,
    pub jwt_handler: Arc<JwtHandler>,
}

impl AuthState {
    pub fn new(user_store: Arc<UserStore>, jwt_handler: Arc<JwtHandler>) -> Self {
        Self {
            user_store,
            jwt_handler,
        }
    }
}

/// Login endpoint - POST /api/auth/login
pub async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    info!("Login attempt: {}", payload.username);

    // Unknown username, wrong password, and deactivated account all
    // collapse into the same generic failure.
    let user = state
        .user_store
        .authenticate(&payload.username, &payload.password)
        .map_err(|_| AuthApiError::InternalError)?
        .filter(|u| u.is_active)
        .ok_or_else(|| {
            warn!("Failed login attempt: {}", payload.username);
            AuthApiError::InvalidCredentials
        })?;

    let (token, expires_in) = state
        .jwt_handler
        .issue_token(&user)
        .map_err(|_| AuthApiError::InternalError)?;

    info!("Login successful: {} ({})", user.username, user.role.as_str());

    Ok(Json(LoginResponse {
        token,
        expires_in,
        role: user.role,
        user: UserResponse::from_user(&user),
    }))
}

/// Self-service registration - POST /api/auth/register
/// Always creates an Employee-role account and logs it in.
pub async fn register(
    State(state): State<AuthState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AuthApiError> {
    if payload.password.len() < 8 {
        return Err(AuthApiError::WeakPassword);
    }

    let user = state
        .user_store
        .create_user(
            &payload.username,
            &payload.password,
            &payload.first_name,
            &payload.last_name,
            Role::Employee,
        )
        .map_err(|e| {
            warn!("Failed to register user: {}", e);
            AuthApiError::UserAlreadyExists
        })?;

    let (token, expires_in) = state
        .jwt_handler
        .issue_token(&user)
        .map_err(|_| AuthApiError::InternalError)?;

    info!("Registered user: {}", user.username);

    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            token,
            expires_in,
            role: user.role,
            user: UserResponse::from_user(&user),
        }),
    ))
}

/// Profile response derived from the request principal
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: Uuid,
    pub display_name: String,
    pub role: Role,
}

/// Current user profile - GET /users/me
/// Built entirely from the verified token claims; no store lookup.
pub async fn get_current_user(Extension(principal): Extension<Principal>) -> Json<MeResponse> {
    Json(MeResponse {
        id: principal.user_id,
        display_name: principal.display_name,
        role: principal.role,
    })
}

/// List all users - GET /api/admin/users (Admin only)
pub async fn list_users(
    State(state): State<AuthState>,
) -> Result<Json<Vec<UserResponse>>, AuthApiError> {
    let users = state
        .user_store
        .list_users()
        .map_err(|_| AuthApiError::InternalError)?;

    let response: Vec<UserResponse> = users.iter().map(UserResponse::from_user).collect();

    Ok(Json(response))
}

/// Create user request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// Create user - POST /api/admin/users (Admin only)
pub async fn create_user(
    State(state): State<AuthState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AuthApiError> {
    if payload.password.len() < 8 {
        return Err(AuthApiError::WeakPassword);
    }

    let user = state
        .user_store
        .create_user(
            &payload.username,
            &payload.password,
            &payload.first_name,
            &payload.last_name,
            payload.role,
        )
        .map_err(|e| {
            warn!("Failed to create user: {}", e);
            AuthApiError::UserAlreadyExists
        })?;

    Ok((StatusCode::CREATED, Json(UserResponse::from_user(&user))))
}

/// Activation patch body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// Activate/deactivate a user - PUT /api/admin/users/:id/active (Admin only)
pub async fn set_user_active(
    State(state): State<AuthState>,
    Path(user_id): Path<String>,
    Json(payload): Json<SetActiveRequest>,
) -> Result<StatusCode, AuthApiError> {
    let uuid = Uuid::parse_str(&user_id).map_err(|_| AuthApiError::InvalidUserId)?;

    state
        .user_store
        .set_active(&uuid, payload.is_active)
        .map_err(|_| AuthApiError::UserNotFound)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Delete user - DELETE /api/admin/users/:id (Admin only)
pub async fn delete_user(
    State(state): State<AuthState>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AuthApiError> {
    let uuid = Uuid::parse_str(&user_id).map_err(|_| AuthApiError::InvalidUserId)?;

    // Don't allow deleting yourself
    if uuid == principal.user_id {
        return Err(AuthApiError::CannotDeleteSelf);
    }

    state
        .user_store
        .delete_user(&uuid)
        .map_err(|_| AuthApiError::UserNotFound)?;

    info!("User deleted: {}", user_id);

    Ok(StatusCode::NO_CONTENT)
}

/// Auth API errors
#[derive(Debug)]
pub enum AuthApiError {
    InvalidCredentials,
    UserNotFound,
    UserAlreadyExists,
    WeakPassword,
    InvalidUserId,
    CannotDeleteSelf,
    InternalError,
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid username or password")
            }
            AuthApiError::UserNotFound => (StatusCode::NOT_FOUND, "User not found"),
            AuthApiError::UserAlreadyExists => (StatusCode::CONFLICT, "Username already exists"),
            AuthApiError::WeakPassword => (
                StatusCode::BAD_REQUEST,
                "Password must be at least 8 characters",
            ),
            AuthApiError::InvalidUserId => (StatusCode::BAD_REQUEST, "Invalid user ID format"),
            AuthApiError::CannotDeleteSelf => {
                (StatusCode::BAD_REQUEST, "Cannot delete your own account")
            }
            AuthApiError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::User;
    use chrono::Utc;

    #[test]
    fn test_user_response_from_user() {
        let user = User {
            id: Uuid::new_v4(),
            username: "testuser".to_string(),
            password_hash: "hash123".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role: Role::Employee,
            is_active: true,
            created_at: Utc::now(),
        };

        let response = UserResponse::from_user(&user);
        assert_eq!(response.username, "testuser");
        assert_eq!(response.role, Role::Employee);

        // Password hash must not leak through serialization
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("hash123"));
    }

    #[test]
    fn test_auth_api_error_responses() {
        let invalid_creds = AuthApiError::InvalidCredentials.into_response();
        assert_eq!(invalid_creds.status(), StatusCode::UNAUTHORIZED);

        let not_found = AuthApiError::UserNotFound.into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let conflict = AuthApiError::UserAlreadyExists.into_response();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let weak = AuthApiError::WeakPassword.into_response();
        assert_eq!(weak.status(), StatusCode::BAD_REQUEST);
    }
}

//! Authentication Middleware
//! Mission: Verify tokens and gate role-restricted routes

use crate::auth::{
    jwt::JwtHandler,
    models::{Principal, Role},
};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Token verifier layer. Runs on every protected request: extracts the
/// bearer token, checks signature and expiry, and stores the resulting
/// [`Principal`] in request extensions for downstream handlers.
///
/// Purely a function of (token, server secret, now) - no store lookup.
pub async fn auth_middleware(
    State(jwt_handler): State<Arc<JwtHandler>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|t| t.to_string())
        .ok_or(AuthError::MissingToken)?;

    let claims = jwt_handler
        .verify_token(&token)
        .map_err(|_| AuthError::InvalidToken)?;

    let principal = Principal::from_claims(&claims).ok_or(AuthError::InvalidToken)?;
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Authorization guard layer for Admin-only routes. Layered after
/// [`auth_middleware`], so a missing principal is a wiring bug surfaced
/// as an authentication failure rather than a panic.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AuthError> {
    let principal = extract_principal(&req).ok_or(AuthError::MissingToken)?;

    match principal.role {
        Role::Admin => Ok(next.run(req).await),
        Role::Employee => Err(AuthError::Forbidden),
    }
}

/// Extract the authenticated principal from a request (use after auth middleware)
pub fn extract_principal(req: &Request) -> Option<&Principal> {
    req.extensions().get::<Principal>()
}

/// Auth error types
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    Forbidden,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // 401s share one message: the caller must not learn whether the
        // token was missing, malformed, expired, or forged.
        let (status, message) = match self {
            AuthError::MissingToken | AuthError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "Authentication required")
            }
            AuthError::Forbidden => (StatusCode::FORBIDDEN, "Insufficient permissions"),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest};
    use uuid::Uuid;

    #[test]
    fn test_auth_error_responses() {
        let missing = AuthError::MissingToken.into_response();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let invalid = AuthError::InvalidToken.into_response();
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);

        let forbidden = AuthError::Forbidden.into_response();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_extract_principal_from_request() {
        let mut req = HttpRequest::new(Body::empty());

        // No principal until the verifier has run
        assert!(extract_principal(&req).is_none());

        let principal = Principal {
            user_id: Uuid::new_v4(),
            role: Role::Employee,
            display_name: "Test User".to_string(),
        };
        req.extensions_mut().insert(principal.clone());

        let extracted = extract_principal(&req);
        assert!(extracted.is_some());
        assert_eq!(extracted.unwrap().display_name, "Test User");
    }
}

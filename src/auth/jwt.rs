//! JWT Token Handler
//! Mission: Mint and verify signed, time-bounded identity tokens

use crate::auth::models::{Claims, User};
use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

/// Token lifetime. The upstream system disagreed with itself (one login
/// path used an hour, another a day); this constant is the single
/// authoritative value.
pub const TOKEN_TTL_HOURS: i64 = 1;

/// JWT Handler for token operations
pub struct JwtHandler {
    secret: String,
    ttl_hours: i64,
}

impl JwtHandler {
    /// Create a new JWT handler with the server-held signing secret
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            ttl_hours: TOKEN_TTL_HOURS,
        }
    }

    /// Issue a signed token for a verified user
    pub fn issue_token(&self, user: &User) -> Result<(String, usize)> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(chrono::Duration::hours(self.ttl_hours))
            .context("Invalid timestamp")?
            .timestamp() as usize;

        let expires_in = (self.ttl_hours * 3600) as usize;

        let claims = Claims {
            sub: user.id.to_string(),
            name: user.display_name(),
            role: user.role,
            iat: now.timestamp() as usize,
            exp: expiration,
        };

        debug!(
            "Issuing JWT for user {} ({}), expires in {}h",
            user.username, user.id, self.ttl_hours
        );

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to sign JWT")?;

        Ok((token, expires_in))
    }

    /// Verify a presented token and extract its claims.
    /// Checks both the HMAC signature and the expiry; callers never learn
    /// which of the two failed.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .context("Invalid or expired token")?;

        Ok(decoded.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use uuid::Uuid;

    fn create_test_user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            username: "testuser".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let handler = JwtHandler::new("test-secret-key-12345".to_string());
        let user = create_test_user(Role::Employee);

        let (token, expires_in) = handler.issue_token(&user).unwrap();
        assert!(!token.is_empty());
        assert_eq!(expires_in, (TOKEN_TTL_HOURS * 3600) as usize);

        let claims = handler.verify_token(&token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.name, "Test User");
        assert_eq!(claims.role, Role::Employee);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_garbage_token_rejected() {
        let handler = JwtHandler::new("test-secret-key-12345".to_string());

        let result = handler.verify_token("invalid.token.here");
        assert!(result.is_err());
    }

    #[test]
    fn test_different_secrets_reject() {
        let handler1 = JwtHandler::new("secret1".to_string());
        let handler2 = JwtHandler::new("secret2".to_string());
        let user = create_test_user(Role::Admin);

        let (token, _) = handler1.issue_token(&user).unwrap();

        let result = handler2.verify_token(&token);
        assert!(result.is_err());
    }

    #[test]
    fn test_expired_token_rejected_despite_valid_signature() {
        let handler = JwtHandler::new("test-secret-key-12345".to_string());
        let user = create_test_user(Role::Employee);

        // Sign claims that expired two hours ago with the handler's own
        // secret; the signature verifies but the expiry check must fail.
        // (jsonwebtoken's default validation allows 60s of leeway.)
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user.id.to_string(),
            name: user.display_name(),
            role: user.role,
            iat: now - 3 * 3600,
            exp: now - 2 * 3600,
        };
        let stale = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test-secret-key-12345".as_bytes()),
        )
        .unwrap();

        assert!(handler.verify_token(&stale).is_err());
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let handler = JwtHandler::new("test-secret-key-12345".to_string());

        let (employee_token, _) = handler
            .issue_token(&create_test_user(Role::Employee))
            .unwrap();
        let (admin_token, _) = handler.issue_token(&create_test_user(Role::Admin)).unwrap();

        // Graft the admin claims segment onto the employee token's
        // signature: a privilege-escalation splice.
        let employee_parts: Vec<&str> = employee_token.split('.').collect();
        let admin_parts: Vec<&str> = admin_token.split('.').collect();
        let spliced = format!(
            "{}.{}.{}",
            employee_parts[0], admin_parts[1], employee_parts[2]
        );

        assert!(handler.verify_token(&spliced).is_err());
    }
}

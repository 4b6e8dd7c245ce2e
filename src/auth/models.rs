//! Authentication Models
//! Mission: Define user, role, and token claim structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// User roles for RBAC. Closed set: the guard's policy match is exhaustive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin, // Full access, including statistics and record management
    #[serde(rename = "employee")]
    Employee, // Own timers and record reads
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "employee" => Some(Role::Employee),
            _ => None,
        }
    }
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // subject (user id)
    pub name: String,
    pub role: Role,
    pub iat: usize, // issued-at timestamp
    pub exp: usize, // expiration timestamp
}

/// The authenticated identity for one request. Decoded from valid token
/// claims by the verifier middleware, carried in request extensions,
/// never persisted.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
    pub display_name: String,
}

impl Principal {
    /// A claims `sub` that is not a UUID means the token was not minted
    /// by this issuer, so the caller treats it as invalid.
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        let user_id = Uuid::parse_str(&claims.sub).ok()?;
        Some(Self {
            user_id,
            role: claims.role,
            display_name: claims.name.clone(),
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Self-service registration request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: usize, // seconds until expiration
    pub role: Role,
    pub user: UserResponse,
}

/// User response (sanitized)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_active: bool,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            is_active: user.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        let admin = Role::Admin;
        let json = serde_json::to_string(&admin).unwrap();
        assert_eq!(json, r#""admin""#);

        let employee: Role = serde_json::from_str(r#""employee""#).unwrap();
        assert_eq!(employee, Role::Employee);
    }

    #[test]
    fn test_role_string_conversion() {
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::Employee.as_str(), "employee");

        assert_eq!(Role::from_str("admin"), Some(Role::Admin));
        assert_eq!(Role::from_str("EMPLOYEE"), Some(Role::Employee));
        assert_eq!(Role::from_str("manager"), None);
    }

    #[test]
    fn test_principal_from_claims() {
        let user_id = Uuid::new_v4();
        let claims = Claims {
            sub: user_id.to_string(),
            name: "Ada Lovelace".to_string(),
            role: Role::Employee,
            iat: 0,
            exp: 1234567890,
        };

        let principal = Principal::from_claims(&claims).unwrap();
        assert_eq!(principal.user_id, user_id);
        assert_eq!(principal.role, Role::Employee);
        assert_eq!(principal.display_name, "Ada Lovelace");
        assert!(!principal.is_admin());
    }

    #[test]
    fn test_principal_rejects_malformed_subject() {
        let claims = Claims {
            sub: "not-a-uuid".to_string(),
            name: "Mallory".to_string(),
            role: Role::Admin,
            iat: 0,
            exp: 1234567890,
        };

        assert!(Principal::from_claims(&claims).is_none());
    }

    #[test]
    fn test_password_hash_never_serializes() {
        let user = User {
            id: Uuid::new_v4(),
            username: "ada".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            role: Role::Employee,
            is_active: true,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("passwordHash"));
    }
}

//! User Storage
//! Mission: Store user accounts and verify credentials with SQLite + bcrypt

use crate::auth::models::{Role, User};
use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::{info, warn};
use uuid::Uuid;

/// User storage with SQLite backend
pub struct UserStore {
    db_path: String,
}

impl UserStore {
    /// Create a new user store and initialize database
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_db(&self) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                role TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        // Create default admin user if none exists
        self.create_default_admin(&conn)?;

        Ok(())
    }

    /// Create default admin user for initial setup
    fn create_default_admin(&self, conn: &Connection) -> Result<()> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE role = 'admin'",
                [],
                |row| row.get(0),
            )
            .context("Failed to check for admin users")?;

        if count == 0 {
            let password_hash =
                hash("admin123", DEFAULT_COST).context("Failed to hash password")?;

            let admin = User {
                id: Uuid::new_v4(),
                username: "admin".to_string(),
                password_hash,
                first_name: "System".to_string(),
                last_name: "Admin".to_string(),
                role: Role::Admin,
                is_active: true,
                created_at: Utc::now(),
            };

            self.insert_user(conn, &admin)?;

            info!("Default admin user created (username: admin, password: admin123)");
            warn!("CHANGE DEFAULT PASSWORD IN PRODUCTION!");
        }

        Ok(())
    }

    fn insert_user(&self, conn: &Connection, user: &User) -> Result<()> {
        conn.execute(
            "INSERT INTO users (id, username, password_hash, first_name, last_name, role, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id.to_string(),
                user.username,
                user.password_hash,
                user.first_name,
                user.last_name,
                user.role.as_str(),
                user.is_active as i64,
                user.created_at.to_rfc3339(),
            ],
        )
        .context("Failed to insert user")?;
        Ok(())
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        let id_str: String = row.get(0)?;
        let role_str: String = row.get(5)?;
        let created_str: String = row.get(7)?;
        Ok(User {
            id: Uuid::parse_str(&id_str).unwrap_or_default(),
            username: row.get(1)?,
            password_hash: row.get(2)?,
            first_name: row.get(3)?,
            last_name: row.get(4)?,
            role: Role::from_str(&role_str).unwrap_or(Role::Employee),
            is_active: row.get::<_, i64>(6)? != 0,
            created_at: DateTime::parse_from_rfc3339(&created_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }

    const USER_COLUMNS: &'static str =
        "id, username, password_hash, first_name, last_name, role, is_active, created_at";

    /// Get user by username
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = Connection::open(&self.db_path)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE username = ?1",
            Self::USER_COLUMNS
        ))?;

        match stmt.query_row(params![username], Self::row_to_user) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get user by id
    pub fn get_user_by_id(&self, user_id: &Uuid) -> Result<Option<User>> {
        let conn = Connection::open(&self.db_path)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE id = ?1",
            Self::USER_COLUMNS
        ))?;

        match stmt.query_row(params![user_id.to_string()], Self::row_to_user) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Verify a username/password pair. Returns the matching user only if
    /// the bcrypt comparison succeeds; an unknown username and a wrong
    /// password are indistinguishable to the caller.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        match self.get_user_by_username(username)? {
            Some(user) => {
                let valid =
                    verify(password, &user.password_hash).context("Failed to verify password")?;
                if valid {
                    Ok(Some(user))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    /// Create a new user
    pub fn create_user(
        &self,
        username: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        role: Role,
    ) -> Result<User> {
        let password_hash = hash(password, DEFAULT_COST).context("Failed to hash password")?;

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role,
            is_active: true,
            created_at: Utc::now(),
        };

        let conn = Connection::open(&self.db_path)?;
        self.insert_user(&conn, &user)?;

        info!("Created user: {} ({})", user.username, user.role.as_str());

        Ok(user)
    }

    /// List all users (admin only)
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = Connection::open(&self.db_path)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY username",
            Self::USER_COLUMNS
        ))?;

        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Mark a user active or inactive without touching credentials
    pub fn set_active(&self, user_id: &Uuid, is_active: bool) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;

        let rows_affected = conn.execute(
            "UPDATE users SET is_active = ?1 WHERE id = ?2",
            params![is_active as i64, user_id.to_string()],
        )?;

        if rows_affected == 0 {
            anyhow::bail!("User not found");
        }

        Ok(())
    }

    /// Delete a user by ID (admin only)
    pub fn delete_user(&self, user_id: &Uuid) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;

        let rows_affected = conn.execute(
            "DELETE FROM users WHERE id = ?1",
            params![user_id.to_string()],
        )?;

        if rows_affected == 0 {
            anyhow::bail!("User not found");
        }

        info!("Deleted user: {}", user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_test_store() -> (UserStore, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let store = UserStore::new(db_path).unwrap();
        (store, temp_file)
    }

    #[test]
    fn test_default_admin_created() {
        let (store, _temp) = create_test_store();

        let admin = store.get_user_by_username("admin").unwrap();
        assert!(admin.is_some());

        let admin = admin.unwrap();
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.role, Role::Admin);
        assert!(admin.is_active);
    }

    #[test]
    fn test_authenticate() {
        let (store, _temp) = create_test_store();

        // Correct password
        let user = store.authenticate("admin", "admin123").unwrap();
        assert!(user.is_some());

        // Incorrect password and unknown username look the same
        assert!(store.authenticate("admin", "wrongpassword").unwrap().is_none());
        assert!(store.authenticate("nonexistent", "password").unwrap().is_none());
    }

    #[test]
    fn test_create_and_retrieve_user() {
        let (store, _temp) = create_test_store();

        let created = store
            .create_user("ada", "password123", "Ada", "Lovelace", Role::Employee)
            .unwrap();
        assert_eq!(created.username, "ada");
        assert_eq!(created.role, Role::Employee);

        let by_name = store.get_user_by_username("ada").unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert_eq!(by_name.display_name(), "Ada Lovelace");

        let by_id = store.get_user_by_id(&created.id).unwrap().unwrap();
        assert_eq!(by_id.username, "ada");
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let (store, _temp) = create_test_store();

        store
            .create_user("ada", "pass1234", "Ada", "Lovelace", Role::Employee)
            .unwrap();

        let result = store.create_user("ada", "pass5678", "Adele", "Goldberg", Role::Employee);
        assert!(result.is_err());
    }

    #[test]
    fn test_list_users() {
        let (store, _temp) = create_test_store();

        store
            .create_user("ada", "pass1234", "Ada", "Lovelace", Role::Employee)
            .unwrap();
        store
            .create_user("grace", "pass1234", "Grace", "Hopper", Role::Employee)
            .unwrap();

        let users = store.list_users().unwrap();
        assert_eq!(users.len(), 3); // admin + ada + grace
    }

    #[test]
    fn test_set_active() {
        let (store, _temp) = create_test_store();

        let user = store
            .create_user("ada", "pass1234", "Ada", "Lovelace", Role::Employee)
            .unwrap();

        store.set_active(&user.id, false).unwrap();
        assert!(!store.get_user_by_id(&user.id).unwrap().unwrap().is_active);

        // Deactivation does not break credential verification
        assert!(store.authenticate("ada", "pass1234").unwrap().is_some());
    }

    #[test]
    fn test_delete_user() {
        let (store, _temp) = create_test_store();

        let user = store
            .create_user("tempuser", "pass1234", "Temp", "User", Role::Employee)
            .unwrap();

        assert!(store.get_user_by_username("tempuser").unwrap().is_some());

        store.delete_user(&user.id).unwrap();

        assert!(store.get_user_by_username("tempuser").unwrap().is_none());
        assert!(store.delete_user(&user.id).is_err());
    }
}

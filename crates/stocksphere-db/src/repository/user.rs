//! # User Repository
//!
//! Accounts, credential verification, and role rules.
//!
//! ## Credential Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Password Storage                                     │
//! │                                                                         │
//! │  Registration                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Argon2id + random salt → PHC string → users.password_hash             │
//! │                                                                         │
//! │  Login                                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  verify_credentials(email, password)                                   │
//! │  ├── No such email      → "Invalid email or password"                  │
//! │  └── Hash mismatch      → "Invalid email or password"                  │
//! │      (the two cases are indistinguishable to the caller)               │
//! │                                                                         │
//! │  The hash never leaves this module: the public User type has no        │
//! │  credential field at all.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stocksphere_core::validation::{validate_email, validate_password, validate_user_name};
use stocksphere_core::{staff_email, CoreError, Role, User, DEFAULT_STAFF_PASSWORD};

/// Row shape including the credential hash.
///
/// Internal to this module; converted to the public [`User`] before
/// anything is returned.
#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRecord {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            id: record.id,
            name: record.name,
            email: record.email,
            role: record.role,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Repository for user account operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates a user account with an explicit email and password.
    ///
    /// ## Returns
    /// * `Ok(User)` - Created account (without credential material)
    /// * `Err(DbError::UniqueViolation)` - Email already registered
    /// * `Err(DbError::Domain)` - A field failed validation
    pub async fn create(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> DbResult<User> {
        validate_user_name(name).map_err(CoreError::from)?;
        validate_email(email).map_err(CoreError::from)?;
        validate_password(password).map_err(CoreError::from)?;

        let password_hash = hash_password(password)?;
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        debug!(id = %id, email = %email, role = ?role, "Creating user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, email, password_hash, role, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&id)
        .bind(name.trim())
        .bind(email.trim())
        .bind(&password_hash)
        .bind(role)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id,
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            role,
            created_at: now,
            updated_at: now,
        })
    }

    /// Creates a staff account from a display name.
    ///
    /// The acting admin re-confirms their own password before the account
    /// is created. The login email is derived from the name (lowercased,
    /// whitespace stripped, at the staff domain) and the account starts
    /// with the well-known default password. Staff are expected to change
    /// it on first login.
    pub async fn create_staff(
        &self,
        name: &str,
        acting_admin_id: &str,
        admin_password: &str,
    ) -> DbResult<User> {
        self.require_password(acting_admin_id, admin_password)
            .await?;

        let email = staff_email(name);
        let user = self
            .create(name, &email, DEFAULT_STAFF_PASSWORD, Role::Staff)
            .await?;

        info!(email = %user.email, "Staff account created with default password");
        Ok(user)
    }

    /// Verifies a login attempt.
    ///
    /// ## Returns
    /// * `Ok(User)` - Credentials match
    /// * `Err(DbError::Domain(InvalidCredentials))` - Unknown email OR wrong
    ///   password; the two cases produce the identical error
    pub async fn verify_credentials(&self, email: &str, password: &str) -> DbResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE email = ?1
            "#,
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        let record = match record {
            Some(r) => r,
            None => {
                debug!("Login attempt for unknown email");
                return Err(CoreError::InvalidCredentials.into());
            }
        };

        if !verify_password(password, &record.password_hash) {
            debug!(user_id = %record.id, "Login attempt with wrong password");
            return Err(CoreError::InvalidCredentials.into());
        }

        Ok(record.into())
    }

    /// Changes a user's password after verifying the current one.
    ///
    /// ## Returns
    /// * `Ok(())` - Password changed
    /// * `Err(DbError::Domain(InvalidCredentials))` - Current password wrong
    /// * `Err(DbError::Domain(Validation))` - New password below minimum length
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> DbResult<()> {
        validate_password(new_password).map_err(CoreError::from)?;

        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("User", user_id))?;

        if !verify_password(current_password, &record.password_hash) {
            return Err(CoreError::InvalidCredentials.into());
        }

        let new_hash = hash_password(new_password)?;
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1
            "#,
        )
        .bind(user_id)
        .bind(&new_hash)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Deletes a user account.
    ///
    /// The acting admin re-confirms their own password first. Self-deletion
    /// is refused: an admin cannot delete the account they are acting as,
    /// so the directory can never lose its last admin by accident.
    pub async fn delete(
        &self,
        acting_user_id: &str,
        target_user_id: &str,
        admin_password: &str,
    ) -> DbResult<()> {
        if acting_user_id == target_user_id {
            return Err(CoreError::SelfDeletion.into());
        }

        self.require_password(acting_user_id, admin_password)
            .await?;

        debug!(target = %target_user_id, "Deleting user");

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(target_user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", target_user_id));
        }

        Ok(())
    }

    /// Lists all accounts, newest first.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(User::from).collect())
    }

    /// Re-confirms a user's password for a sensitive operation.
    ///
    /// Unlike login, an unknown id here is a NotFound: the caller already
    /// holds a user id, so there is nothing to hide.
    async fn require_password(&self, user_id: &str, password: &str) -> DbResult<()> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("User", user_id))?;

        if !verify_password(password, &record.password_hash) {
            debug!(user_id = %user_id, "Password re-confirmation failed");
            return Err(CoreError::InvalidCredentials.into());
        }

        Ok(())
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(User::from))
    }
}

// =============================================================================
// Hashing Helpers
// =============================================================================

/// Hashes a password with Argon2id and a fresh random salt.
///
/// Returns the full PHC string (algorithm, parameters, salt, hash) which is
/// self-describing and verifiable without extra bookkeeping.
fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC string.
///
/// A malformed stored hash verifies as false rather than erroring; the
/// caller sees the same invalid-credentials outcome either way.
fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_create_and_verify() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        let created = repo
            .create("Admin", "admin@stocksphere.com", "secret123", Role::Admin)
            .await
            .unwrap();
        assert_eq!(created.role, Role::Admin);

        let verified = repo
            .verify_credentials("admin@stocksphere.com", "secret123")
            .await
            .unwrap();
        assert_eq!(verified.id, created.id);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        repo.create("Admin", "admin@stocksphere.com", "secret123", Role::Admin)
            .await
            .unwrap();

        let unknown_email = repo
            .verify_credentials("nobody@stocksphere.com", "secret123")
            .await
            .unwrap_err();
        let wrong_password = repo
            .verify_credentials("admin@stocksphere.com", "wrong")
            .await
            .unwrap_err();

        assert_eq!(unknown_email.to_string(), "Invalid email or password");
        assert_eq!(wrong_password.to_string(), "Invalid email or password");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        repo.create("A", "same@stocksphere.com", "secret123", Role::Staff)
            .await
            .unwrap();
        let err = repo
            .create("B", "same@stocksphere.com", "secret123", Role::Staff)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_create_staff_derives_email_and_default_password() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        let admin = repo
            .create("Admin", "admin@stocksphere.com", "secret123", Role::Admin)
            .await
            .unwrap();

        let staff = repo
            .create_staff("Jane Doe", &admin.id, "secret123")
            .await
            .unwrap();
        assert_eq!(staff.email, "janedoe@stocksphere.com");
        assert_eq!(staff.role, Role::Staff);

        // The default password logs in until changed.
        let verified = repo
            .verify_credentials("janedoe@stocksphere.com", DEFAULT_STAFF_PASSWORD)
            .await
            .unwrap();
        assert_eq!(verified.id, staff.id);
    }

    #[tokio::test]
    async fn test_create_staff_requires_admin_password() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        let admin = repo
            .create("Admin", "admin@stocksphere.com", "secret123", Role::Admin)
            .await
            .unwrap();

        let err = repo
            .create_staff("Jane Doe", &admin.id, "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");

        // No account was created.
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_change_password() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        let user = repo
            .create("Staff", "s@stocksphere.com", "oldpass", Role::Staff)
            .await
            .unwrap();

        // Too short new password is rejected before anything is touched.
        assert!(repo.change_password(&user.id, "oldpass", "abc").await.is_err());

        // Wrong current password is rejected.
        let err = repo
            .change_password(&user.id, "wrong", "abcdef")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");

        // Correct change takes effect.
        repo.change_password(&user.id, "oldpass", "abcdef")
            .await
            .unwrap();
        assert!(repo
            .verify_credentials("s@stocksphere.com", "oldpass")
            .await
            .is_err());
        repo.verify_credentials("s@stocksphere.com", "abcdef")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_self_deletion_blocked() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        let admin = repo
            .create("Admin", "admin@stocksphere.com", "secret123", Role::Admin)
            .await
            .unwrap();

        let err = repo
            .delete(&admin.id, &admin.id, "secret123")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete your own account");

        // The account is still there.
        assert!(repo.get_by_id(&admin.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_other_user() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        let admin = repo
            .create("Admin", "admin@stocksphere.com", "secret123", Role::Admin)
            .await
            .unwrap();
        let staff = repo
            .create_staff("Temp", &admin.id, "secret123")
            .await
            .unwrap();

        // A wrong password blocks the deletion.
        let err = repo
            .delete(&admin.id, &staff.id, "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
        assert!(repo.get_by_id(&staff.id).await.unwrap().is_some());

        repo.delete(&admin.id, &staff.id, "secret123").await.unwrap();
        assert!(repo.get_by_id(&staff.id).await.unwrap().is_none());

        // Deleting an already-deleted user reports not found.
        assert!(repo.delete(&admin.id, &staff.id, "secret123").await.is_err());
    }

    #[tokio::test]
    async fn test_list_has_no_credential_material() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        repo.create("Admin", "admin@stocksphere.com", "secret123", Role::Admin)
            .await
            .unwrap();

        let listed = repo.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        let json = serde_json::to_string(&listed[0]).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("hash"));
    }
}

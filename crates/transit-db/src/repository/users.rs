//! User operations

use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{AuthType, Identity, NewUser, User};
use crate::repository::Database;
use crate::utils::normalize_email;

const USER_COLUMNS: &str = "id, name, email, password_hash, google_id, role_id, active, auth_type, created_at, updated_at";

impl Database {
    // ==================== User Operations ====================

    /// Insert a new user
    ///
    /// A taken email, including one claimed by a concurrent insert, is
    /// reported as [`DbError::Duplicate`].
    pub async fn insert_user(&self, user: NewUser) -> Result<User, DbError> {
        let now = Utc::now();
        let email = normalize_email(&user.email);
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, google_id, role_id, active, auth_type, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&user.name)
        .bind(&email)
        .bind(&user.password_hash)
        .bind(&user.google_id)
        .bind(&user.role_id)
        .bind(user.active)
        .bind(user.auth_type.as_str())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, || format!("User '{}' already exists", email)))?;

        Ok(User {
            id,
            name: user.name,
            email,
            password_hash: user.password_hash,
            google_id: user.google_id,
            role_id: user.role_id,
            active: user.active,
            auth_type: user.auth_type,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a user by email
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let result = sqlx::query(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Resolve the identity (user joined with role) for a user ID
    ///
    /// Always reads live state; a user without a role yields an identity
    /// whose `role` is `None`.
    pub async fn get_identity(&self, id: &str) -> Result<Option<Identity>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT u.id, u.name, u.email, u.active, u.auth_type,
                   r.id AS role_id, r.name AS role_name, r.routes AS role_routes
            FROM users u
            LEFT JOIN roles r ON r.id = u.role_id
            WHERE u.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| Identity::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Link a Google account to an existing user
    pub async fn link_google_account(&self, id: &str, google_id: &str) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET google_id = ?, auth_type = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(google_id)
        .bind(AuthType::Google.as_str())
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check if any users exist
    pub async fn has_users(&self) -> Result<bool, DbError> {
        let result = sqlx::query("SELECT COUNT(*) as count FROM users")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = result.get("count");
        Ok(count > 0)
    }
}

//! Role operations

use chrono::Utc;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::Role;
use crate::repository::Database;

impl Database {
    // ==================== Role Operations ====================

    /// Insert a new role
    pub async fn insert_role(&self, name: &str, routes: &[String]) -> Result<Role, DbError> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let routes_json =
            serde_json::to_string(routes).map_err(|e| DbError::InvalidData(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO roles (id, name, routes, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(&routes_json)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, || format!("Role '{}' already exists", name)))?;

        Ok(Role {
            id,
            name: name.to_string(),
            routes: routes.to_vec(),
            created_at: now,
        })
    }

    /// Get a role by name
    pub async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, name, routes, created_at
            FROM roles
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| Role::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Get a role by name, creating it with the given routes if missing
    pub async fn ensure_role(&self, name: &str, routes: &[String]) -> Result<Role, DbError> {
        if let Some(role) = self.get_role_by_name(name).await? {
            return Ok(role);
        }

        match self.insert_role(name, routes).await {
            // Lost a race with another insert of the same role
            Err(DbError::Duplicate(_)) => self
                .get_role_by_name(name)
                .await?
                .ok_or_else(|| DbError::InvalidData(format!("Role '{}' vanished", name))),
            other => other,
        }
    }
}

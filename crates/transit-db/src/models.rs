//! Database models

use crate::utils::parse_datetime_or_now;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

/// Name of the role granted operator access
pub const ADMIN_ROLE: &str = "admin";
/// Name of the role assigned to self-registered accounts
pub const DEFAULT_ROLE: &str = "user";

/// Error type for parsing models from strings
#[derive(Debug, Clone)]
pub enum ParseError {
    InvalidAuthType(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidAuthType(s) => write!(f, "Invalid auth type: {}", s),
        }
    }
}

impl std::error::Error for ParseError {}

/// How an account authenticates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// Email and password
    #[default]
    Local,
    /// Google ID token
    Google,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Local => "local",
            AuthType::Google => "google",
        }
    }
}

impl FromStr for AuthType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(AuthType::Local),
            "google" => Ok(AuthType::Google),
            _ => Err(ParseError::InvalidAuthType(s.to_string())),
        }
    }
}

/// Role model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    /// Application routes the role may open
    pub routes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Role as embedded in an identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleSummary {
    pub id: String,
    pub name: String,
    pub routes: Vec<String>,
}

/// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub role_id: Option<String>,
    pub active: bool,
    pub auth_type: AuthType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user for insertion
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub role_id: Option<String>,
    pub active: bool,
    pub auth_type: AuthType,
}

/// Authenticated principal as resolved for a request
///
/// This is the projection of a user joined with its role. It is what the
/// token cache holds and what handlers see as the current user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub active: bool,
    pub auth_type: AuthType,
    pub role: Option<RoleSummary>,
}

impl Identity {
    /// Name of the attached role, if any
    pub fn role_name(&self) -> Option<&str> {
        self.role.as_ref().map(|r| r.name.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.role_name() == Some(ADMIN_ROLE)
    }
}

fn decode_routes(raw: &str) -> Result<Vec<String>, sqlx::Error> {
    serde_json::from_str(raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

// Implement TryFrom for database rows

impl TryFrom<&sqlx::sqlite::SqliteRow> for Role {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(Role {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            routes: decode_routes(&row.try_get::<String, _>("routes")?)?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        let auth_type_str: String = row.try_get("auth_type")?;
        Ok(User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            google_id: row.try_get("google_id")?,
            role_id: row.try_get("role_id")?,
            active: row.try_get("active")?,
            auth_type: AuthType::from_str(&auth_type_str)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for Identity {
    type Error = sqlx::Error;

    /// Decodes the users-left-join-roles projection; role columns are
    /// prefixed with `role_` and all null when the user has no role.
    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        let auth_type_str: String = row.try_get("auth_type")?;
        let role_id: Option<String> = row.try_get("role_id")?;
        let role = match role_id {
            Some(id) => {
                let routes: Option<String> = row.try_get("role_routes")?;
                Some(RoleSummary {
                    id,
                    name: row.try_get("role_name")?,
                    routes: match routes {
                        Some(raw) => decode_routes(&raw)?,
                        None => Vec::new(),
                    },
                })
            }
            None => None,
        };

        Ok(Identity {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            active: row.try_get("active")?,
            auth_type: AuthType::from_str(&auth_type_str)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            role,
        })
    }
}

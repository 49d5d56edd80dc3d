//! Transit Hub Database Layer
//!
//! This crate provides the persistence layer for Transit Hub accounts,
//! using SQLite via sqlx. It owns the user and role tables and the
//! identity projection consumed by token validation.

pub mod error;
pub mod models;
pub mod repository;
pub mod utils;

pub use error::DbError;
pub use models::*;
pub use repository::Database;

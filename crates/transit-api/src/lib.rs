//! Transit Hub REST API
//!
//! This crate provides the Axum-based HTTP API: account sessions
//! (register, login, Google sign-in, verify, logout), operator control of
//! the token cache, health and metrics.

pub mod error;
pub mod google;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use google::{GoogleClient, GoogleProfile};
pub use routes::create_router;
pub use state::{AppState, MetricsHandle};

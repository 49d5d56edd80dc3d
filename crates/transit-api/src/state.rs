//! Application state

use std::sync::Arc;

use transit_auth::TokenValidator;
use transit_db::Database;

use crate::google::GoogleClient;

/// Prometheus recorder handle used by the metrics route
pub type MetricsHandle = metrics_exporter_prometheus::PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub validator: Arc<TokenValidator>,
    pub google: Arc<GoogleClient>,
}

impl AppState {
    pub fn new(db: Database, validator: Arc<TokenValidator>, google: Arc<GoogleClient>) -> Self {
        Self {
            db,
            validator,
            google,
        }
    }
}

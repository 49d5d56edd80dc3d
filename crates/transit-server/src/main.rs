//! Transit Hub - account sessions with cached token validation

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::{Config, LogFormat};
use transit_api::{AppState, GoogleClient, create_router};
use transit_auth::{JwtManager, TokenCache, TokenValidator};
use transit_db::{ADMIN_ROLE, AuthType, DEFAULT_ROLE, Database, NewUser};

/// Account created on first start when the user table is empty
const BOOTSTRAP_ADMIN_EMAIL: &str = "admin@transit.local";
const BOOTSTRAP_ADMIN_PASSWORD: &str = "admin123";

/// Transit Hub - account sessions with cached token validation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "TRANSIT_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "TRANSIT_PORT")]
    port: Option<u16>,

    /// Token signing secret
    #[arg(long, env = "TRANSIT_TOKEN_KEY", hide_env_values = true)]
    token_key: Option<String>,

    /// Maximum number of cached tokens
    #[arg(long, env = "TRANSIT_TOKEN_CACHE_MAX")]
    token_cache_max: Option<u64>,

    /// Token cache time-to-live in seconds
    #[arg(long, env = "TRANSIT_TOKEN_CACHE_TTL_SECS")]
    token_cache_ttl_secs: Option<u64>,

    /// SQLite database path
    #[arg(long, env = "TRANSIT_DATABASE")]
    database: Option<String>,
}

impl Args {
    /// Overlay command-line and environment values onto the file config
    fn apply(self, config: &mut Config) {
        if let Some(bind) = self.bind {
            config.server.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(secret) = self.token_key {
            config.auth.token_secret = secret;
        }
        if let Some(max) = self.token_cache_max {
            config.token_cache.max_entries = max;
        }
        if let Some(ttl) = self.token_cache_ttl_secs {
            config.token_cache.ttl_secs = ttl;
        }
        if let Some(path) = self.database {
            config.database.path = path;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    args.apply(&mut config);
    config.validate()?;

    init_logging(&config.logging.level, config.logging.format);

    info!("Starting Transit Hub v{}", env!("CARGO_PKG_VERSION"));

    if config.uses_default_secret() {
        warn!("Using the default token secret; set TRANSIT_TOKEN_KEY in production");
    }

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    // Create data directory
    if let Some(parent) = Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create data directory {:?}", parent))?;
    }

    // Initialize database
    let db_url = format!("sqlite:{}?mode=rwc", config.database.path);
    let db = Database::new(&db_url)
        .await
        .context("Failed to open database")?;

    seed_accounts(&db).await?;

    let jwt = Arc::new(JwtManager::new(
        &config.auth.token_secret,
        config.auth.token_expiry_hours,
    ));
    let cache = TokenCache::new(config.token_cache.to_cache_config());
    let validator = Arc::new(TokenValidator::new(jwt, Arc::new(db.clone()), cache));
    let google = Arc::new(
        GoogleClient::new(
            config.google.tokeninfo_url.clone(),
            Duration::from_secs(config.google.timeout_secs),
        )
        .context("Failed to build Google tokeninfo client")?,
    );

    let state = AppState::new(db.clone(), validator, google);

    let app = create_router(state, Some(Arc::new(metrics_handle)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .context("Invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server stopped");
    Ok(())
}

/// Ensure the built-in roles exist and create the first admin account
async fn seed_accounts(db: &Database) -> Result<()> {
    let admin_role = db.ensure_role(ADMIN_ROLE, &["*".to_string()]).await?;
    db.ensure_role(DEFAULT_ROLE, &[]).await?;

    if db.has_users().await? {
        return Ok(());
    }

    info!("Creating default admin user");
    let password_hash = transit_auth::hash_password(BOOTSTRAP_ADMIN_PASSWORD)?;
    db.insert_user(NewUser {
        name: "Administrator".to_string(),
        email: BOOTSTRAP_ADMIN_EMAIL.to_string(),
        password_hash: Some(password_hash),
        google_id: None,
        role_id: Some(admin_role.id),
        active: true,
        auth_type: AuthType::Local,
    })
    .await?;
    warn!(
        "Default admin user created (email: {}, password: {}); change it",
        BOOTSTRAP_ADMIN_EMAIL, BOOTSTRAP_ADMIN_PASSWORD
    );

    Ok(())
}

/// Initialize logging
fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flags_override_file_before_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[token_cache]\nttl_secs = 0\n").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let args = Args::try_parse_from([
            "transit-server",
            "--config",
            path.as_str(),
            "--token-cache-ttl-secs",
            "5",
            "--port",
            "8081",
        ])
        .unwrap();

        let mut config = Config::load(&args.config).unwrap();
        args.apply(&mut config);

        assert!(config.validate().is_ok());
        assert_eq!(config.token_cache.ttl_secs, 5);
        assert_eq!(config.server.port, 8081);
    }
}

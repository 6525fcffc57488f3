//! NutriScan Backend
//!
//! Food photo analysis and diet-related health risk scoring.
//!
//! ## Architecture
//!
//! - Routes: HTTP request handling and routing
//! - Services: identification, cascaded risk scoring, advice, food logs
//! - Clients: vision/text model, hosted risk model, object storage
//! - Database: PostgreSQL with SQLx

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use nutriscan_backend::{config, db, routes, state::AppState};
use secrecy::ExposeSecret;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let config = config::AppConfig::load()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = if config::AppConfig::is_production() { "production" } else { "development" },
        risk_backend = ?config.risk_model.backend,
        "Starting NutriScan Backend"
    );

    if config::AppConfig::is_production() {
        validate_production_config(&config)?;
    }

    if config.metrics.enabled {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], config.metrics.port))
            .install()?;
        info!(port = config.metrics.port, "Prometheus exporter listening");
    }

    info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database).await?;

    if !config::AppConfig::is_production() {
        info!("Running database migrations...");
        db::run_migrations(&db_pool).await?;
    }

    let state = AppState::new(db_pool, config.clone())?;

    // Surface a broken bundle at startup instead of on the first request
    if config.risk_model.backend == config::RiskBackend::Local {
        if let Err(e) = state.models.get().await {
            warn!(error = %e, "Risk model bundle unavailable; scoring will fail until fixed");
        }
    }

    let app = routes::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(address = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config::AppConfig::is_production() {
            "nutriscan_backend=info,tower_http=info".into()
        } else {
            "nutriscan_backend=debug,tower_http=debug,sqlx=warn".into()
        }
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config::AppConfig::is_production() {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Refuse to start production without the credentials every request needs
fn validate_production_config(config: &config::AppConfig) -> Result<()> {
    let mut errors = Vec::new();

    let has_ai_key = config
        .ai
        .api_key
        .as_ref()
        .is_some_and(|key| !key.expose_secret().trim().is_empty());
    if !has_ai_key {
        errors.push("ai.api_key must be set");
    }

    match config.risk_model.backend {
        config::RiskBackend::Local if config.risk_model.bundle_path.is_none() => {
            errors.push("risk_model.bundle_path must be set for the local backend");
        }
        config::RiskBackend::Remote if config.risk_model.endpoint_url.is_none() => {
            errors.push("risk_model.endpoint_url must be set for the remote backend");
        }
        _ => {}
    }

    if config.storage.base_url.is_none() || config.storage.service_key.is_none() {
        warn!("Object storage is not configured; saving food logs will fail");
    }

    if config.database.url.contains("localhost") || config.database.url.contains("127.0.0.1") {
        warn!("Database URL contains localhost - ensure this is intentional for production");
    }

    if !errors.is_empty() {
        for err in &errors {
            error!("Configuration error: {}", err);
        }
        anyhow::bail!("Invalid production configuration");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

//! Application state management
//!
//! Shared state passed to all request handlers via Axum's state extraction.
//! Every field is cheap to clone: pools and clients are internally Arc'd.

use crate::clients::{HttpObjectStorage, ObjectStorage, OpenAiClient, RemoteRiskModelClient};
use crate::config::{AppConfig, RiskBackend};
use crate::services::{AdviceService, FoodIdentificationService, ModelStore, RiskPredictionService};
use nutriscan_shared::errors::PipelineError;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    /// Scaler and stage weights for the local cascade
    pub models: Arc<ModelStore>,
    pub identification: FoodIdentificationService,
    pub risk: RiskPredictionService,
    pub advice: AdviceService,
    pub storage: Arc<dyn ObjectStorage>,
}

impl AppState {
    /// Wire the production clients from configuration
    ///
    /// Missing credentials do not fail here; the first call that needs them
    /// reports a configuration error.
    pub fn new(db: PgPool, config: AppConfig) -> Result<Self, PipelineError> {
        let models = Arc::new(ModelStore::new(config.risk_model.bundle_path.clone()));

        let risk = match config.risk_model.backend {
            RiskBackend::Local => {
                RiskPredictionService::local(models.clone(), config.risk_model.timeout())
            }
            RiskBackend::Remote => RiskPredictionService::remote(Arc::new(RemoteRiskModelClient::new(
                config.risk_model.endpoint_url.clone(),
                config.risk_model.timeout(),
            )?)),
        };

        Ok(Self {
            identification: FoodIdentificationService::new(Arc::new(OpenAiClient::vision(&config.ai)?)),
            advice: AdviceService::new(Arc::new(OpenAiClient::advice(&config.ai)?)),
            storage: Arc::new(HttpObjectStorage::new(&config.storage)?),
            risk,
            models,
            db,
            config: Arc::new(config),
        })
    }

    /// Get a reference to the database pool
    #[inline]
    pub fn db(&self) -> &PgPool {
        &self.db
    }

    /// Get a reference to the configuration
    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

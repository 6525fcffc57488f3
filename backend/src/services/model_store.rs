//! Risk model bundle
//!
//! The fitted scaler and the four logistic stages ship as one JSON file:
//!
//! ```json
//! {
//!   "scaler": { "mean": [..10], "scale": [..10] },
//!   "stages": {
//!     "diabetes":     { "coefficients": [..10], "intercept": -1.2 },
//!     "hypertension": { "coefficients": [..11], "intercept": -0.8 },
//!     "dyslipidemia": { "coefficients": [..12], "intercept": -0.5 },
//!     "osas":         { "coefficients": [..13], "intercept": -1.0 }
//!   }
//! }
//! ```
//!
//! The bundle is read once, lazily, on first use. Concurrent first callers
//! wait on a single load.

use nutriscan_shared::errors::PipelineError;
use nutriscan_shared::features::ScalerParams;
use nutriscan_shared::models::Disease;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// One logistic stage: `p = σ(intercept + Σ coefficients[i] · x[i])`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticStage {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageWeights {
    pub diabetes: LogisticStage,
    pub hypertension: LogisticStage,
    pub dyslipidemia: LogisticStage,
    pub osas: LogisticStage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub scaler: ScalerParams,
    pub stages: StageWeights,
}

impl ModelBundle {
    pub fn stage(&self, disease: Disease) -> &LogisticStage {
        match disease {
            Disease::Diabetes => &self.stages.diabetes,
            Disease::Hypertension => &self.stages.hypertension,
            Disease::Dyslipidemia => &self.stages.dyslipidemia,
            Disease::Osas => &self.stages.osas,
        }
    }

    /// Check scaler sanity and that stage widths grow 10, 11, 12, 13
    pub fn validate(&self) -> Result<(), String> {
        self.scaler.validate()?;
        for disease in Disease::CASCADE_ORDER {
            let stage = self.stage(disease);
            if stage.coefficients.len() != disease.input_width() {
                return Err(format!(
                    "{} stage expects {} coefficients, found {}",
                    disease,
                    disease.input_width(),
                    stage.coefficients.len()
                ));
            }
            if !stage.intercept.is_finite() || stage.coefficients.iter().any(|c| !c.is_finite()) {
                return Err(format!("{} stage has non-finite weights", disease));
            }
        }
        Ok(())
    }
}

/// Lazily loaded, shared model bundle
pub struct ModelStore {
    path: Option<PathBuf>,
    cell: OnceCell<Arc<ModelBundle>>,
}

impl ModelStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            cell: OnceCell::new(),
        }
    }

    /// Store that already holds a validated bundle
    pub fn preloaded(bundle: ModelBundle) -> Result<Self, PipelineError> {
        bundle.validate().map_err(PipelineError::Configuration)?;
        Ok(Self {
            path: None,
            cell: OnceCell::new_with(Some(Arc::new(bundle))),
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// The bundle, loading it on first access
    ///
    /// A missing path or file is `NotInitialized`; a file that does not parse
    /// or validate is a configuration error. Failed loads are retried on the
    /// next call.
    pub async fn get(&self) -> Result<Arc<ModelBundle>, PipelineError> {
        self.cell
            .get_or_try_init(|| self.load())
            .await
            .map(Arc::clone)
    }

    async fn load(&self) -> Result<Arc<ModelBundle>, PipelineError> {
        let path = self.path.as_ref().ok_or_else(|| {
            PipelineError::NotInitialized("no risk model bundle is configured".to_string())
        })?;

        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            warn!(path = %path.display(), error = %e, "Risk model bundle unavailable");
            PipelineError::NotInitialized(format!("risk model bundle {} unavailable", path.display()))
        })?;

        let bundle: ModelBundle = serde_json::from_str(&raw).map_err(|e| {
            PipelineError::Configuration(format!("invalid risk model bundle {}: {}", path.display(), e))
        })?;
        bundle.validate().map_err(PipelineError::Configuration)?;

        info!(path = %path.display(), "Risk model bundle loaded");
        Ok(Arc::new(bundle))
    }
}

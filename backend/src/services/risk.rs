//! Risk prediction: normalization followed by the cascade, or the hosted model

use super::cascade::{BundleClassifier, CascadeScorer};
use super::model_store::ModelStore;
use super::normalization::{validate_inputs, FeatureNormalizer};
use crate::clients::RiskModelEndpoint;
use nutriscan_shared::errors::PipelineError;
use nutriscan_shared::models::RiskAssessment;
use nutriscan_shared::types::RiskInputs;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
enum Engine {
    Local {
        normalizer: FeatureNormalizer,
        cascade: CascadeScorer,
    },
    Remote(Arc<dyn RiskModelEndpoint>),
}

#[derive(Clone)]
pub struct RiskPredictionService {
    engine: Engine,
}

impl RiskPredictionService {
    /// In-process cascade over the bundle in `store`
    pub fn local(store: Arc<ModelStore>, stage_timeout: Duration) -> Self {
        let classifier = Arc::new(BundleClassifier::new(store.clone()));
        Self::with_cascade(store, CascadeScorer::new(classifier, stage_timeout))
    }

    /// In-process normalization with a caller-supplied cascade
    pub fn with_cascade(store: Arc<ModelStore>, cascade: CascadeScorer) -> Self {
        Self {
            engine: Engine::Local {
                normalizer: FeatureNormalizer::new(store),
                cascade,
            },
        }
    }

    pub fn remote(endpoint: Arc<dyn RiskModelEndpoint>) -> Self {
        Self {
            engine: Engine::Remote(endpoint),
        }
    }

    /// Four assessments in cascade order
    pub async fn predict(&self, inputs: &RiskInputs) -> Result<Vec<RiskAssessment>, PipelineError> {
        match &self.engine {
            Engine::Local { normalizer, cascade } => {
                let features = normalizer.normalize(inputs).await?;
                debug!("Features normalized, running cascade");
                cascade.score(&features).await
            }
            Engine::Remote(endpoint) => {
                validate_inputs(inputs)?;
                endpoint.predict(inputs).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::model_store::test_support::sample_bundle;
    use async_trait::async_trait;
    use nutriscan_shared::errors::UpstreamService;
    use nutriscan_shared::models::{Disease, NutrientAggregate};

    fn inputs() -> RiskInputs {
        RiskInputs {
            gender_code: 0.0,
            age: 52.0,
            nutrients: NutrientAggregate {
                energy: 2100.0,
                protein: 70.0,
                fat: 65.0,
                carbs: 320.0,
                sugar: 80.0,
                sodium_mg: 5200.0,
                calcium_mg: 400.0,
                vitaminc_mg: 40.0,
            },
        }
    }

    struct RateLimitedEndpoint;

    #[async_trait]
    impl RiskModelEndpoint for RateLimitedEndpoint {
        async fn predict(&self, _inputs: &RiskInputs) -> Result<Vec<RiskAssessment>, PipelineError> {
            Err(PipelineError::UpstreamRejected {
                service: UpstreamService::RiskModel,
                status: 429,
            })
        }
    }

    #[tokio::test]
    async fn test_local_prediction() {
        let store = Arc::new(ModelStore::preloaded(sample_bundle()).unwrap());
        let service = RiskPredictionService::local(store, Duration::from_secs(5));
        let assessments = service.predict(&inputs()).await.unwrap();
        let diseases: Vec<Disease> = assessments.iter().map(|a| a.disease).collect();
        assert_eq!(diseases, Disease::CASCADE_ORDER.to_vec());
    }

    #[tokio::test]
    async fn test_local_prediction_without_bundle() {
        let service = RiskPredictionService::local(Arc::new(ModelStore::new(None)), Duration::from_secs(5));
        assert!(matches!(
            service.predict(&inputs()).await,
            Err(PipelineError::NotInitialized(_))
        ));
    }

    #[tokio::test]
    async fn test_remote_rate_limit_propagates() {
        let service = RiskPredictionService::remote(Arc::new(RateLimitedEndpoint));
        let err = service.predict(&inputs()).await.unwrap_err();
        assert!(err.is_rate_limited());
    }
}

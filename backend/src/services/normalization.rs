//! Feature normalization service

use super::model_store::ModelStore;
use nutriscan_shared::errors::PipelineError;
use nutriscan_shared::features::{FeatureVector, RawFeatures};
use nutriscan_shared::types::RiskInputs;
use nutriscan_shared::validation::validate_nutrient;
use std::sync::Arc;

/// Turns raw profile and nutrient inputs into the standardized vector
#[derive(Clone)]
pub struct FeatureNormalizer {
    store: Arc<ModelStore>,
}

impl FeatureNormalizer {
    pub fn new(store: Arc<ModelStore>) -> Self {
        Self { store }
    }

    /// Convert units and apply the fitted scaler
    ///
    /// Fails with `NotInitialized` while the scaler is unavailable.
    pub async fn normalize(&self, inputs: &RiskInputs) -> Result<FeatureVector, PipelineError> {
        validate_inputs(inputs)?;
        let bundle = self.store.get().await?;
        let raw = RawFeatures::new(inputs.gender_code, inputs.age, &inputs.nutrients);
        Ok(bundle.scaler.standardize(&raw))
    }
}

/// Reject inputs no model was fit on, before any model access
pub fn validate_inputs(inputs: &RiskInputs) -> Result<(), PipelineError> {
    if inputs.gender_code != 0.0 && inputs.gender_code != 1.0 {
        return Err(PipelineError::Validation(
            "gender must be 1 (male) or 0 (female)".to_string(),
        ));
    }
    if !inputs.age.is_finite() || inputs.age <= 0.0 {
        return Err(PipelineError::Validation("age must be a positive number".to_string()));
    }
    for (name, value) in inputs.nutrients.fields() {
        validate_nutrient(name, value)?;
    }
    Ok(())
}

//! Food identification stage

use crate::clients::VisionModel;
use nutriscan_shared::diseases::{resolve_selection, ResolvedDisease};
use nutriscan_shared::errors::PipelineError;
use nutriscan_shared::identification::{
    build_identification_prompt, parse_identification_response, CANDIDATE_FOODS,
};
use nutriscan_shared::models::{FoodIdentificationResult, FoodImage};
use nutriscan_shared::validation::validate_image;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct FoodIdentificationService {
    model: Arc<dyn VisionModel>,
}

impl FoodIdentificationService {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self { model }
    }

    /// Identify the dish in a photo, conditioned on the selected diseases
    ///
    /// Returns the parsed result together with the diseases it was resolved
    /// against. Unknown disease ids pass through as raw text.
    pub async fn identify<S: AsRef<str>>(
        &self,
        image: &FoodImage,
        disease_ids: &[S],
    ) -> Result<(FoodIdentificationResult, Vec<ResolvedDisease>), PipelineError> {
        validate_image(image).map_err(PipelineError::Validation)?;

        let diseases = resolve_selection(disease_ids);
        let prompt = build_identification_prompt(&diseases, &CANDIDATE_FOODS);

        let raw = self.model.describe_image(&prompt, image).await?;

        match parse_identification_response(&raw, &CANDIDATE_FOODS) {
            Ok(result) => {
                info!(food = %result.food.as_str(), matched = result.food.is_match(), "Food identified");
                Ok((result, diseases))
            }
            Err(err) => {
                error!(kind = err.kind(), response = %raw, "Could not parse identification response");
                Err(err)
            }
        }
    }
}

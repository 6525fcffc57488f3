//! Input validation functions
//!
//! Validation utilities for uploads and nutrient payloads. Struct-level
//! range checks use the `validator` derive on the models.

use crate::errors::PipelineError;
use crate::models::FoodImage;
use thiserror::Error;

/// Largest image accepted for identification (10 MiB)
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Validate an uploaded food photo
pub fn validate_image(image: &FoodImage) -> Result<(), String> {
    if image.bytes.is_empty() {
        return Err("Image cannot be empty".to_string());
    }
    if image.bytes.len() > MAX_IMAGE_BYTES {
        return Err("Image too large".to_string());
    }
    if !image.mime_type.starts_with("image/") {
        return Err(format!("Unsupported content type: {}", image.mime_type));
    }
    Ok(())
}

/// Validate a nutrient amount (grams, milligrams or kcal)
pub fn validate_nutrient(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_nan() || value.is_infinite() {
        return Err(ValidationError::new(field, format!("{} must be a valid number", field)));
    }
    if value < 0.0 {
        return Err(ValidationError::new(field, format!("{} cannot be negative", field)));
    }
    if value > 100_000.0 {
        return Err(ValidationError::new(field, format!("{} value unreasonably high", field)));
    }
    Ok(())
}

/// Unwrap a required numeric field
pub fn require_field(field: &str, value: Option<f64>) -> Result<f64, ValidationError> {
    value.ok_or_else(|| ValidationError::missing(field))
}

// ============================================================================
// User-Friendly Field Labels
// ============================================================================

/// Map technical field names to the Korean labels shown in the app
pub fn get_field_display_label(field_name: &str) -> &str {
    match field_name {
        "age" => "나이",
        "gender" => "성별",
        "height_cm" => "키",
        "weight_kg" => "몸무게",
        "energy" => "열량",
        "protein" => "단백질",
        "fat" => "지방",
        "carbs" => "탄수화물",
        "sugar" => "당류",
        "sodium_mg" => "나트륨",
        "calcium_mg" => "칼슘",
        "vitaminc_mg" => "비타민C",
        "energy_kcal" => "열량",
        "protein_g" => "단백질",
        "fat_g" => "지방",
        "carbs_g" => "탄수화물",
        "sugar_g" => "당류",
        "food_name" => "음식 이름",
        "risk_level" => "위험도",
        "file" => "사진",
        _ => field_name,
    }
}

/// Validation error with field context
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub display_label: String,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
            display_label: get_field_display_label(field).to_string(),
        }
    }

    pub fn missing(field: &str) -> Self {
        Self::new(field, format!("missing required field: {}", field))
    }

    /// Message prefixed with the Korean field label
    pub fn user_message(&self) -> String {
        format!("{}: {}", self.display_label, self.message)
    }
}

impl From<ValidationError> for PipelineError {
    fn from(err: ValidationError) -> Self {
        PipelineError::Validation(err.user_message())
    }
}

//! API request and response types

use crate::models::{
    FoodIdentificationResult, Gender, NutrientAggregate, RiskAssessment, RiskLevel, TopFactor,
    UserProfile,
};
use crate::validation::{require_field, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

// ============================================================================
// Food identification
// ============================================================================

/// Result of `POST /api/v1/analyze`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeFoodResponse {
    /// Candidate dish or the no-match sentinel
    pub food: String,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    pub risk_comment: String,
    pub calories: String,
    /// Display names of the diseases the verdict was conditioned on
    pub diseases: Vec<String>,
}

impl AnalyzeFoodResponse {
    pub fn new(result: FoodIdentificationResult, diseases: Vec<String>) -> Self {
        Self {
            food: result.food.as_str().to_string(),
            matched: result.food.is_match(),
            risk_level: result.risk_level,
            risk_comment: result.risk_comment,
            calories: result.calories,
            diseases,
        }
    }
}

// ============================================================================
// Risk prediction
// ============================================================================

/// Ten raw inputs of the tabular risk model
///
/// Every field is optional at the wire level so a missing one can be reported
/// by name instead of as a generic deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictHealthRequest {
    pub gender: Option<f64>,
    pub age: Option<f64>,
    pub energy: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub carbs: Option<f64>,
    pub sugar: Option<f64>,
    pub sodium_mg: Option<f64>,
    pub calcium_mg: Option<f64>,
    pub vitaminc_mg: Option<f64>,
}

impl PredictHealthRequest {
    /// Check every field is present, in feature order
    pub fn into_inputs(self) -> Result<RiskInputs, ValidationError> {
        let gender_code = require_field("gender", self.gender)?;
        if gender_code != 0.0 && gender_code != 1.0 {
            return Err(ValidationError::new(
                "gender",
                "gender must be 1 (male) or 0 (female)",
            ));
        }
        let age = require_field("age", self.age)?;
        let nutrients = NutrientAggregate {
            energy: require_field("energy", self.energy)?,
            protein: require_field("protein", self.protein)?,
            fat: require_field("fat", self.fat)?,
            carbs: require_field("carbs", self.carbs)?,
            sugar: require_field("sugar", self.sugar)?,
            sodium_mg: require_field("sodium_mg", self.sodium_mg)?,
            calcium_mg: require_field("calcium_mg", self.calcium_mg)?,
            vitaminc_mg: require_field("vitaminc_mg", self.vitaminc_mg)?,
        };
        Ok(RiskInputs {
            gender_code,
            age,
            nutrients,
        })
    }
}

/// Validated raw inputs; nutrients still in their logged units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskInputs {
    pub gender_code: f64,
    pub age: f64,
    pub nutrients: NutrientAggregate,
}

impl RiskInputs {
    pub fn from_profile(profile: &UserProfile, nutrients: NutrientAggregate) -> Self {
        Self {
            gender_code: profile.gender.code(),
            age: f64::from(profile.age),
            nutrients,
        }
    }

    /// Flat wire form accepted by the hosted model
    pub fn to_request(&self) -> PredictHealthRequest {
        let n = &self.nutrients;
        PredictHealthRequest {
            gender: Some(self.gender_code),
            age: Some(self.age),
            energy: Some(n.energy),
            protein: Some(n.protein),
            fat: Some(n.fat),
            carbs: Some(n.carbs),
            sugar: Some(n.sugar),
            sodium_mg: Some(n.sodium_mg),
            calcium_mg: Some(n.calcium_mg),
            vitaminc_mg: Some(n.vitaminc_mg),
        }
    }
}

/// Four assessments in cascade order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictHealthResponse {
    pub predictions: Vec<RiskAssessment>,
}

/// Advice for one disease
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceRequest {
    /// Cascade disease, catalog id, or free text
    pub disease: String,
    pub risk: f64,
    #[serde(default)]
    pub top_factors: Vec<TopFactor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviceResponse {
    /// Empty below the caution threshold
    pub advice: String,
}

/// Body of `POST /api/v1/risk/assess`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AssessRiskRequest {
    #[validate(nested)]
    pub profile: UserProfile,
    /// Day whose food log is aggregated; defaults to today (UTC)
    pub date: Option<NaiveDate>,
}

/// One disease of a full assessment, with advice when it was requested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseReport {
    #[serde(flatten)]
    pub assessment: RiskAssessment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
    /// Set when advice generation failed for this disease only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advice_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessRiskResponse {
    pub date: NaiveDate,
    pub nutrients: NutrientAggregate,
    pub entries: usize,
    pub reports: Vec<DiseaseReport>,
}

// ============================================================================
// Food log
// ============================================================================

/// Optional nutrient columns of a food log entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodLogNutrients {
    pub energy_kcal: Option<f64>,
    pub protein_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub sugar_g: Option<f64>,
    pub sodium_mg: Option<f64>,
    pub calcium_mg: Option<f64>,
    pub vitaminc_mg: Option<f64>,
}

impl FoodLogNutrients {
    /// Missing columns count as zero
    pub fn to_aggregate(&self) -> NutrientAggregate {
        NutrientAggregate {
            energy: self.energy_kcal.unwrap_or(0.0),
            protein: self.protein_g.unwrap_or(0.0),
            fat: self.fat_g.unwrap_or(0.0),
            carbs: self.carbs_g.unwrap_or(0.0),
            sugar: self.sugar_g.unwrap_or(0.0),
            sodium_mg: self.sodium_mg.unwrap_or(0.0),
            calcium_mg: self.calcium_mg.unwrap_or(0.0),
            vitaminc_mg: self.vitaminc_mg.unwrap_or(0.0),
        }
    }

    /// Present values paired with their column names
    pub fn present(&self) -> Vec<(&'static str, f64)> {
        [
            ("energy_kcal", self.energy_kcal),
            ("protein_g", self.protein_g),
            ("fat_g", self.fat_g),
            ("carbs_g", self.carbs_g),
            ("sugar_g", self.sugar_g),
            ("sodium_mg", self.sodium_mg),
            ("calcium_mg", self.calcium_mg),
            ("vitaminc_mg", self.vitaminc_mg),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }
}

/// Non-image fields of a new food log entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewFoodLog {
    pub food_name: String,
    pub calories: Option<String>,
    pub risk_level: Option<String>,
    pub risk_comment: Option<String>,
    #[serde(flatten)]
    pub nutrients: FoodLogNutrients,
}

/// Stored food log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodLogResponse {
    pub id: String,
    pub food_name: String,
    pub image_url: String,
    pub calories: Option<String>,
    #[serde(flatten)]
    pub nutrients: FoodLogNutrients,
    pub risk_level: Option<String>,
    pub risk_comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Diet summary
// ============================================================================

/// `GET /api/v1/diet/summary` query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DietSummaryQuery {
    pub age: u32,
    pub gender: Gender,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub date: Option<NaiveDate>,
}

impl DietSummaryQuery {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            age: self.age,
            gender: self.gender,
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DietSummaryResponse {
    pub date: NaiveDate,
    pub recommended_kcal: u32,
    pub consumed_kcal: u32,
    pub percentage: u32,
    pub exceeded: bool,
    pub entries: usize,
    pub nutrients: NutrientAggregate,
}

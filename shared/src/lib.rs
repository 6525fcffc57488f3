//! NutriScan Shared Library
//!
//! Pure, I/O-free pieces of the food-photo risk pipeline: the error taxonomy,
//! domain models, the disease catalog, feature normalization, the food
//! identification grammar and calorie metrics.

pub mod diseases;
pub mod errors;
pub mod features;
pub mod health_metrics;
pub mod identification;
pub mod models;
pub mod types;
pub mod units;
pub mod validation;

// Re-export commonly used items
pub use errors::*;
pub use health_metrics::*;
pub use types::*;
pub use units::*;

pub use features::{FeatureVector, RawFeatures, ScalerParams, FEATURE_COUNT, FEATURE_NAMES};
pub use models::{
    Disease, FactorDirection, FoodIdentificationResult, FoodImage, FoodMatch, Gender,
    NutrientAggregate, RiskAssessment, RiskLevel, TopFactor, UserProfile,
};

//! Business logic services
//!
//! Services encapsulate the pipeline stages and coordinate between
//! repositories and external systems.

pub mod advice;
pub mod cascade;
pub mod food_log;
pub mod identification;
pub mod model_store;
pub mod normalization;
pub mod risk;

pub use advice::AdviceService;
pub use cascade::{BundleClassifier, CascadeScorer, StageClassifier, StagePrediction};
pub use food_log::FoodLogService;
pub use identification::FoodIdentificationService;
pub use model_store::{ModelBundle, ModelStore};
pub use normalization::FeatureNormalizer;
pub use risk::RiskPredictionService;

//! Feature normalization for the risk cascade
//!
//! Builds the fixed-order ten-feature vector from a profile and a day's
//! nutrient totals, then standardizes it with a pre-fitted scaler.
//!
//! Feature order is a contract shared with every stage classifier:
//!
//! | idx | feature     | unit    |
//! |-----|-------------|---------|
//! | 0   | gender      | 1 = male, 0 = female |
//! | 1   | age         | years   |
//! | 2   | energy      | kcal    |
//! | 3   | protein     | g       |
//! | 4   | fat         | g       |
//! | 5   | carbs       | g       |
//! | 6   | sugar       | g       |
//! | 7   | sodium_g    | g       |
//! | 8   | calcium_g   | g       |
//! | 9   | vitaminc_g  | g       |

use crate::models::{NutrientAggregate, UserProfile};
use crate::units::milligrams_to_grams;
use serde::{Deserialize, Serialize};

/// Number of base features
pub const FEATURE_COUNT: usize = 10;

/// Feature names in vector order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "gender",
    "age",
    "energy",
    "protein",
    "fat",
    "carbs",
    "sugar",
    "sodium_g",
    "calcium_g",
    "vitaminc_g",
];

/// Unscaled features after unit conversion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawFeatures(pub [f64; FEATURE_COUNT]);

impl RawFeatures {
    /// Assemble raw features from the gender code, age and nutrients
    ///
    /// Milligram fields are divided by 1000; everything else passes through.
    pub fn new(gender_code: f64, age: f64, nutrients: &NutrientAggregate) -> Self {
        RawFeatures([
            gender_code,
            age,
            nutrients.energy,
            nutrients.protein,
            nutrients.fat,
            nutrients.carbs,
            nutrients.sugar,
            milligrams_to_grams(nutrients.sodium_mg),
            milligrams_to_grams(nutrients.calcium_mg),
            milligrams_to_grams(nutrients.vitaminc_mg),
        ])
    }

    pub fn from_profile(profile: &UserProfile, nutrients: &NutrientAggregate) -> Self {
        Self::new(profile.gender.code(), f64::from(profile.age), nutrients)
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }
}

/// Standardized features, ready for the first cascade stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }
}

/// Fitted standardization: `(raw - mean) / scale` per feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: [f64; FEATURE_COUNT],
    pub scale: [f64; FEATURE_COUNT],
}

impl ScalerParams {
    /// Reject parameters that would divide by zero or propagate NaN
    pub fn validate(&self) -> Result<(), String> {
        for (i, name) in FEATURE_NAMES.iter().enumerate() {
            if !self.mean[i].is_finite() {
                return Err(format!("scaler mean for {} is not finite", name));
            }
            if !self.scale[i].is_finite() || self.scale[i] == 0.0 {
                return Err(format!("scaler scale for {} must be finite and non-zero", name));
            }
        }
        Ok(())
    }

    pub fn standardize(&self, raw: &RawFeatures) -> FeatureVector {
        let mut out = [0.0; FEATURE_COUNT];
        for (i, value) in raw.0.iter().enumerate() {
            out[i] = (value - self.mean[i]) / self.scale[i];
        }
        FeatureVector(out)
    }

    /// Undo `standardize`: `value * scale + mean`
    pub fn invert(&self, features: &FeatureVector) -> RawFeatures {
        let mut out = [0.0; FEATURE_COUNT];
        for (i, value) in features.0.iter().enumerate() {
            out[i] = value * self.scale[i] + self.mean[i];
        }
        RawFeatures(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;

    fn sample_scaler() -> ScalerParams {
        ScalerParams {
            mean: [0.5, 45.0, 1900.0, 70.0, 50.0, 280.0, 50.0, 3.5, 0.5, 0.07],
            scale: [0.5, 15.0, 600.0, 25.0, 20.0, 90.0, 25.0, 1.3, 0.25, 0.05],
        }
    }

    fn sample_nutrients() -> NutrientAggregate {
        NutrientAggregate {
            energy: 2100.0,
            protein: 80.0,
            fat: 60.0,
            carbs: 300.0,
            sugar: 45.0,
            sodium_mg: 4200.0,
            calcium_mg: 650.0,
            vitaminc_mg: 90.0,
        }
    }

    #[test]
    fn test_raw_features_order_and_units() {
        let profile = UserProfile {
            age: 68,
            gender: Gender::Male,
            height_cm: 170.0,
            weight_kg: 70.0,
        };
        let raw = RawFeatures::from_profile(&profile, &sample_nutrients());
        assert_eq!(
            raw.0,
            [1.0, 68.0, 2100.0, 80.0, 60.0, 300.0, 45.0, 4.2, 0.65, 0.09]
        );
    }

    #[test]
    fn test_standardize_known_values() {
        let raw = RawFeatures([1.0, 60.0, 2500.0, 95.0, 70.0, 370.0, 75.0, 4.8, 0.75, 0.12]);
        let fv = sample_scaler().standardize(&raw);
        let expected = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        for (got, want) in fv.0.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-9, "{} != {}", got, want);
        }
    }

    #[test]
    fn test_zero_scale_rejected() {
        let mut scaler = sample_scaler();
        scaler.scale[7] = 0.0;
        let err = scaler.validate().unwrap_err();
        assert!(err.contains("sodium_g"));
        assert!(sample_scaler().validate().is_ok());
    }
}

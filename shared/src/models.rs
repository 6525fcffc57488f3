//! Domain models for food identification and health-risk scoring

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;
use std::str::FromStr;
use validator::Validate;

// ============================================================================
// User Profile
// ============================================================================

/// Gender as captured on the profile form
///
/// Encoded for the risk models as male = 1, female = 0. The scaler and every
/// stage classifier were fit against this encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Numeric code fed to the feature vector
    pub fn code(&self) -> f64 {
        match self {
            Gender::Male => 1.0,
            Gender::Female => 0.0,
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" | "1" => Ok(Gender::Male),
            "female" | "f" | "0" => Ok(Gender::Female),
            other => Err(format!("Unknown gender: {}", other)),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
        }
    }
}

/// Self-reported profile, held in memory for the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UserProfile {
    #[validate(range(min = 1, max = 150))]
    pub age: u32,
    pub gender: Gender,
    #[validate(range(min = 50.0, max = 300.0))]
    pub height_cm: f64,
    #[validate(range(min = 20.0, max = 500.0))]
    pub weight_kg: f64,
}

// ============================================================================
// Nutrients
// ============================================================================

/// Nutrient totals summed over a day of food log entries
///
/// Energy is kcal; protein, fat, carbs and sugar are grams; the `_mg` fields
/// are milligrams and get converted to grams during normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientAggregate {
    pub energy: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub sugar: f64,
    pub sodium_mg: f64,
    pub calcium_mg: f64,
    pub vitaminc_mg: f64,
}

impl NutrientAggregate {
    /// Field names paired with values, in declaration order
    pub fn fields(&self) -> [(&'static str, f64); 8] {
        [
            ("energy", self.energy),
            ("protein", self.protein),
            ("fat", self.fat),
            ("carbs", self.carbs),
            ("sugar", self.sugar),
            ("sodium_mg", self.sodium_mg),
            ("calcium_mg", self.calcium_mg),
            ("vitaminc_mg", self.vitaminc_mg),
        ]
    }
}

impl AddAssign for NutrientAggregate {
    fn add_assign(&mut self, other: Self) {
        self.energy += other.energy;
        self.protein += other.protein;
        self.fat += other.fat;
        self.carbs += other.carbs;
        self.sugar += other.sugar;
        self.sodium_mg += other.sodium_mg;
        self.calcium_mg += other.calcium_mg;
        self.vitaminc_mg += other.vitaminc_mg;
    }
}

impl std::iter::Sum for NutrientAggregate {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(NutrientAggregate::default(), |mut acc, n| {
            acc += n;
            acc
        })
    }
}

// ============================================================================
// Diseases scored by the cascade
// ============================================================================

/// Diseases scored by the cascaded classifier, in cascade order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disease {
    Diabetes,
    Hypertension,
    Dyslipidemia,
    Osas,
}

impl Disease {
    /// Fixed execution order of the cascade. Stage `i` consumes the base
    /// features plus the probabilities of stages `0..i`.
    pub const CASCADE_ORDER: [Disease; 4] = [
        Disease::Diabetes,
        Disease::Hypertension,
        Disease::Dyslipidemia,
        Disease::Osas,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Disease::Diabetes => "diabetes",
            Disease::Hypertension => "hypertension",
            Disease::Dyslipidemia => "dyslipidemia",
            Disease::Osas => "osas",
        }
    }

    /// Identifier of the matching entry in the disease catalog
    pub fn catalog_id(&self) -> &'static str {
        match self {
            Disease::Diabetes => "dm",
            Disease::Hypertension => "htn",
            Disease::Dyslipidemia => "dyslipidemia",
            Disease::Osas => "osas",
        }
    }

    /// Zero-based position in the cascade
    pub fn cascade_position(&self) -> usize {
        match self {
            Disease::Diabetes => 0,
            Disease::Hypertension => 1,
            Disease::Dyslipidemia => 2,
            Disease::Osas => 3,
        }
    }

    /// Number of input features this stage's classifier expects
    pub fn input_width(&self) -> usize {
        crate::features::FEATURE_COUNT + self.cascade_position()
    }

    /// Name given to this stage's probability when it is fed forward
    pub fn feature_name(&self) -> &'static str {
        match self {
            Disease::Diabetes => "diabetes_risk",
            Disease::Hypertension => "hypertension_risk",
            Disease::Dyslipidemia => "dyslipidemia_risk",
            Disease::Osas => "osas_risk",
        }
    }
}

impl FromStr for Disease {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "diabetes" | "dm" => Ok(Disease::Diabetes),
            "hypertension" | "htn" => Ok(Disease::Hypertension),
            "dyslipidemia" => Ok(Disease::Dyslipidemia),
            "osas" | "sleep_apnea" => Ok(Disease::Osas),
            other => Err(format!("Unknown disease: {}", other)),
        }
    }
}

impl fmt::Display for Disease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Risk levels
// ============================================================================

/// Score at or above which a disease is reported as 주의 and advice is generated
pub const CAUTION_THRESHOLD: f64 = 0.4;

/// Score at or above which a disease is reported as 위험
pub const DANGER_THRESHOLD: f64 = 0.7;

/// Discrete risk verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "안전")]
    Safe,
    #[serde(rename = "주의")]
    Caution,
    #[serde(rename = "위험")]
    Danger,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "안전",
            RiskLevel::Caution => "주의",
            RiskLevel::Danger => "위험",
        }
    }

    /// Derive the label from a continuous probability
    pub fn from_score(score: f64) -> Self {
        if score >= DANGER_THRESHOLD {
            RiskLevel::Danger
        } else if score >= CAUTION_THRESHOLD {
            RiskLevel::Caution
        } else {
            RiskLevel::Safe
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "안전" => Some(RiskLevel::Safe),
            "주의" => Some(RiskLevel::Caution),
            "위험" => Some(RiskLevel::Danger),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Risk assessment
// ============================================================================

/// Whether a feature pushed the predicted risk up or down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorDirection {
    Increase,
    Decrease,
}

/// One entry of a ranked prediction explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopFactor {
    pub feature: String,
    #[serde(alias = "value")]
    pub magnitude: f64,
    #[serde(alias = "impact")]
    pub direction: FactorDirection,
}

impl TopFactor {
    /// Build from a signed contribution; the sign becomes the direction
    pub fn from_contribution(feature: impl Into<String>, contribution: f64) -> Self {
        Self {
            feature: feature.into(),
            magnitude: contribution.abs(),
            direction: if contribution >= 0.0 {
                FactorDirection::Increase
            } else {
                FactorDirection::Decrease
            },
        }
    }
}

/// Risk for one disease, produced fresh per scoring call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub disease: Disease,
    pub risk: f64,
    pub level: RiskLevel,
    pub top_factors: Vec<TopFactor>,
}

impl RiskAssessment {
    pub fn new(disease: Disease, risk: f64, top_factors: Vec<TopFactor>) -> Self {
        Self {
            disease,
            risk,
            level: RiskLevel::from_score(risk),
            top_factors,
        }
    }

    /// Advice is generated only at or above the caution threshold
    pub fn needs_advice(&self) -> bool {
        self.risk >= CAUTION_THRESHOLD
    }
}

// ============================================================================
// Food identification
// ============================================================================

/// Outcome of matching a photo against the candidate list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoodMatch {
    /// One of the candidate dishes
    Identified(String),
    /// The model answered with the no-match sentinel
    NoMatch,
}

impl FoodMatch {
    pub fn is_match(&self) -> bool {
        matches!(self, FoodMatch::Identified(_))
    }

    /// Display name; the sentinel text for `NoMatch`
    pub fn as_str(&self) -> &str {
        match self {
            FoodMatch::Identified(name) => name,
            FoodMatch::NoMatch => crate::identification::NO_MATCH_SENTINEL,
        }
    }
}

/// Parsed answer of the food identification stage
#[derive(Debug, Clone, PartialEq)]
pub struct FoodIdentificationResult {
    pub food: FoodMatch,
    pub risk_level: Option<RiskLevel>,
    pub risk_comment: String,
    pub calories: String,
}

/// Uploaded photo with its declared MIME type
#[derive(Debug, Clone)]
pub struct FoodImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl FoodImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_encoding() {
        assert_eq!(Gender::Male.code(), 1.0);
        assert_eq!(Gender::Female.code(), 0.0);
        assert_eq!("male".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("0".parse::<Gender>().unwrap(), Gender::Female);
        assert!("other".parse::<Gender>().is_err());
    }

    #[test]
    fn test_cascade_widths_grow_by_one() {
        let widths: Vec<usize> = Disease::CASCADE_ORDER
            .iter()
            .map(|d| d.input_width())
            .collect();
        assert_eq!(widths, vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Safe);
        assert_eq!(RiskLevel::from_score(0.39), RiskLevel::Safe);
        assert_eq!(RiskLevel::from_score(0.4), RiskLevel::Caution);
        assert_eq!(RiskLevel::from_score(0.69), RiskLevel::Caution);
        assert_eq!(RiskLevel::from_score(0.7), RiskLevel::Danger);
        assert_eq!(RiskLevel::from_label(" 주의 "), Some(RiskLevel::Caution));
        assert_eq!(RiskLevel::from_label("보통"), None);
    }

    #[test]
    fn test_needs_advice_boundary() {
        assert!(!RiskAssessment::new(Disease::Diabetes, 0.39, vec![]).needs_advice());
        assert!(RiskAssessment::new(Disease::Diabetes, 0.4, vec![]).needs_advice());
    }

    #[test]
    fn test_top_factor_accepts_endpoint_field_names() {
        let json = r#"{"feature":"sugar","value":0.31,"impact":"increase"}"#;
        let factor: TopFactor = serde_json::from_str(json).unwrap();
        assert_eq!(factor.magnitude, 0.31);
        assert_eq!(factor.direction, FactorDirection::Increase);
    }

    #[test]
    fn test_profile_validation() {
        let profile = UserProfile {
            age: 0,
            gender: Gender::Female,
            height_cm: 160.0,
            weight_kg: 55.0,
        };
        assert!(profile.validate().is_err());

        let profile = UserProfile { age: 70, ..profile };
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_nutrient_sum() {
        let a = NutrientAggregate {
            energy: 500.0,
            sodium_mg: 1200.0,
            ..Default::default()
        };
        let b = NutrientAggregate {
            energy: 300.0,
            sodium_mg: 800.0,
            ..Default::default()
        };
        let total: NutrientAggregate = vec![a, b].into_iter().sum();
        assert_eq!(total.energy, 800.0);
        assert_eq!(total.sodium_mg, 2000.0);
    }
}

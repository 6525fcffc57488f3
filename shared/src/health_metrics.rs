//! Daily calorie metrics
//!
//! Budget from the revised Harris-Benedict equation with a fixed light
//! activity factor, consumption from the free-text calorie estimates stored
//! on food log entries.

use crate::models::{Gender, UserProfile};
use crate::units::parse_kcal;
use serde::{Deserialize, Serialize};

/// Activity multiplier applied to BMR for the daily budget
pub const ACTIVITY_FACTOR: f64 = 1.3;

// ============================================================================
// BMR / Budget
// ============================================================================

/// Revised Harris-Benedict BMR
///
/// Men: 88.362 + 13.397 × weight(kg) + 4.799 × height(cm) - 5.677 × age(y)
/// Women: 447.593 + 9.247 × weight(kg) + 3.098 × height(cm) - 4.330 × age(y)
pub fn calculate_bmr_harris_benedict(weight_kg: f64, height_cm: f64, age_years: u32, gender: Gender) -> f64 {
    let age = f64::from(age_years);
    match gender {
        Gender::Male => 88.362 + 13.397 * weight_kg + 4.799 * height_cm - 5.677 * age,
        Gender::Female => 447.593 + 9.247 * weight_kg + 3.098 * height_cm - 4.330 * age,
    }
}

/// Recommended kcal per day, rounded to the nearest integer
pub fn daily_calorie_budget(profile: &UserProfile) -> u32 {
    let bmr = calculate_bmr_harris_benedict(
        profile.weight_kg,
        profile.height_cm,
        profile.age,
        profile.gender,
    );
    (bmr * ACTIVITY_FACTOR).round().max(0.0) as u32
}

// ============================================================================
// Consumption
// ============================================================================

/// Sum the first integer of each calorie estimate; absent or numberless
/// entries count as zero
pub fn consumed_calories<S: AsRef<str>>(entries: &[Option<S>]) -> u32 {
    entries
        .iter()
        .filter_map(|entry| entry.as_ref().and_then(|text| parse_kcal(text.as_ref())))
        .fold(0u32, |acc, kcal| acc.saturating_add(kcal))
}

/// Consumption measured against the budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalorieProgress {
    pub recommended_kcal: u32,
    pub consumed_kcal: u32,
    /// Rounded percentage, capped at 100
    pub percentage: u32,
    pub exceeded: bool,
}

/// Compare consumption with the budget
///
/// `exceeded` uses the uncapped ratio, so a day at 130% still reports it
/// while `percentage` stays at 100.
pub fn calorie_progress(recommended_kcal: u32, consumed_kcal: u32) -> CalorieProgress {
    let ratio = if recommended_kcal == 0 {
        if consumed_kcal > 0 { f64::INFINITY } else { 0.0 }
    } else {
        f64::from(consumed_kcal) / f64::from(recommended_kcal)
    };

    CalorieProgress {
        recommended_kcal,
        consumed_kcal,
        percentage: (ratio * 100.0).round().min(100.0) as u32,
        exceeded: ratio > 1.0,
    }
}

//! Unit conversion for nutrient quantities
//!
//! Food log entries record sodium, calcium and vitamin C in milligrams while
//! the risk models were fit on grams. Calorie estimates arrive as free text
//! ("약 550 kcal") and are parsed here.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Mass Units
// ============================================================================

/// Mass unit a nutrient is recorded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MassUnit {
    #[default]
    Gram,
    Milligram,
}

impl MassUnit {
    /// Convert a value in this unit to grams
    pub fn to_grams(&self, value: f64) -> f64 {
        match self {
            MassUnit::Gram => value,
            MassUnit::Milligram => value / 1000.0,
        }
    }

    pub fn abbreviation(&self) -> &'static str {
        match self {
            MassUnit::Gram => "g",
            MassUnit::Milligram => "mg",
        }
    }
}

impl fmt::Display for MassUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// Shorthand for `MassUnit::Milligram.to_grams`
pub fn milligrams_to_grams(mg: f64) -> f64 {
    MassUnit::Milligram.to_grams(mg)
}

// ============================================================================
// Calorie strings
// ============================================================================

static FIRST_INTEGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)").expect("valid integer regex"));

/// Extract the calorie count from a free-text estimate
///
/// Takes the first run of digits: "약 550 kcal" → 550, "420kcal" → 420.
/// Returns `None` when the text carries no number.
pub fn parse_kcal(text: &str) -> Option<u32> {
    FIRST_INTEGER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

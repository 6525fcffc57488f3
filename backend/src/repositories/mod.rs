//! Database repositories
//!
//! Provides data access layer for database operations.

pub mod food_log;

pub use food_log::{CreateFoodLog, FoodLog, FoodLogRepository};

//! Food log repository - database operations for saved analyses

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use nutriscan_shared::types::{FoodLogNutrients, FoodLogResponse};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Food log entry
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FoodLog {
    pub id: Uuid,
    pub food_name: String,
    pub image_url: String,
    pub calories: Option<String>,
    pub energy_kcal: Option<Decimal>,
    pub protein_g: Option<Decimal>,
    pub fat_g: Option<Decimal>,
    pub carbs_g: Option<Decimal>,
    pub sugar_g: Option<Decimal>,
    pub sodium_mg: Option<Decimal>,
    pub calcium_mg: Option<Decimal>,
    pub vitaminc_mg: Option<Decimal>,
    pub risk_level: Option<String>,
    pub risk_comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FoodLog {
    pub fn nutrients(&self) -> FoodLogNutrients {
        let f = |d: Option<Decimal>| d.and_then(|v| v.to_f64());
        FoodLogNutrients {
            energy_kcal: f(self.energy_kcal),
            protein_g: f(self.protein_g),
            fat_g: f(self.fat_g),
            carbs_g: f(self.carbs_g),
            sugar_g: f(self.sugar_g),
            sodium_mg: f(self.sodium_mg),
            calcium_mg: f(self.calcium_mg),
            vitaminc_mg: f(self.vitaminc_mg),
        }
    }

    pub fn into_response(self) -> FoodLogResponse {
        FoodLogResponse {
            id: self.id.to_string(),
            nutrients: self.nutrients(),
            food_name: self.food_name,
            image_url: self.image_url,
            calories: self.calories,
            risk_level: self.risk_level,
            risk_comment: self.risk_comment,
            created_at: self.created_at,
        }
    }
}

/// Input for creating a food log entry
#[derive(Debug, Clone)]
pub struct CreateFoodLog {
    pub food_name: String,
    pub image_url: String,
    pub calories: Option<String>,
    pub nutrients: FoodLogNutrients,
    pub risk_level: Option<String>,
    pub risk_comment: Option<String>,
}

/// Convert an optional float column value for binding
fn to_decimal(value: Option<f64>) -> Option<Decimal> {
    value.and_then(Decimal::from_f64)
}

const COLUMNS: &str = "id, food_name, image_url, calories, energy_kcal, protein_g, fat_g, carbs_g, \
                       sugar_g, sodium_mg, calcium_mg, vitaminc_mg, risk_level, risk_comment, created_at";

/// Food log repository
pub struct FoodLogRepository;

impl FoodLogRepository {
    /// Insert a new entry
    pub async fn create(db: &PgPool, input: CreateFoodLog) -> Result<FoodLog> {
        let query = format!(
            r#"
            INSERT INTO food_logs (
                food_name, image_url, calories,
                energy_kcal, protein_g, fat_g, carbs_g, sugar_g,
                sodium_mg, calcium_mg, vitaminc_mg,
                risk_level, risk_comment
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            COLUMNS
        );
        let n = &input.nutrients;
        let log = sqlx::query_as::<_, FoodLog>(&query)
            .bind(&input.food_name)
            .bind(&input.image_url)
            .bind(&input.calories)
            .bind(to_decimal(n.energy_kcal))
            .bind(to_decimal(n.protein_g))
            .bind(to_decimal(n.fat_g))
            .bind(to_decimal(n.carbs_g))
            .bind(to_decimal(n.sugar_g))
            .bind(to_decimal(n.sodium_mg))
            .bind(to_decimal(n.calcium_mg))
            .bind(to_decimal(n.vitaminc_mg))
            .bind(&input.risk_level)
            .bind(&input.risk_comment)
            .fetch_one(db)
            .await?;

        Ok(log)
    }

    /// All entries, newest first
    pub async fn list(db: &PgPool) -> Result<Vec<FoodLog>> {
        let query = format!("SELECT {} FROM food_logs ORDER BY created_at DESC", COLUMNS);
        let logs = sqlx::query_as::<_, FoodLog>(&query).fetch_all(db).await?;
        Ok(logs)
    }

    /// Entries created on a given UTC day, oldest first
    pub async fn get_by_date(db: &PgPool, date: NaiveDate) -> Result<Vec<FoodLog>> {
        let query = format!(
            "SELECT {} FROM food_logs WHERE (created_at AT TIME ZONE 'UTC')::date = $1 ORDER BY created_at ASC",
            COLUMNS
        );
        let logs = sqlx::query_as::<_, FoodLog>(&query)
            .bind(date)
            .fetch_all(db)
            .await?;
        Ok(logs)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<FoodLog>> {
        let query = format!("SELECT {} FROM food_logs WHERE id = $1", COLUMNS);
        let log = sqlx::query_as::<_, FoodLog>(&query)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(log)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM food_logs WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

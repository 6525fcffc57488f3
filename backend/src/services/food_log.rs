//! Food log service - saving analyses and daily aggregation

use crate::clients::ObjectStorage;
use crate::error::ApiError;
use crate::repositories::{CreateFoodLog, FoodLog, FoodLogRepository};
use chrono::{NaiveDate, Utc};
use nutriscan_shared::health_metrics::{calorie_progress, consumed_calories, daily_calorie_budget};
use nutriscan_shared::models::{FoodImage, NutrientAggregate, RiskLevel, UserProfile};
use nutriscan_shared::types::{DietSummaryResponse, NewFoodLog};
use nutriscan_shared::validation::{validate_image, validate_nutrient, ValidationError};
use sqlx::PgPool;
use std::future::Future;
use tracing::{info, warn};
use uuid::Uuid;

/// Nutrient totals of one day's entries
#[derive(Debug, Clone, PartialEq)]
pub struct DailyIntake {
    pub date: NaiveDate,
    pub entries: usize,
    pub nutrients: NutrientAggregate,
    pub consumed_kcal: u32,
}

impl DailyIntake {
    pub fn from_logs(date: NaiveDate, logs: &[FoodLog]) -> Self {
        let calories: Vec<Option<&str>> = logs.iter().map(|l| l.calories.as_deref()).collect();
        Self {
            date,
            entries: logs.len(),
            nutrients: logs.iter().map(|l| l.nutrients().to_aggregate()).sum(),
            consumed_kcal: consumed_calories(&calories),
        }
    }
}

/// File extension for an image MIME type
fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" => "heic",
        _ => "jpg",
    }
}

/// Food log service
pub struct FoodLogService;

impl FoodLogService {
    /// Upload the photo, then insert the entry
    pub async fn save(
        db: &PgPool,
        storage: &dyn ObjectStorage,
        image: FoodImage,
        entry: NewFoodLog,
    ) -> Result<FoodLog, ApiError> {
        let food_name = entry.food_name.trim().to_string();
        if food_name.is_empty() {
            return Err(ValidationError::new("food_name", "food_name cannot be empty").into());
        }
        if let Some(level) = entry.risk_level.as_deref() {
            if RiskLevel::from_label(level).is_none() {
                return Err(
                    ValidationError::new("risk_level", format!("Invalid risk level: {}", level)).into(),
                );
            }
        }
        for (name, value) in entry.nutrients.present() {
            validate_nutrient(name, value)?;
        }
        validate_image(&image).map_err(ApiError::Validation)?;

        let path = format!(
            "{}/{}.{}",
            Utc::now().format("%Y/%m/%d"),
            Uuid::new_v4(),
            extension_for(&image.mime_type)
        );
        let image_url = storage.upload(&path, image.bytes, &image.mime_type).await?;

        let input = CreateFoodLog {
            food_name,
            image_url,
            calories: entry.calories.filter(|c| !c.trim().is_empty()),
            nutrients: entry.nutrients,
            risk_level: entry.risk_level,
            risk_comment: entry.risk_comment,
        };

        let log = insert_or_discard(storage, &path, FoodLogRepository::create(db, input)).await?;
        info!(id = %log.id, food = %log.food_name, "Food log saved");
        Ok(log)
    }

    /// All entries, newest first
    pub async fn list(db: &PgPool) -> Result<Vec<FoodLog>, ApiError> {
        FoodLogRepository::list(db).await.map_err(ApiError::Internal)
    }

    /// Delete an entry; image removal is best-effort
    pub async fn delete(db: &PgPool, storage: &dyn ObjectStorage, id: Uuid) -> Result<(), ApiError> {
        let log = FoodLogRepository::find_by_id(db, id)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::NotFound("Food log not found".to_string()))?;

        remove_image(storage, id, &log.image_url).await;

        let deleted = FoodLogRepository::delete(db, id)
            .await
            .map_err(ApiError::Internal)?;
        if !deleted {
            return Err(ApiError::NotFound("Food log not found".to_string()));
        }
        Ok(())
    }

    /// Totals for one UTC day
    pub async fn daily_intake(db: &PgPool, date: NaiveDate) -> Result<DailyIntake, ApiError> {
        let logs = FoodLogRepository::get_by_date(db, date)
            .await
            .map_err(ApiError::Internal)?;
        Ok(DailyIntake::from_logs(date, &logs))
    }

    /// Calorie budget against the day's consumption
    pub async fn daily_summary(
        db: &PgPool,
        profile: &UserProfile,
        date: NaiveDate,
    ) -> Result<DietSummaryResponse, ApiError> {
        let intake = Self::daily_intake(db, date).await?;
        Ok(summarize(profile, intake))
    }
}

/// Await the insert; on failure delete the object just uploaded to `path`
///
/// The insert error is returned even when the cleanup fails.
async fn insert_or_discard<T, F>(storage: &dyn ObjectStorage, path: &str, insert: F) -> Result<T, ApiError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match insert.await {
        Ok(value) => Ok(value),
        Err(err) => {
            if let Err(cleanup) = storage.delete(path).await {
                warn!(path = %path, error = %cleanup, "Failed to remove uploaded image");
            }
            Err(ApiError::Internal(err))
        }
    }
}

/// Best-effort removal of the photo behind a log entry
///
/// Returns whether the object was deleted. Failures are logged only.
async fn remove_image(storage: &dyn ObjectStorage, id: Uuid, image_url: &str) -> bool {
    let Some(path) = storage.object_path_from_url(image_url) else {
        warn!(id = %id, url = %image_url, "Image URL not recognised; skipping image deletion");
        return false;
    };
    match storage.delete(&path).await {
        Ok(()) => true,
        Err(err) => {
            warn!(id = %id, path = %path, error = %err, "Image deletion failed; removing row anyway");
            false
        }
    }
}

pub fn summarize(profile: &UserProfile, intake: DailyIntake) -> DietSummaryResponse {
    let progress = calorie_progress(daily_calorie_budget(profile), intake.consumed_kcal);
    DietSummaryResponse {
        date: intake.date,
        recommended_kcal: progress.recommended_kcal,
        consumed_kcal: progress.consumed_kcal,
        percentage: progress.percentage,
        exceeded: progress.exceeded,
        entries: intake.entries,
        nutrients: intake.nutrients,
    }
}

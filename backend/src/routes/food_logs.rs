//! Food log routes

use super::multipart::UploadForm;
use crate::error::ApiResult;
use crate::services::FoodLogService;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use nutriscan_shared::types::{FoodLogNutrients, FoodLogResponse, NewFoodLog};
use uuid::Uuid;

pub fn food_log_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_food_logs).post(create_food_log))
        .route("/:id", delete(delete_food_log))
}

/// GET /api/v1/food-logs - All entries, newest first
async fn list_food_logs(State(state): State<AppState>) -> ApiResult<Json<Vec<FoodLogResponse>>> {
    let logs = FoodLogService::list(state.db()).await?;
    Ok(Json(logs.into_iter().map(|log| log.into_response()).collect()))
}

/// POST /api/v1/food-logs - Save an analysis with its photo
async fn create_food_log(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<FoodLogResponse>)> {
    let mut form = UploadForm::read(multipart, "file").await?;
    let image = form.take_image("file")?;

    let entry = NewFoodLog {
        food_name: form.required_text("food_name")?,
        calories: form.text("calories"),
        risk_level: form.text("risk_level"),
        risk_comment: form.text("risk_comment"),
        nutrients: FoodLogNutrients {
            energy_kcal: form.number("energy_kcal")?,
            protein_g: form.number("protein_g")?,
            fat_g: form.number("fat_g")?,
            carbs_g: form.number("carbs_g")?,
            sugar_g: form.number("sugar_g")?,
            sodium_mg: form.number("sodium_mg")?,
            calcium_mg: form.number("calcium_mg")?,
            vitaminc_mg: form.number("vitaminc_mg")?,
        },
    };

    let log = FoodLogService::save(state.db(), state.storage.as_ref(), image, entry).await?;
    Ok((StatusCode::CREATED, Json(log.into_response())))
}

/// DELETE /api/v1/food-logs/:id
async fn delete_food_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    FoodLogService::delete(state.db(), state.storage.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

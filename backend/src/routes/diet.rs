//! Diet summary route

use crate::error::{ApiError, ApiResult};
use crate::services::FoodLogService;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use nutriscan_shared::types::{DietSummaryQuery, DietSummaryResponse};
use validator::Validate;

pub fn diet_routes() -> Router<AppState> {
    Router::new().route("/summary", get(get_daily_summary))
}

/// GET /api/v1/diet/summary - Calorie budget against the day's food log
async fn get_daily_summary(
    State(state): State<AppState>,
    Query(query): Query<DietSummaryQuery>,
) -> ApiResult<Json<DietSummaryResponse>> {
    let profile = query.profile();
    profile
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let summary = FoodLogService::daily_summary(state.db(), &profile, date).await?;
    Ok(Json(summary))
}

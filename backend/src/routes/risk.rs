//! Health risk routes

use crate::error::{ApiError, ApiResult};
use crate::services::FoodLogService;
use crate::state::AppState;
use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use nutriscan_shared::types::{
    AdviceRequest, AdviceResponse, AssessRiskRequest, AssessRiskResponse, PredictHealthRequest,
    PredictHealthResponse, RiskInputs,
};
use tracing::info;
use validator::Validate;

pub fn risk_routes() -> Router<AppState> {
    Router::new()
        .route("/predict", post(predict_health))
        .route("/advice", post(generate_advice))
        .route("/assess", post(assess_risk))
}

/// POST /api/v1/risk/predict - Score the four diseases from raw inputs
async fn predict_health(
    State(state): State<AppState>,
    Json(request): Json<PredictHealthRequest>,
) -> ApiResult<Json<PredictHealthResponse>> {
    let inputs = request.into_inputs()?;
    let predictions = state.risk.predict(&inputs).await?;
    Ok(Json(PredictHealthResponse { predictions }))
}

/// POST /api/v1/risk/advice - Advice for one disease
async fn generate_advice(
    State(state): State<AppState>,
    Json(request): Json<AdviceRequest>,
) -> ApiResult<Json<AdviceResponse>> {
    let advice = state
        .advice
        .advise(&request.disease, request.risk, &request.top_factors)
        .await?;
    Ok(Json(AdviceResponse { advice }))
}

/// POST /api/v1/risk/assess - Full pipeline over a day of food logs
async fn assess_risk(
    State(state): State<AppState>,
    Json(request): Json<AssessRiskRequest>,
) -> ApiResult<Json<AssessRiskResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let date = request.date.unwrap_or_else(|| Utc::now().date_naive());
    let intake = FoodLogService::daily_intake(state.db(), date).await?;

    let inputs = RiskInputs::from_profile(&request.profile, intake.nutrients);
    let assessments = state.risk.predict(&inputs).await?;
    let reports = state.advice.advise_all(assessments).await;

    info!(date = %date, entries = intake.entries, "Risk assessment complete");

    Ok(Json(AssessRiskResponse {
        date,
        nutrients: intake.nutrients,
        entries: intake.entries,
        reports,
    }))
}

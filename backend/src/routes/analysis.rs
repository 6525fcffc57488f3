//! Food photo analysis route

use super::multipart::UploadForm;
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use nutriscan_shared::types::AnalyzeFoodResponse;

pub fn analysis_routes() -> Router<AppState> {
    Router::new().route("/", post(analyze_food))
}

/// POST /api/v1/analyze - Identify the dish in an uploaded photo
///
/// Form fields: `file` (image), `diseases` (repeated or comma-separated ids).
async fn analyze_food(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<AnalyzeFoodResponse>> {
    let mut form = UploadForm::read(multipart, "file").await?;
    let image = form.take_image("file")?;
    let disease_ids = form.list("diseases");

    let (result, diseases) = state.identification.identify(&image, &disease_ids).await?;

    let names = diseases.iter().map(|d| d.display_name().to_string()).collect();
    Ok(Json(AnalyzeFoodResponse::new(result, names)))
}

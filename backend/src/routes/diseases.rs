//! Disease catalog route

use crate::state::AppState;
use axum::{routing::get, Json, Router};
use nutriscan_shared::diseases::{DiseaseInfo, DISEASE_CATALOG};

pub fn disease_routes() -> Router<AppState> {
    Router::new().route("/", get(list_diseases))
}

/// GET /api/v1/diseases - The canonical catalog
async fn list_diseases() -> Json<Vec<DiseaseInfo>> {
    Json(DISEASE_CATALOG.to_vec())
}

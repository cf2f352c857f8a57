use crate::api::rest::{ApiResult, AppState};
use crate::services::IngestReport;
use axum::extract::State;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use log::debug;
use serde_json::Value;

/// Create ingestion controller router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/logs", post(submit_log))
        .route("/tracking", post(submit_tracking))
        .route("/bus-images", post(submit_bus_image))
}

/// Basic detection log submission. Always answers 200; duplicates and
/// policy-routed payloads come back as skips.
async fn submit_log(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<IngestReport>> {
    debug!("Log submission received");
    let report = state.ingest.ingest_log(&payload).await?;
    Ok(Json(report))
}

/// GPS tracking submission; payloads without coordinates or a user are
/// acknowledged but not stored
async fn submit_tracking(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<IngestReport>> {
    debug!("Tracking submission received");
    let report = state.ingest.ingest_tracking(&payload).await?;
    Ok(Json(report))
}

/// Bus image upload with synthesized companion detection
async fn submit_bus_image(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<IngestReport>> {
    debug!("Bus image submission received");
    let report = state.ingest.ingest_bus_image(&payload).await?;
    Ok(Json(report))
}

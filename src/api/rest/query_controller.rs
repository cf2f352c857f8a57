use crate::api::rest::{authenticate, ApiResult, AppState};
use crate::db::models::BUS_IMAGES_COLLECTION;
use crate::db::store::DocFilter;
use crate::ingest::classify::Category;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Create query controller router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/detections", get(list_detections))
        .route("/detections/summary", get(detections_summary))
}

/// Search query parameters
#[derive(Debug, Deserialize)]
pub struct DetectionQuery {
    pub category: Option<String>,
    pub session_id: Option<String>,
    pub device_id: Option<String>,
    pub object_type: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DetectionList {
    pub detections: Vec<Value>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct DetectionSummary {
    pub bus: i64,
    pub vehicle: i64,
    pub other: i64,
    pub bus_images: i64,
}

fn filter_from(params: &DetectionQuery) -> DocFilter {
    let mut filter = DocFilter::new();
    if let Some(session_id) = &params.session_id {
        filter = filter.eq("session_id", session_id.as_str());
    }
    if let Some(device_id) = &params.device_id {
        filter = filter.eq("device_id", device_id.as_str());
    }
    if let Some(object_type) = &params.object_type {
        filter = filter.eq("object_type", object_type.as_str());
    }
    filter
}

/// List recent detections, optionally restricted to one category
async fn list_detections(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<DetectionQuery>,
) -> ApiResult<Json<DetectionList>> {
    authenticate(&state, &headers)?;

    let filter = filter_from(&params);
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);

    let collections: Vec<&'static str> = match params.category.as_deref() {
        Some(label) => vec![Category::parse_label(label).collection_name()],
        None => vec![
            Category::Bus.collection_name(),
            Category::Vehicle.collection_name(),
            Category::Other.collection_name(),
        ],
    };

    let mut detections = Vec::new();
    for collection in collections {
        let mut docs = state.store.find_many(collection, &filter, limit).await?;
        detections.append(&mut docs);
    }
    detections.truncate(limit as usize);

    let count = detections.len();
    Ok(Json(DetectionList { detections, count }))
}

/// Per-category document counts
async fn detections_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<DetectionQuery>,
) -> ApiResult<Json<DetectionSummary>> {
    authenticate(&state, &headers)?;

    let filter = filter_from(&params);

    Ok(Json(DetectionSummary {
        bus: state
            .store
            .count(Category::Bus.collection_name(), &filter)
            .await?,
        vehicle: state
            .store
            .count(Category::Vehicle.collection_name(), &filter)
            .await?,
        other: state
            .store
            .count(Category::Other.collection_name(), &filter)
            .await?,
        bus_images: state.store.count(BUS_IMAGES_COLLECTION, &filter).await?,
    }))
}

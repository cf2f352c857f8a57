use crate::api::rest::{require_admin, ApiResult, AppState};
use crate::services::cleanup::CleanupSummary;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use log::info;

/// Create maintenance controller router
pub fn create_router() -> Router<AppState> {
    Router::new().route("/cleanup", post(run_cleanup))
}

/// Delete detection documents stored without GPS or user fields.
/// Admin only.
async fn run_cleanup(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<CleanupSummary>> {
    require_admin(&state, &headers)?;

    let summary = state.cleanup.purge_incomplete().await?;
    info!("Manual cleanup removed {} documents", summary.deleted);
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::rest::testing::{state_with_store, token_for_role};
    use crate::db::models::UserRole;
    use crate::db::store::{DocumentStore, MemoryStore};
    use axum::http::header;
    use serde_json::json;
    use std::sync::Arc;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {}", token).parse().unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn cleanup_without_token_is_unauthorized() {
        let state = state_with_store(Arc::new(MemoryStore::new()));

        let err = run_cleanup(State(state), HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, 401);
    }

    #[tokio::test]
    async fn cleanup_with_garbage_token_is_unauthorized() {
        let state = state_with_store(Arc::new(MemoryStore::new()));

        let err = run_cleanup(State(state), bearer("not-a-jwt"))
            .await
            .unwrap_err();
        assert_eq!(err.status, 401);
    }

    #[tokio::test]
    async fn cleanup_with_viewer_token_is_forbidden() {
        let state = state_with_store(Arc::new(MemoryStore::new()));

        let err = run_cleanup(State(state), bearer(&token_for_role(UserRole::Viewer)))
            .await
            .unwrap_err();
        assert_eq!(err.status, 403);
    }

    #[tokio::test]
    async fn cleanup_with_admin_token_purges_incomplete_docs() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(
                "vehicle_detections",
                json!({"session_id": "s1", "user_id": "u1",
                       "gps_latitude": 52.1, "gps_longitude": 21.0}),
            )
            .await
            .unwrap();
        store
            .insert("vehicle_detections", json!({"session_id": "s2"}))
            .await
            .unwrap();
        let state = state_with_store(store);

        let Json(summary) = run_cleanup(State(state), bearer(&token_for_role(UserRole::Admin)))
            .await
            .unwrap();
        assert_eq!(summary.deleted, 1);
    }
}

use crate::api::rest::{authenticate, require_admin, ApiResult, AppState};
use crate::db::models::{AuthToken, AuthenticatedUser, LoginCredentials, User, UserRole};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Create auth controller router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/me", get(me))
        .route("/users/:id/reset-password", post(reset_password))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: AuthToken,
}

async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<LoginCredentials>,
) -> ApiResult<Json<LoginResponse>> {
    let (user, token) = state.auth_service.login(&credentials).await?;
    Ok(Json(LoginResponse { user, token }))
}

/// Self-service registration always creates viewer accounts; roles are
/// raised out of band.
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<Json<User>> {
    let user = state
        .auth_service
        .register(
            &request.username,
            &request.email,
            &request.password,
            UserRole::Viewer,
        )
        .await?;
    Ok(Json(user))
}

async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<AuthenticatedUser>> {
    let identity = authenticate(&state, &headers)?;
    Ok(Json(identity))
}

/// Reset a user's password to a generated one. Admin only; the new
/// password is returned once and never stored in the clear.
async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    require_admin(&state, &headers)?;

    let new_password = state.auth_service.reset_password(&user_id).await?;
    Ok(Json(json!({ "password": new_password })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::rest::testing::{state_with_store, token_for_role};
    use crate::db::store::MemoryStore;
    use axum::http::header;
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
    async fn reset_password_without_token_is_unauthorized() {
        let state = state_with_store(Arc::new(MemoryStore::new()));

        let err = reset_password(State(state), HeaderMap::new(), Path(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(err.status, 401);
    }

    #[tokio::test]
    async fn reset_password_with_viewer_token_is_forbidden() {
        let state = state_with_store(Arc::new(MemoryStore::new()));
        let token = token_for_role(UserRole::Viewer);

        let err = reset_password(State(state), bearer(&token), Path(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(err.status, 403);
    }
}

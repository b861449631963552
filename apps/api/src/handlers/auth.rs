use axum::Json;
use axum::extract::{OriginalUri, State};
use axum::http::{HeaderMap, StatusCode};

use crate::dto::{LoginRequest, LoginResponse};
use crate::error::{ApiError, ApiResult};
use crate::middleware::bearer_token;
use crate::state::AppState;

/// POST /auth/login - Exchange an API key plus group id for a bearer token.
pub async fn login_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let output = state
        .auth_service
        .login(&payload.api_key, &payload.group_id)
        .await
        .map_err(|error| ApiError::new(error, uri.path()))?;

    Ok(Json(LoginResponse {
        token: output.token,
        group_id: output.group_id.to_string(),
        resource_count: output.resource_count,
        expires_in: output.expires_in,
    }))
}

/// POST /auth/refresh - Mint a new token from a live one, revoking the old.
pub async fn refresh_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> ApiResult<Json<LoginResponse>> {
    let token = bearer_token(&headers).map_err(|error| ApiError::new(error, uri.path()))?;

    let output = state
        .auth_service
        .refresh(token)
        .await
        .map_err(|error| ApiError::new(error, uri.path()))?;

    Ok(Json(LoginResponse {
        token: output.token,
        group_id: output.group_id.to_string(),
        resource_count: output.resource_count,
        expires_in: output.expires_in,
    }))
}

/// POST /auth/logout - Revoke a live token.
pub async fn logout_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let token = bearer_token(&headers).map_err(|error| ApiError::new(error, uri.path()))?;

    state
        .auth_service
        .logout(token)
        .await
        .map_err(|error| ApiError::new(error, uri.path()))?;

    Ok(StatusCode::NO_CONTENT)
}

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use graphscope_core::{AppError, AppResult};

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, CallerContext};

/// Validates the bearer token, resolves its scope, and attaches the caller
/// context to the request.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let path = request.uri().path().to_owned();

    let token = bearer_token(request.headers())
        .map_err(|error| ApiError::new(error, path.clone()))?
        .to_owned();

    let (claims, scope) = state
        .auth_service
        .authenticate(&token)
        .await
        .map_err(|error| ApiError::new(error, path))?;

    request.extensions_mut().insert(CallerContext { claims, scope });
    Ok(next.run(request).await)
}

/// Gates admin routes behind the configured admin key.
pub async fn require_admin_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let supplied = request
        .headers()
        .get("x-admin-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if supplied.is_empty() || supplied != state.admin_api_key {
        let path = request.uri().path().to_owned();
        return Err(ApiError::new(
            AppError::InvalidCredentials("admin key required".to_owned()),
            path,
        ));
    }

    Ok(next.run(request).await)
}

/// Extracts the bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::TokenMalformed("missing bearer token".to_owned()))?;

    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::TokenMalformed("authorization header is not a bearer token".to_owned()))
}

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::Response;
use graphscope_application::{ApiVersion, UpstreamRequest, UpstreamResponse};
use graphscope_core::AppError;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, CallerContext};

/// Upper bound on buffered request bodies.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// ANY /v1.0/{*path} - Transparent scoped proxy against the stable API.
pub async fn proxy_v1_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    proxy(state, ApiVersion::V1, path, request).await
}

/// ANY /beta/{*path} - Transparent scoped proxy against the beta API.
pub async fn proxy_beta_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    proxy(state, ApiVersion::Beta, path, request).await
}

async fn proxy(
    state: AppState,
    version: ApiVersion,
    path: String,
    request: Request,
) -> ApiResult<Response> {
    let request_path = request.uri().path().to_owned();

    let caller = request
        .extensions()
        .get::<CallerContext>()
        .cloned()
        .ok_or_else(|| {
            ApiError::new(
                AppError::Internal("caller context missing on proxied route".to_owned()),
                request_path.clone(),
            )
        })?;

    let method = request.method().as_str().to_owned();
    let query = request.uri().query().map(str::to_owned);
    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let headers = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_owned(), value.to_owned()))
        })
        .collect();

    let body = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|error| {
            ApiError::new(
                AppError::Validation(format!("failed to read request body: {error}")),
                request_path.clone(),
            )
        })?
        .to_vec();

    let upstream_request = UpstreamRequest {
        method,
        version,
        path,
        query,
        headers,
        correlation_id: correlation_id.clone(),
        body,
    };

    tracing::debug!(
        subject = %caller.claims.sub,
        group_id = %caller.claims.gid,
        correlation_id = %correlation_id,
        path = %request_path,
        "proxying upstream call"
    );

    let response = state
        .proxy_service
        .handle(upstream_request, &caller.scope)
        .await
        .map_err(|error| ApiError::new(error, request_path.clone()))?;

    build_response(response, &correlation_id)
        .map_err(|error| ApiError::new(error, request_path))
}

fn build_response(
    upstream: UpstreamResponse,
    correlation_id: &str,
) -> Result<Response, AppError> {
    let status = StatusCode::from_u16(upstream.status)
        .map_err(|error| AppError::Internal(format!("invalid upstream status: {error}")))?;

    let mut builder = Response::builder().status(status);

    for (name, value) in &upstream.headers {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) else {
            continue;
        };
        builder = builder.header(name, value);
    }

    if let Some(content_type) = &upstream.content_type {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            builder = builder.header(header::CONTENT_TYPE, value);
        }
    }
    if let Ok(value) = HeaderValue::from_str(correlation_id) {
        builder = builder.header("x-correlation-id", value);
    }

    builder
        .body(Body::from(upstream.body))
        .map_err(|error| AppError::Internal(format!("failed to build response: {error}")))
}

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use redis::AsyncCommands;

use crate::dto::{HealthDependencyStatus, HealthResponse};
use crate::state::AppState;

/// GET /admin/health - Liveness and upstream reachability.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let upstream = check_upstream(&state).await;
    let cache = check_cache(state.redis_client.clone()).await;

    let ready = is_healthy(upstream.status) && is_healthy(cache.status);
    let status = if ready { "ok" } else { "degraded" };
    let http_status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status,
            ready,
            upstream,
            cache,
        }),
    )
}

fn is_healthy(status: &str) -> bool {
    status == "ok" || status == "disabled"
}

/// Upstream reachability is probed through the credential provider; a
/// cached bearer keeps this check cheap between refreshes.
async fn check_upstream(state: &AppState) -> HealthDependencyStatus {
    match state.credential_provider.bearer_token().await {
        Ok(_) => HealthDependencyStatus {
            status: "ok",
            detail: None,
        },
        Err(error) => HealthDependencyStatus {
            status: "error",
            detail: Some(format!("upstream credential check failed: {error}")),
        },
    }
}

async fn check_cache(redis_client: Option<redis::Client>) -> HealthDependencyStatus {
    let Some(redis_client) = redis_client else {
        // In-memory backend has no external dependency to probe.
        return HealthDependencyStatus {
            status: "disabled",
            detail: None,
        };
    };

    let mut connection = match redis_client.get_multiplexed_async_connection().await {
        Ok(connection) => connection,
        Err(error) => {
            return HealthDependencyStatus {
                status: "error",
                detail: Some(format!("redis connection failed: {error}")),
            };
        }
    };

    match connection.ping::<String>().await {
        Ok(value) if value.eq_ignore_ascii_case("pong") => HealthDependencyStatus {
            status: "ok",
            detail: None,
        },
        Ok(value) => HealthDependencyStatus {
            status: "error",
            detail: Some(format!("unexpected redis ping response: {value}")),
        },
        Err(error) => HealthDependencyStatus {
            status: "error",
            detail: Some(format!("redis ping failed: {error}")),
        },
    }
}

use axum::Json;
use axum::extract::{OriginalUri, Path, State};
use graphscope_core::GroupId;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Result of a group-wide scope invalidation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRefreshResponse {
    pub group_id: String,
    pub evicted_scopes: usize,
}

/// POST /admin/refresh/{group_id} - Invalidate all cached scopes for a group.
///
/// Token holders whose scope was evicted get `ScopeMissing` on their next
/// call and must log in again, picking up current membership.
pub async fn refresh_group_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(group_id): Path<String>,
) -> ApiResult<Json<GroupRefreshResponse>> {
    let group_id =
        GroupId::new(group_id).map_err(|error| ApiError::new(error, uri.path()))?;

    let evicted_scopes = state
        .auth_service
        .invalidate_group(&group_id)
        .await
        .map_err(|error| ApiError::new(error, uri.path()))?;

    Ok(Json(GroupRefreshResponse {
        group_id: group_id.to_string(),
        evicted_scopes,
    }))
}

use serde::{Deserialize, Serialize};

/// Incoming payload for the API-key login exchange.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub api_key: String,
    pub group_id: String,
}

/// Bearer token response for login and refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub group_id: String,
    pub resource_count: usize,
    pub expires_in: i64,
}

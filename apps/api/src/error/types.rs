use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Inner error payload of the wire envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    code: &'static str,
    message: String,
    status_code: u16,
    path: String,
    timestamp: String,
}

/// API error envelope: `{"error":{...}}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    error: ErrorBody,
}

impl ErrorResponse {
    pub(super) fn new(
        code: &'static str,
        message: String,
        status_code: u16,
        path: String,
    ) -> Self {
        Self {
            error: ErrorBody {
                code,
                message,
                status_code,
                path,
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        }
    }
}

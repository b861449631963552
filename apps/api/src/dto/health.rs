use serde::Serialize;

/// Status of one health-checked dependency.
#[derive(Debug, Serialize)]
pub struct HealthDependencyStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Liveness and upstream reachability report.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub upstream: HealthDependencyStatus,
    pub cache: HealthDependencyStatus,
}

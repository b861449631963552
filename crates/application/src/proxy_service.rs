//! Upstream forwarding pipeline: authorize, forward, filter.

use std::sync::Arc;

use async_trait::async_trait;
use graphscope_core::{AppError, AppResult};
use graphscope_domain::{AccessDecision, Scope, decide_access, filter_body};

/// Upstream API version selected by the dispatching route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
    Beta,
}

impl ApiVersion {
    /// Returns the upstream URL segment for this version.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1.0",
            Self::Beta => "beta",
        }
    }
}

/// A proxied request, already stripped of the inbound authorization.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: String,
    pub version: ApiVersion,
    /// Path after the version segment, no leading slash.
    pub path: String,
    /// Raw query string, retained verbatim.
    pub query: Option<String>,
    /// Forwardable inbound headers (hop-by-hop headers removed by the gateway).
    pub headers: Vec<(String, String)>,
    /// Correlation id attached to the upstream call.
    pub correlation_id: String,
    pub body: Vec<u8>,
}

/// An upstream response ready for the serving layer.
///
/// Framing headers (`content-length`, `content-type`, `transfer-encoding`,
/// `connection`) are stripped from `headers` by the gateway; the serving
/// layer recomputes them, using `content_type` for the latter.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    /// Returns whether the upstream reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Gateway port forwarding requests to the upstream API with app
/// credentials attached.
#[async_trait]
pub trait UpstreamGateway: Send + Sync {
    async fn forward(&self, request: UpstreamRequest) -> AppResult<UpstreamResponse>;
}

/// Source of upstream app-credential bearer strings. The provider caches
/// and refreshes; callers treat it as an opaque token source.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn bearer_token(&self) -> AppResult<String>;
}

/// Application service running the authorize → forward → filter pipeline.
#[derive(Clone)]
pub struct ProxyService {
    upstream: Arc<dyn UpstreamGateway>,
}

impl ProxyService {
    /// Creates a new proxy service.
    #[must_use]
    pub fn new(upstream: Arc<dyn UpstreamGateway>) -> Self {
        Self { upstream }
    }

    /// Handles one proxied call for a caller bound to `scope`.
    ///
    /// A denial short-circuits before any upstream traffic. Collection
    /// responses are filtered only on upstream success; error payloads
    /// pass through untouched for the client to inspect.
    pub async fn handle(
        &self,
        request: UpstreamRequest,
        scope: &Scope,
    ) -> AppResult<UpstreamResponse> {
        let decision = decide_access(&request.path, scope);

        let filter = match decision {
            AccessDecision::Deny { resource } => {
                return Err(AppError::OutOfScope(resource));
            }
            AccessDecision::FilterCollection => true,
            AccessDecision::Allow => false,
        };

        let mut response = self.upstream.forward(request).await?;

        if filter && response.is_success() {
            response.body = filter_body(&response.body, scope);
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use graphscope_core::{AppError, AppResult, GroupId};
    use graphscope_domain::{Resource, ResourceKind, Scope};
    use serde_json::json;

    use super::{ApiVersion, ProxyService, UpstreamGateway, UpstreamRequest, UpstreamResponse};

    struct FakeUpstream {
        response: UpstreamResponse,
        forwarded: Mutex<Vec<UpstreamRequest>>,
    }

    impl FakeUpstream {
        fn with_body(status: u16, body: Vec<u8>) -> Self {
            Self {
                response: UpstreamResponse {
                    status,
                    headers: vec![("x-upstream".to_owned(), "1".to_owned())],
                    content_type: Some("application/json".to_owned()),
                    body,
                },
                forwarded: Mutex::new(Vec::new()),
            }
        }

        fn forwarded_count(&self) -> usize {
            self.forwarded.lock().map(|calls| calls.len()).unwrap_or(0)
        }
    }

    #[async_trait]
    impl UpstreamGateway for FakeUpstream {
        async fn forward(&self, request: UpstreamRequest) -> AppResult<UpstreamResponse> {
            self.forwarded
                .lock()
                .map_err(|error| AppError::Internal(format!("failed to lock fake state: {error}")))?
                .push(request);
            Ok(self.response.clone())
        }
    }

    fn scope() -> Scope {
        let now = Utc::now();
        Scope::new(
            GroupId::new("G1").expect("valid group"),
            vec![Resource {
                id: "r1".to_owned(),
                mail: Some("room-a@x".to_owned()),
                kind: ResourceKind::Room,
                display_name: None,
                capacity: None,
                location: None,
            }],
            now,
            now + Duration::seconds(900),
        )
    }

    fn request(path: &str) -> UpstreamRequest {
        UpstreamRequest {
            method: "GET".to_owned(),
            version: ApiVersion::V1,
            path: path.to_owned(),
            query: None,
            headers: Vec::new(),
            correlation_id: "test-correlation".to_owned(),
            body: Vec::new(),
        }
    }

    #[tokio::test]
    async fn denial_makes_no_upstream_call() {
        let upstream = Arc::new(FakeUpstream::with_body(200, Vec::new()));
        let service = ProxyService::new(upstream.clone());

        let error = service
            .handle(request("users/bob@x/calendar/events"), &scope())
            .await
            .expect_err("must deny");

        assert!(matches!(error, AppError::OutOfScope(resource) if resource == "bob@x"));
        assert_eq!(upstream.forwarded_count(), 0);
    }

    #[tokio::test]
    async fn collection_response_is_filtered() {
        let body = serde_json::to_vec(&json!({
            "@odata.nextLink": "https://upstream/next",
            "value": [{"id": "r1"}, {"id": "r9"}],
        }))
        .expect("serializable");
        let upstream = Arc::new(FakeUpstream::with_body(200, body));
        let service = ProxyService::new(upstream.clone());

        let response = service
            .handle(request("places/microsoft.graph.room"), &scope())
            .await
            .expect("forwards");

        let parsed: serde_json::Value =
            serde_json::from_slice(&response.body).expect("valid JSON");
        assert_eq!(parsed["@odata.nextLink"], "https://upstream/next");
        assert_eq!(parsed["value"].as_array().map(Vec::len), Some(1));
        assert_eq!(upstream.forwarded_count(), 1);
    }

    #[tokio::test]
    async fn upstream_errors_pass_through_unfiltered() {
        let body = br#"{"error":{"code":"itemNotFound"}}"#.to_vec();
        let upstream = Arc::new(FakeUpstream::with_body(404, body.clone()));
        let service = ProxyService::new(upstream);

        let response = service
            .handle(request("places/microsoft.graph.room"), &scope())
            .await
            .expect("forwards");

        assert_eq!(response.status, 404);
        assert_eq!(response.body, body);
    }

    #[tokio::test]
    async fn allowed_non_collection_body_is_byte_identical() {
        let body = br#"{"id":"r1",  "subject":"standup"}   "#.to_vec();
        let upstream = Arc::new(FakeUpstream::with_body(200, body.clone()));
        let service = ProxyService::new(upstream);

        let response = service
            .handle(request("users/r1/events/abc"), &scope())
            .await
            .expect("forwards");

        assert_eq!(response.body, body);
    }
}

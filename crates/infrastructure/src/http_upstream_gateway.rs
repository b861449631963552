//! Reqwest-based upstream forwarder for proxied calls.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use graphscope_application::{
    CredentialProvider, UpstreamGateway, UpstreamRequest, UpstreamResponse,
};
use graphscope_core::{AppError, AppResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Hop-by-hop and replaced headers that never travel upstream.
const SKIPPED_REQUEST_HEADERS: &[&str] = &[
    "host",
    "authorization",
    "content-length",
    "transfer-encoding",
    "connection",
    "te",
    "trailer",
    "upgrade",
    "proxy-authenticate",
    "proxy-authorization",
];

/// Framing headers the serving layer recomputes instead of copying.
const SKIPPED_RESPONSE_HEADERS: &[&str] = &[
    "content-length",
    "content-type",
    "transfer-encoding",
    "connection",
];

/// Upstream gateway forwarding proxied calls with app credentials.
pub struct HttpUpstreamGateway {
    http_client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
    base_url: String,
    call_timeout: Duration,
}

impl HttpUpstreamGateway {
    /// Creates a gateway against `base_url` (no trailing slash) with a
    /// per-call deadline.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        credentials: Arc<dyn CredentialProvider>,
        base_url: impl Into<String>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            credentials,
            base_url: base_url.into(),
            call_timeout,
        }
    }

    fn upstream_url(&self, request: &UpstreamRequest) -> String {
        let mut url = format!(
            "{}/{}/{}",
            self.base_url,
            request.version.as_str(),
            request.path
        );
        if let Some(query) = &request.query {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

#[async_trait]
impl UpstreamGateway for HttpUpstreamGateway {
    async fn forward(&self, request: UpstreamRequest) -> AppResult<UpstreamResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|error| {
            AppError::Validation(format!("invalid HTTP method '{}': {error}", request.method))
        })?;
        let url = self.upstream_url(&request);
        let bearer = self.credentials.bearer_token().await?;

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            if SKIPPED_REQUEST_HEADERS.contains(&name.to_lowercase().as_str()) {
                continue;
            }
            let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
                continue;
            };
            let Ok(header_value) = HeaderValue::from_str(value) else {
                continue;
            };
            headers.insert(header_name, header_value);
        }

        let response = self
            .http_client
            .request(method, url)
            .headers(headers)
            .bearer_auth(bearer)
            .header("X-Correlation-ID", request.correlation_id.as_str())
            .body(request.body)
            .timeout(self.call_timeout)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    AppError::UpstreamTimeout(format!("upstream call exceeded deadline: {error}"))
                } else {
                    AppError::UpstreamUnavailable(format!("upstream transport failure: {error}"))
                }
            })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !SKIPPED_RESPONSE_HEADERS.contains(&name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_owned(), value.to_owned()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    AppError::UpstreamTimeout(format!("upstream body read timed out: {error}"))
                } else {
                    AppError::UpstreamUnavailable(format!("upstream body read failed: {error}"))
                }
            })?
            .to_vec();

        Ok(UpstreamResponse {
            status,
            headers,
            content_type,
            body,
        })
    }
}

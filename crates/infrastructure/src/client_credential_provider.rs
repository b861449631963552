//! OAuth2 client-credentials provider for upstream app bearers.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use graphscope_application::CredentialProvider;
use graphscope_core::{AppError, AppResult};
use serde::Deserialize;
use tokio::sync::RwLock;

/// Refresh this far ahead of expiry so in-flight calls never carry a
/// bearer that dies mid-request.
const REFRESH_MARGIN: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
struct CachedBearer {
    bearer: String,
    expires_at: Instant,
}

impl CachedBearer {
    fn is_fresh(&self) -> bool {
        self.expires_at > Instant::now() + REFRESH_MARGIN
    }
}

#[derive(Debug, Deserialize)]
struct TokenEndpointPayload {
    access_token: String,
    expires_in: u64,
}

/// App-credential source backed by the tenant token endpoint.
///
/// Caches the bearer in process and refreshes it ahead of expiry;
/// concurrent callers share a single refresh.
pub struct ClientCredentialProvider {
    http_client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cached: RwLock<Option<CachedBearer>>,
}

impl ClientCredentialProvider {
    /// Creates a provider for the given tenant and client credentials.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        tenant_id: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        upstream_scope: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            token_url: format!(
                "https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/token"
            ),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: upstream_scope.into(),
            cached: RwLock::new(None),
        }
    }

    async fn request_bearer(&self) -> AppResult<CachedBearer> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|error| {
                AppError::UpstreamUnavailable(format!("token endpoint unreachable: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamUnavailable(format!(
                "token endpoint returned status {status}"
            )));
        }

        let payload: TokenEndpointPayload = response.json().await.map_err(|error| {
            AppError::UpstreamUnavailable(format!("invalid token endpoint payload: {error}"))
        })?;

        let now = Instant::now();
        Ok(CachedBearer {
            bearer: payload.access_token,
            expires_at: now
                .checked_add(Duration::from_secs(payload.expires_in))
                .unwrap_or(now),
        })
    }
}

#[async_trait]
impl CredentialProvider for ClientCredentialProvider {
    async fn bearer_token(&self) -> AppResult<String> {
        {
            let cached = self.cached.read().await;
            if let Some(bearer) = cached.as_ref().filter(|bearer| bearer.is_fresh()) {
                return Ok(bearer.bearer.clone());
            }
        }

        let mut cached = self.cached.write().await;
        if let Some(bearer) = cached.as_ref().filter(|bearer| bearer.is_fresh()) {
            return Ok(bearer.bearer.clone());
        }

        let refreshed = self.request_bearer().await?;
        let bearer = refreshed.bearer.clone();
        *cached = Some(refreshed);

        Ok(bearer)
    }
}

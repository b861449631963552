//! GraphScopeProxy API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::sync::Arc;
use std::time::Duration;

use graphscope_application::{
    ApiKeyBindings, AuthService, CredentialProvider, ProxyService, ScopeCache, ScopeService,
    ScopeServiceConfig, TokenService, TokenServiceConfig,
};
use graphscope_core::AppError;
use graphscope_domain::AdmissionPolicy;
use graphscope_infrastructure::{
    ClientCredentialProvider, GraphDirectoryGateway, HttpUpstreamGateway, InMemoryScopeCache,
    RedisScopeCache,
};
use tracing::info;

use crate::api_config::{ApiConfig, CacheBackendConfig};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    api_config::init_tracing();

    let config = ApiConfig::load()?;

    let http_client = reqwest::Client::builder()
        .build()
        .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

    let credential_provider: Arc<dyn CredentialProvider> = Arc::new(ClientCredentialProvider::new(
        http_client.clone(),
        &config.tenant_id,
        config.client_id.clone(),
        config.client_secret.clone(),
        format!("{}/.default", config.upstream_base_url),
    ));

    let redis_client = match config.cache_backend {
        CacheBackendConfig::Memory => None,
        CacheBackendConfig::Distributed => {
            let redis_url = config.redis_url.clone().ok_or_else(|| {
                AppError::Validation("REDIS_URL is required when CACHE_BACKEND=distributed".to_owned())
            })?;
            let client = redis::Client::open(redis_url).map_err(|error| {
                AppError::Validation(format!("invalid REDIS_URL: {error}"))
            })?;
            Some(client)
        }
    };

    let scope_cache: Arc<dyn ScopeCache> = match &redis_client {
        Some(client) => Arc::new(RedisScopeCache::new(client.clone(), "graphscope")),
        None => Arc::new(InMemoryScopeCache::new()),
    };

    let directory_gateway = Arc::new(GraphDirectoryGateway::new(
        http_client.clone(),
        credential_provider.clone(),
        config.upstream_base_url.clone(),
    ));
    let scope_service = ScopeService::new(
        directory_gateway,
        ScopeServiceConfig {
            admission_policy: AdmissionPolicy::new(
                config.allowed_place_types.clone(),
                config.allow_generic_resources,
            ),
            max_scope_size: config.max_scope_size,
            use_places_api: config.use_places_api,
            scope_ttl: Duration::from_secs(config.scope_cache_ttl_seconds),
        },
    );

    let token_service = Arc::new(TokenService::new(TokenServiceConfig {
        signing_key: config.jwt_signing_key.clone().into_bytes(),
        issuer: config.jwt_issuer.clone(),
        audience: config.jwt_audience.clone(),
        token_lifetime_secs: config.jwt_expiration_seconds,
    })?);

    let auth_service = AuthService::new(
        ApiKeyBindings::new(config.api_keys.clone()),
        scope_service,
        token_service,
        scope_cache,
    );

    let upstream_gateway = Arc::new(HttpUpstreamGateway::new(
        http_client,
        credential_provider.clone(),
        config.upstream_base_url.clone(),
        Duration::from_secs(config.upstream_timeout_seconds),
    ));
    let proxy_service = ProxyService::new(upstream_gateway);

    let app_state = AppState {
        auth_service,
        proxy_service,
        credential_provider,
        admin_api_key: config.admin_api_key.clone(),
        redis_client,
    };

    let app = api_router::build_router(app_state);

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, upstream = %config.upstream_base_url, "graphscope-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

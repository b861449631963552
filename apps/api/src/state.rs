use std::sync::Arc;

use graphscope_application::{AuthService, CredentialProvider, ProxyService, TokenClaims};
use graphscope_domain::Scope;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub proxy_service: ProxyService,
    pub credential_provider: Arc<dyn CredentialProvider>,
    pub admin_api_key: String,
    pub redis_client: Option<redis::Client>,
}

/// Authenticated caller resolved by the bearer middleware and threaded to
/// the proxy handlers through request extensions.
#[derive(Clone)]
pub struct CallerContext {
    pub claims: TokenClaims,
    pub scope: Scope,
}

//! Application services and ports.

#![forbid(unsafe_code)]

mod auth_service;
mod proxy_service;
mod scope_service;
mod token_service;

pub use auth_service::{ApiKeyBindings, AuthService, LoginOutput};
pub use proxy_service::{
    ApiVersion, CredentialProvider, ProxyService, UpstreamGateway, UpstreamRequest,
    UpstreamResponse,
};
pub use scope_service::{
    DirectoryGateway, MemberPage, PlaceRecord, ScopeCache, ScopeService, ScopeServiceConfig,
};
pub use token_service::{MintedToken, TokenClaims, TokenService, TokenServiceConfig};

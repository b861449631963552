//! Infrastructure adapters implementing the application ports.

#![forbid(unsafe_code)]

mod client_credential_provider;
mod graph_directory_gateway;
mod http_upstream_gateway;
mod in_memory_scope_cache;
mod redis_scope_cache;

pub use client_credential_provider::ClientCredentialProvider;
pub use graph_directory_gateway::GraphDirectoryGateway;
pub use http_upstream_gateway::HttpUpstreamGateway;
pub use in_memory_scope_cache::InMemoryScopeCache;
pub use redis_scope_cache::RedisScopeCache;

use std::collections::{HashMap, HashSet};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use graphscope_core::{AppError, GroupId};
use graphscope_domain::ResourceKind;
use tracing_subscriber::EnvFilter;

/// Scope cache backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendConfig {
    Memory,
    Distributed,
}

/// Validated runtime configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub upstream_base_url: String,
    pub upstream_timeout_seconds: u64,
    pub jwt_signing_key: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_expiration_seconds: u64,
    pub allowed_place_types: HashSet<ResourceKind>,
    pub allow_generic_resources: bool,
    pub max_scope_size: usize,
    pub use_places_api: bool,
    pub scope_cache_ttl_seconds: u64,
    pub cache_backend: CacheBackendConfig,
    pub redis_url: Option<String>,
    pub api_keys: HashMap<String, Vec<GroupId>>,
    pub admin_api_key: String,
    pub api_host: String,
    pub api_port: u16,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let tenant_id = required_credential_env("TENANT_ID")?;
        let client_id = required_credential_env("CLIENT_ID")?;
        let client_secret = required_credential_env("CLIENT_SECRET")?;

        let upstream_base_url = env::var("UPSTREAM_BASE_URL")
            .unwrap_or_else(|_| "https://graph.microsoft.com".to_owned())
            .trim_end_matches('/')
            .to_owned();
        url::Url::parse(&upstream_base_url).map_err(|error| {
            AppError::Validation(format!("invalid UPSTREAM_BASE_URL: {error}"))
        })?;
        let upstream_timeout_seconds = parse_env_u64("UPSTREAM_TIMEOUT_SECONDS", 30)?;

        let jwt_signing_key = required_env("JWT_SIGNING_KEY")?;
        if jwt_signing_key.len() < 32 {
            return Err(AppError::Validation(
                "JWT_SIGNING_KEY must be at least 32 bytes".to_owned(),
            ));
        }
        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "graphscope-proxy".to_owned());
        let jwt_audience =
            env::var("JWT_AUDIENCE").unwrap_or_else(|_| "graphscope-clients".to_owned());
        let jwt_expiration_seconds = parse_env_u64("JWT_EXPIRATION_SECONDS", 900)?;

        let allowed_place_types = parse_place_types(
            &env::var("ALLOWED_PLACE_TYPES")
                .unwrap_or_else(|_| "room,workspace,equipment".to_owned()),
        )?;
        let allow_generic_resources = parse_env_bool("ALLOW_GENERIC_RESOURCES", false);
        let max_scope_size = parse_env_usize("MAX_SCOPE_SIZE", 500)?;
        if max_scope_size == 0 {
            return Err(AppError::Validation(
                "MAX_SCOPE_SIZE must be greater than zero".to_owned(),
            ));
        }
        let use_places_api = parse_env_bool("USE_PLACES_API", true);
        let scope_cache_ttl_seconds = parse_env_u64("SCOPE_CACHE_TTL_SECONDS", 900)?;

        let cache_backend = match env::var("CACHE_BACKEND").unwrap_or_else(|_| "memory".to_owned())
        {
            value if value.eq_ignore_ascii_case("memory") => CacheBackendConfig::Memory,
            value if value.eq_ignore_ascii_case("distributed") => CacheBackendConfig::Distributed,
            other => {
                return Err(AppError::Validation(format!(
                    "CACHE_BACKEND must be either 'memory' or 'distributed', got '{other}'"
                )));
            }
        };
        let redis_url = env::var("REDIS_URL")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        if cache_backend == CacheBackendConfig::Distributed && redis_url.is_none() {
            return Err(AppError::Validation(
                "REDIS_URL is required when CACHE_BACKEND=distributed".to_owned(),
            ));
        }

        let api_keys = parse_api_keys(&required_env("API_KEYS")?)?;
        let admin_api_key = required_env("ADMIN_API_KEY")?;

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        Ok(Self {
            tenant_id,
            client_id,
            client_secret,
            upstream_base_url,
            upstream_timeout_seconds,
            jwt_signing_key,
            jwt_issuer,
            jwt_audience,
            jwt_expiration_seconds,
            allowed_place_types,
            allow_generic_resources,
            max_scope_size,
            use_places_api,
            scope_cache_ttl_seconds,
            cache_backend,
            redis_url,
            api_keys,
            admin_api_key,
            api_host,
            api_port,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

/// Parses the `API_KEYS` JSON map of `apiKey -> [groupId, ...]`.
fn parse_api_keys(raw: &str) -> Result<HashMap<String, Vec<GroupId>>, AppError> {
    let parsed: HashMap<String, Vec<String>> = serde_json::from_str(raw)
        .map_err(|error| AppError::Validation(format!("invalid API_KEYS JSON: {error}")))?;

    if parsed.is_empty() {
        return Err(AppError::Validation(
            "API_KEYS must bind at least one key".to_owned(),
        ));
    }

    parsed
        .into_iter()
        .map(|(api_key, groups)| {
            if api_key.trim().is_empty() {
                return Err(AppError::Validation(
                    "API_KEYS contains an empty key".to_owned(),
                ));
            }
            let groups = groups
                .into_iter()
                .map(GroupId::new)
                .collect::<Result<Vec<_>, _>>()?;
            Ok((api_key, groups))
        })
        .collect()
}

fn parse_place_types(raw: &str) -> Result<HashSet<ResourceKind>, AppError> {
    let kinds = raw
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ResourceKind::from_str)
        .collect::<Result<HashSet<_>, _>>()?;

    if kinds.is_empty() {
        return Err(AppError::Validation(
            "ALLOWED_PLACE_TYPES must name at least one place type".to_owned(),
        ));
    }

    Ok(kinds)
}

fn required_env(name: &str) -> Result<String, AppError> {
    let value =
        env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

/// Upstream credentials must be real: placeholder values left over from a
/// config template fail loudly instead of silently degrading.
fn required_credential_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    let lowered = value.to_lowercase();
    if lowered == "changeme" || lowered == "placeholder" || lowered.starts_with("your-") {
        return Err(AppError::Validation(format!(
            "{name} looks like a placeholder value"
        )));
    }

    Ok(value)
}

fn parse_env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => value.eq_ignore_ascii_case("true"),
        Err(_) => default,
    }
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, AppError> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, AppError> {
    match env::var(name) {
        Ok(value) => value.parse::<usize>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

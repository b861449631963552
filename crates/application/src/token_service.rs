//! Bearer token issuance, validation, and revocation.
//!
//! Tokens are HS256 JWTs whose `jti` claim is the scope-cache key; the
//! token itself never carries scope contents. Revocation is an in-process
//! set of token ids that pre-empts otherwise-valid signatures until the
//! token's natural expiry.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use graphscope_core::{AppError, AppResult, GroupId};
use graphscope_domain::Scope;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Maximum tolerated clock skew when validating time claims.
const CLOCK_SKEW_SECONDS: u64 = 300;

/// JWT claims embedded in every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject — the API key handle, never the secret.
    pub sub: String,
    /// Unique token id; keys the scope cache.
    pub jti: String,
    /// Group whose membership produced the scope. Advisory.
    pub gid: String,
    /// Resource count at mint time. Advisory.
    pub rc: usize,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// A freshly minted token plus the claims it carries.
#[derive(Debug, Clone)]
pub struct MintedToken {
    pub token: String,
    pub claims: TokenClaims,
}

impl MintedToken {
    /// Seconds until expiry, measured from issue time.
    #[must_use]
    pub fn expires_in(&self) -> i64 {
        self.claims.exp - self.claims.iat
    }
}

/// Signing configuration for the token service.
#[derive(Debug, Clone)]
pub struct TokenServiceConfig {
    pub signing_key: Vec<u8>,
    pub issuer: String,
    pub audience: String,
    pub token_lifetime_secs: u64,
}

/// Application service minting and validating bearer tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    token_lifetime_secs: u64,
    revoked: RwLock<HashMap<String, i64>>,
}

impl TokenService {
    /// Creates a token service from signing configuration.
    ///
    /// The signing key must provide at least 256 bits of material.
    pub fn new(config: TokenServiceConfig) -> AppResult<Self> {
        if config.signing_key.len() < 32 {
            return Err(AppError::Validation(
                "JWT signing key must be at least 32 bytes".to_owned(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&config.signing_key),
            decoding_key: DecodingKey::from_secret(&config.signing_key),
            issuer: config.issuer,
            audience: config.audience,
            token_lifetime_secs: config.token_lifetime_secs,
            revoked: RwLock::new(HashMap::new()),
        })
    }

    /// Mints a signed bearer token for `subject` over `scope`.
    pub fn mint(&self, subject: &str, group_id: &GroupId, scope: &Scope) -> AppResult<MintedToken> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: subject.to_owned(),
            jti: generate_token_id()?,
            gid: group_id.to_string(),
            rc: scope.resource_count(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + self.token_lifetime_secs as i64,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|error| AppError::Internal(format!("JWT encode failed: {error}")))?;

        Ok(MintedToken { token, claims })
    }

    /// Decodes and verifies a bearer token, then checks the revocation set.
    pub async fn validate(&self, token: &str) -> AppResult<TokenClaims> {
        let claims = self.decode(token, true)?;

        let now = Utc::now().timestamp();
        if claims.iat > now + CLOCK_SKEW_SECONDS as i64 {
            return Err(AppError::TokenMalformed("token issued in the future".to_owned()));
        }

        if self.is_revoked(&claims.jti).await {
            return Err(AppError::TokenRevoked);
        }

        Ok(claims)
    }

    /// Revokes a token by inserting its `jti` into the revocation set.
    ///
    /// The signature must verify, but an already-expired token is accepted
    /// (revoking it is a no-op that still returns `true`). Idempotent.
    pub async fn revoke(&self, token: &str) -> AppResult<bool> {
        let claims = self.decode(token, false)?;

        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.write().await;
        // Revocation entries self-expire at their token's own expiry.
        revoked.retain(|_, expiry| *expiry > now);
        if claims.exp > now {
            revoked.insert(claims.jti, claims.exp);
        }

        Ok(true)
    }

    /// Returns whether `token_id` is currently revoked.
    pub async fn is_revoked(&self, token_id: &str) -> bool {
        let now = Utc::now().timestamp();
        let revoked = self.revoked.read().await;
        revoked.get(token_id).is_some_and(|expiry| *expiry > now)
    }

    fn decode(&self, token: &str, validate_exp: bool) -> AppResult<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["sub", "jti", "exp", "iat", "iss", "aud"]);
        validation.leeway = CLOCK_SKEW_SECONDS;
        validation.validate_exp = validate_exp;

        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|error| match error.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::SignatureInvalid(error.to_string())
                }
                _ => AppError::TokenMalformed(error.to_string()),
            })
    }
}

/// Generates a URL-safe token id with 128 bits of CSPRNG entropy.
fn generate_token_id() -> AppResult<String> {
    let mut bytes = [0u8; 16];
    getrandom::fill(&mut bytes)
        .map_err(|error| AppError::Internal(format!("failed to generate token id: {error}")))?;

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

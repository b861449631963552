//! Shared primitives for all Rust crates in GraphScopeProxy.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across GraphScopeProxy crates.
pub type AppResult<T> = Result<T, AppError>;

/// Directory group identifier.
///
/// Upstream group identifiers are opaque strings (usually GUIDs) and are
/// compared case-insensitively everywhere in the proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupId(String);

impl GroupId {
    /// Creates a validated group identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "group id must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for GroupId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for GroupId {}

impl std::hash::Hash for GroupId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

impl Display for GroupId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
///
/// Inner components surface these typed errors up the call chain; they are
/// recovered only at the transport boundary, where each variant maps to one
/// wire error code and HTTP status.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown API key, or API key not bound to the requested group.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Bearer token could not be parsed.
    #[error("malformed token: {0}")]
    TokenMalformed(String),

    /// Bearer token signature did not verify.
    #[error("invalid token signature: {0}")]
    SignatureInvalid(String),

    /// Bearer token is past its expiry.
    #[error("token expired")]
    TokenExpired,

    /// Bearer token was explicitly revoked before its expiry.
    #[error("token revoked")]
    TokenRevoked,

    /// Token verified but its scope is no longer cached.
    #[error("scope missing: {0}")]
    ScopeMissing(String),

    /// Requested resource is outside the caller's scope.
    #[error("resource '{0}' is not in the authorized scope")]
    OutOfScope(String),

    /// Group membership yielded zero admissible resources.
    #[error("group '{0}' contains no admissible resources")]
    EmptyScope(String),

    /// Upstream call exceeded its deadline.
    #[error("upstream request timed out: {0}")]
    UpstreamTimeout(String),

    /// Upstream enumeration or transport failure.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Internal unexpected error. The message is logged, never served.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the stable wire error code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation",
            Self::InvalidCredentials(_) => "InvalidCredentials",
            Self::TokenMalformed(_) => "TokenMalformed",
            Self::SignatureInvalid(_) => "SignatureInvalid",
            Self::TokenExpired => "TokenExpired",
            Self::TokenRevoked => "TokenRevoked",
            Self::ScopeMissing(_) => "ScopeMissing",
            Self::OutOfScope(_) => "OutOfScope",
            Self::EmptyScope(_) => "EmptyScope",
            Self::UpstreamTimeout(_) => "RequestTimeout",
            Self::UpstreamUnavailable(_) => "UpstreamUnavailable",
            Self::Internal(_) => "InternalError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, GroupId};

    #[test]
    fn group_id_rejects_whitespace() {
        assert!(GroupId::new("   ").is_err());
    }

    #[test]
    fn group_id_compares_case_insensitively() {
        let lower = GroupId::new("abc-123").expect("valid id");
        let upper = GroupId::new("ABC-123").expect("valid id");
        assert_eq!(lower, upper);
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(AppError::TokenExpired.code(), "TokenExpired");
        assert_eq!(
            AppError::OutOfScope("bob@x".to_owned()).code(),
            "OutOfScope"
        );
        assert_eq!(
            AppError::UpstreamTimeout("deadline".to_owned()).code(),
            "RequestTimeout"
        );
    }
}

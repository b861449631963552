use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use graphscope_core::AppError;

mod types;

pub use types::{ErrorBody, ErrorResponse};

/// HTTP API error wrapper around core application errors, carrying the
/// request path for the wire envelope.
#[derive(Debug)]
pub struct ApiError {
    error: AppError,
    path: String,
}

impl ApiError {
    /// Wraps an application error for the request at `path`.
    #[must_use]
    pub fn new(error: AppError, path: impl Into<String>) -> Self {
        Self {
            error,
            path: path.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials(_)
            | AppError::TokenMalformed(_)
            | AppError::SignatureInvalid(_)
            | AppError::TokenExpired
            | AppError::TokenRevoked
            | AppError::ScopeMissing(_) => StatusCode::UNAUTHORIZED,
            AppError::OutOfScope(_) => StatusCode::FORBIDDEN,
            AppError::EmptyScope(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            AppError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Internal details are logged, never served.
        let message = if matches!(self.error, AppError::Internal(_)) {
            tracing::error!(path = %self.path, error = %self.error, "internal error");
            "an internal error occurred".to_owned()
        } else {
            self.error.to_string()
        };

        let payload = Json(ErrorResponse::new(
            self.error.code(),
            message,
            status.as_u16(),
            self.path,
        ));

        (status, payload).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;

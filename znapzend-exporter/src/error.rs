//! Error types for the HTTP layer.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use znapzend_exporter_core::ExporterError;

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Rejected by the stage-gauge engine
    #[error(transparent)]
    Exporter(#[from] ExporterError),

    /// The query string could not be decoded (maps to 400)
    #[error("invalid query string: {0}")]
    InvalidQuery(String),

    /// No route matches the request path (maps to 404)
    #[error("no route for {0}")]
    NotFound(String),

    /// The registry could not be encoded (maps to 500)
    #[error("failed to encode metrics: {0}")]
    Encoding(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    error_type: &'static str,
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Exporter(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Exporter(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Encoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error name.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Exporter(e) => e.error_type(),
            Self::InvalidQuery(_) => "invalid_query",
            Self::NotFound(_) => "not_found",
            Self::Encoding(_) => "encoding_failed",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, error_type = self.error_type(), "Request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
            error_type: self.error_type(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

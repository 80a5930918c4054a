use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::api::ErrorOut;
use std::error::Error;
use thiserror::Error;

pub type GenericError = Box<dyn Error + Send + Sync>;

/// Error returned by every HTTP handler.
///
/// Rendered as `{"detail": "..."}` so clients can show the message as-is.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    /// Failure with a message that is safe to show, the cause is logged.
    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: Option<GenericError>,
    },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>, source: GenericError) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Storage failures without a more specific message.
impl From<GenericError> for ApiError {
    fn from(source: GenericError) -> Self {
        ApiError::Internal {
            message: "Internal server error".to_string(),
            source: Some(source),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Internal { message, source } = &self {
            let cause = source.as_ref().map(|e| e.to_string()).unwrap_or_default();
            tracing::error!(error = %cause, "{}", message);
        }

        (status, Json(ErrorOut { detail: self.to_string() })).into_response()
    }
}

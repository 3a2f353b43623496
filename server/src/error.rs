//! HTTP error responses.
//!
//! Every failure leaves the service as `{"detail": <message>, "code": <code>}`
//! with a status chosen by the error's kind. Library errors are split into
//! client and server failures through their `is_client_error` classifiers.

use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use edalab_learning::LearningError;
use edalab_processing::ProcessingError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ApiError {
    /// The request was malformed or named something that does not exist.
    #[error("{detail}")]
    BadRequest { detail: String, code: &'static str },

    /// A table the operation needs has not been loaded.
    #[error("{0}")]
    NotFound(String),

    /// The session's data changed while the request was running.
    #[error("{0}")]
    Conflict(String),

    /// Processing or training failed.
    #[error("{detail}")]
    Internal { detail: String, code: &'static str },
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest {
            detail: detail.into(),
            code: "BAD_REQUEST",
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
            code: "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest { code, .. } | Self::Internal { code, .. } => *code,
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), detail = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), code = self.code(), detail = %self, "Request rejected");
        }

        let body = Json(json!({
            "detail": self.to_string(),
            "code": self.code(),
        }));
        (status, body).into_response()
    }
}

impl From<ProcessingError> for ApiError {
    fn from(err: ProcessingError) -> Self {
        let code = err.error_code();
        let detail = err.to_string();
        if err.is_client_error() {
            Self::BadRequest { detail, code }
        } else {
            Self::Internal { detail, code }
        }
    }
}

impl From<LearningError> for ApiError {
    fn from(err: LearningError) -> Self {
        let code = err.error_code();
        let detail = err.to_string();
        if err.is_client_error() {
            Self::BadRequest { detail, code }
        } else {
            Self::Internal { detail, code }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest {
            detail: rejection.body_text(),
            code: "INVALID_BODY",
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest {
            detail: rejection.body_text(),
            code: "INVALID_BODY",
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest {
            detail: err.to_string(),
            code: "INVALID_BODY",
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("Background task failed: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_errors_map_by_kind() {
        let err: ApiError = LearningError::ColumnNotFound("volume".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "COLUMN_NOT_FOUND");
        assert_eq!(err.to_string(), "Column 'volume' not found");

        let err: ApiError = LearningError::TrainingFailed("singular".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err: ApiError = ProcessingError::InvalidFile("Only CSV files are accepted".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "INVALID_FILE");

        let err: ApiError = ProcessingError::Parse("bad row".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "PARSE_ERROR");
    }

    #[test]
    fn test_fixed_codes() {
        assert_eq!(ApiError::NotFound("No data loaded".into()).code(), "NOT_FOUND");
        assert_eq!(ApiError::Conflict("stale".into()).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::bad_request("x").code(), "BAD_REQUEST");
    }
}

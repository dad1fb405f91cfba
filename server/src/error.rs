//! Unified error handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Engine error: {0}")]
    Engine(#[from] noteline_engine::Error),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            AppError::Engine(noteline_engine::Error::InvalidNote(msg)) => {
                (StatusCode::BAD_REQUEST, "Invalid note".to_string(), Some(msg.clone()))
            }
            AppError::Engine(noteline_engine::Error::NotFound(id)) => {
                (StatusCode::NOT_FOUND, "Note not found".to_string(), Some(id.clone()))
            }
            AppError::Engine(e) => {
                tracing::error!("Engine error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_status() {
        let cases = [
            (
                AppError::Engine(noteline_engine::Error::InvalidNote("empty id".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Engine(noteline_engine::Error::NotFound("n1".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Engine(noteline_engine::Error::StorageUnavailable("disk".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AppError::NotFound("n1".into()), StatusCode::NOT_FOUND),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}

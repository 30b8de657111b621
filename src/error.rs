use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnhanceError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Drawing surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Page processing timed out after {0}s")]
    Timeout(u64),

    /// Cause is logged, not returned; callers only learn which page failed.
    #[error("Failed to enhance page {page} of {total}")]
    BatchFailed { page: usize, total: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for EnhanceError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            EnhanceError::Decode(_) => (StatusCode::UNPROCESSABLE_ENTITY, "DECODE_ERROR"),
            EnhanceError::SurfaceUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SURFACE_UNAVAILABLE")
            }
            EnhanceError::Encode(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ENCODE_ERROR"),
            EnhanceError::ImageTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE")
            }
            EnhanceError::BodyTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            EnhanceError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            EnhanceError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            EnhanceError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            EnhanceError::BatchFailed { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "BATCH_FAILED")
            }
            EnhanceError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            EnhanceError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

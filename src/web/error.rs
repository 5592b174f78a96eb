// Error types for the API server

use crate::image_intake::UploadError;
use crate::listing_store::StoreError;
use crate::models::ListingId;
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

/// API server error types
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Validation(String),
    PayloadTooLarge(String),
    UnsupportedMediaType(String),
    InternalServerError(String),

    // Application-specific errors
    ListingNotFound(ListingId),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE"),
            Self::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "INVALID_IMAGE_TYPE")
            }
            Self::InternalServerError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR")
            }
            Self::ListingNotFound(_) => (StatusCode::NOT_FOUND, "LISTING_NOT_FOUND"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let error_message = match self {
            Self::BadRequest(msg)
            | Self::Validation(msg)
            | Self::PayloadTooLarge(msg)
            | Self::UnsupportedMediaType(msg)
            | Self::InternalServerError(msg) => msg,
            Self::ListingNotFound(id) => format!("Listing with ID {} not found", id),
        };

        if status.is_server_error() {
            error!("Request failed: {}", error_message);
        } else {
            warn!("Request rejected ({}): {}", status, error_message);
        }

        let body = Json(json!({
            "error": {
                "status": status.as_u16(),
                "code": code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::ListingNotFound(id) => Self::ListingNotFound(id),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(error: UploadError) -> Self {
        match error {
            UploadError::InvalidType(_) => Self::UnsupportedMediaType(error.to_string()),
            UploadError::TooLarge { .. } => Self::PayloadTooLarge(error.to_string()),
            UploadError::Empty => Self::Validation(error.to_string()),
            UploadError::Io(_) => Self::InternalServerError(error.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        // The body limit surfaces here when a request is larger than allowed
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(format!("Request body is too large: {}", error.body_text()))
        } else {
            Self::BadRequest(format!("Invalid multipart request: {}", error.body_text()))
        }
    }
}

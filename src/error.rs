//! API error type and its conversions.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use crate::store::StoreError;

pub const INVALID_FILENAME: &str = "Invalid filename";
pub const FILE_NOT_FOUND: &str = "File not found";

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    PayloadTooLarge,
    Internal,
}

impl ApiError {
    fn status_and_detail(self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Uploaded file is too large".into(),
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".into(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::InvalidFilename => {
                warn!("rejected invalid filename");
                ApiError::BadRequest(INVALID_FILENAME.into())
            }
            StoreError::NotFound => ApiError::NotFound(FILE_NOT_FOUND.into()),
            // The io error can carry absolute paths; it stays in the log.
            StoreError::Io(err) => {
                error!(error = %err, "storage i/o failure");
                ApiError::Internal
            }
        }
    }
}

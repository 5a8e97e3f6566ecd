//! Unified error handling for the admin API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::auth::AuthError;
use crate::services::catalog::CatalogError;
use crate::services::image::ImageError;
use crate::storage::StorageError;

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request payload failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Credentials or bearer token were rejected.
    #[error("Unauthorized: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Image decode/encode failed.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),

    /// Blob storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(e) => Self::Validation(e.to_string()),
            CatalogError::NotFound(id) => Self::NotFound(format!("product {id}")),
            CatalogError::Image(e) => Self::Image(e),
            CatalogError::Storage(e) => Self::Storage(e),
            CatalogError::Serialization(e) => Self::Internal(e.to_string()),
        }
    }
}

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Storage(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Image(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = self.client_message();
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl ApiError {
    /// The message sent to clients. Internal detail stays in the logs.
    fn client_message(&self) -> String {
        match self {
            Self::Storage(StorageError::NotConfigured) => {
                "Blob storage is not configured".to_string()
            }
            Self::Storage(_) => "Storage error".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("product p-1".to_string());
        assert_eq!(err.to_string(), "Not found: product p-1");

        let err = ApiError::Validation("missing title".to_string());
        assert_eq!(err.to_string(), "Validation error: missing title");
    }

    #[test]
    fn test_api_error_status_codes() {
        fn get_status(err: ApiError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(ApiError::Validation("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(ApiError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(ApiError::NotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(ApiError::Storage(StorageError::NotConfigured)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(ApiError::Internal("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_storage_detail_is_hidden() {
        let err = ApiError::Storage(StorageError::Api {
            status: 503,
            message: "upstream exploded at 10.0.0.7".to_string(),
        });
        assert_eq!(err.client_message(), "Storage error");

        let err = ApiError::Storage(StorageError::NotConfigured);
        assert_eq!(err.client_message(), "Blob storage is not configured");
    }

    #[test]
    fn test_validation_detail_is_kept() {
        let err = ApiError::Validation("product field 'title' is required".to_string());
        assert!(err.client_message().contains("title"));
    }
}

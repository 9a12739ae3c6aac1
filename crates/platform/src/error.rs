//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use teco_core::GeoError;

use crate::db::RepositoryError;
use crate::messaging::ProducerError;
use crate::search::SearchError;

/// Application-level error type for the platform.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Store search failed.
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Message broker rejected or never received a message.
    #[error("Messaging error: {0}")]
    Messaging(#[from] ProducerError),

    /// Invalid coordinates or distance.
    #[error("Invalid location: {0}")]
    Geo(#[from] GeoError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A required backend is not configured.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                RepositoryError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                RepositoryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Search(err) => match err {
                SearchError::InvalidArgument(_) | SearchError::UnknownField(_) => {
                    StatusCode::BAD_REQUEST
                }
                SearchError::Index(_) | SearchError::Query(_) | SearchError::Build(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Messaging(_) => StatusCode::BAD_GATEWAY,
            Self::Geo(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Messaging(_) => "Message broker error".to_string(),
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(err) if status.is_client_error() => err.to_string(),
            Self::Search(err) if status.is_client_error() => err.to_string(),
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("retailer R1".to_string());
        assert_eq!(err.to_string(), "Not found: retailer R1");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::ServiceUnavailable("broker".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_error_status_codes() {
        assert_eq!(
            get_status(RepositoryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(RepositoryError::Conflict("code".to_string()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(RepositoryError::InvalidArgument("blank".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(RepositoryError::Database(sqlx::Error::RowNotFound).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_search_and_messaging_status_codes() {
        assert_eq!(
            get_status(SearchError::UnknownField("colour".to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(SearchError::Index("poisoned".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(
                ProducerError::Rejected {
                    status: 500,
                    body: String::new()
                }
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(GeoError::InvalidDistance(-1.0).into()),
            StatusCode::BAD_REQUEST
        );
    }
}

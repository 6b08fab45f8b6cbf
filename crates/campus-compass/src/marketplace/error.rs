use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::media::StorageError;

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Failure taxonomy shared by every marketplace operation.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("image storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Internal(String),
}

impl MarketplaceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Translate a repository failure, naming the record for `Conflict`/`NotFound`.
    pub fn from_repository(error: RepositoryError, what: &str) -> Self {
        match error {
            RepositoryError::Conflict => Self::Duplicate(format!("{what} already exists")),
            RepositoryError::NotFound => Self::NotFound(format!("{what} not found")),
            RepositoryError::Unavailable(detail) => Self::Internal(detail),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            MarketplaceError::Validation(_) | MarketplaceError::Duplicate(_) => {
                StatusCode::BAD_REQUEST
            }
            MarketplaceError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            MarketplaceError::Forbidden(_) => StatusCode::FORBIDDEN,
            MarketplaceError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketplaceError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            MarketplaceError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            MarketplaceError::Storage(_) | MarketplaceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Render for the HTTP boundary. Server-side detail is withheld when `hide_internal` is set.
    pub fn into_api_error(self, hide_internal: bool) -> ApiError {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(error = %self, "request failed");
            if hide_internal {
                return ApiError::internal("Internal Server Error");
            }
        }
        ApiError {
            status,
            message: self.to_string(),
        }
    }
}

impl From<RepositoryError> for MarketplaceError {
    fn from(value: RepositoryError) -> Self {
        Self::from_repository(value, "record")
    }
}

/// `{success: false, message}` response produced at the HTTP boundary.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": false, "message": self.message }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_surface_as_duplicates() {
        let error = MarketplaceError::from_repository(RepositoryError::Conflict, "Review");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.to_string(), "Review already exists");
    }

    #[test]
    fn production_hides_internal_detail() {
        let error = MarketplaceError::Internal("mutex poisoned at users".to_string());
        let api = error.into_api_error(true);
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message, "Internal Server Error");

        let error = MarketplaceError::Internal("mutex poisoned at users".to_string());
        assert_eq!(error.into_api_error(false).message, "mutex poisoned at users");
    }

    #[test]
    fn client_errors_keep_their_message_in_production() {
        let api = MarketplaceError::forbidden("Not authorized to approve listings")
            .into_api_error(true);
        assert_eq!(api.status, StatusCode::FORBIDDEN);
        assert_eq!(api.message, "Not authorized to approve listings");
    }
}

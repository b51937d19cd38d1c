//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures infrastructure errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`.
//!
//! Every error response is a JSON object with a single `message` field:
//!
//! ```json
//! { "message": "Insufficient stock for product \"Men's Casual T-Shirt\". Available: 2, Requested: 3." }
//! ```

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use souk_core::{OrderError, StoreError};

/// Message returned when an order could not be committed for reasons the
/// customer cannot fix.
pub const ORDER_FAILED_MESSAGE: &str = "Failed to place order. Please try again.";

/// Message returned for any other server-side failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Order placement or validation failed.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// A store read or status update failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Order(err) => match err {
                OrderError::MissingRequiredField(_)
                | OrderError::InvalidField { .. }
                | OrderError::TotalMismatch { .. } => StatusCode::BAD_REQUEST,
                OrderError::ProductNotFound(_) => StatusCode::NOT_FOUND,
                OrderError::InsufficientStock { .. } => StatusCode::CONFLICT,
                OrderError::CommitFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Whether the error is a server-side failure.
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Order(OrderError::CommitFailed(_)) | Self::Store(_) | Self::Internal(_)
        )
    }

    /// Client-facing message. Server-side failures never expose details.
    fn client_message(&self) -> String {
        match self {
            Self::Order(OrderError::CommitFailed(_)) => ORDER_FAILED_MESSAGE.to_string(),
            Self::Store(_) | Self::Internal(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            Self::Order(err) => err.to_string(),
            Self::NotFound(msg) | Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if let Self::Order(err) = &self {
            tracing::info!(error = %err, "Order rejected");
        }

        let body = ErrorBody {
            message: self.client_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;
    use souk_core::{Price, ProductId};

    use super::*;

    async fn body_message(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice::<ErrorBody>(&bytes).unwrap().message
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Order with ID 7 not found.".to_string());
        assert_eq!(err.to_string(), "Not found: Order with ID 7 not found.");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: impl Into<AppError>) -> StatusCode {
            err.into().into_response().status()
        }

        assert_eq!(
            get_status(OrderError::MissingRequiredField("orderItems")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(OrderError::TotalMismatch {
                submitted: Price::from_cents(100),
                expected: Price::from_cents(200),
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(OrderError::ProductNotFound(ProductId::new(9))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(OrderError::InsufficientStock {
                product_id: ProductId::new(1),
                product_name: "Headphones".to_string(),
                available: 0,
                requested: 1,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(OrderError::CommitFailed(StoreError::Timeout)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Store(StoreError::Timeout)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_commit_failure_is_redacted() {
        let err = AppError::from(OrderError::CommitFailed(StoreError::DataCorruption(
            "order_item.quantity = 0".to_string(),
        )));
        assert_eq!(
            body_message(err.into_response()).await,
            ORDER_FAILED_MESSAGE
        );
    }

    #[tokio::test]
    async fn test_domain_message_is_verbatim() {
        let err = AppError::from(OrderError::ProductNotFound(ProductId::new(42)));
        assert_eq!(
            body_message(err.into_response()).await,
            "Product with ID 42 not found."
        );
    }
}

//! Order placement errors.

use thiserror::Error;

use crate::inventory::StoreError;
use crate::types::{Price, ProductId};

/// Everything that can stop an order from being placed.
///
/// All variants except `CommitFailed` are expected outcomes caused by the
/// request or by current stock; their messages are safe to show to the
/// customer verbatim.
#[derive(Debug, Error)]
pub enum OrderError {
    /// A required request field is absent.
    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),

    /// A request field is present but unusable.
    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// A referenced product does not exist.
    #[error("Product with ID {0} not found.")]
    ProductNotFound(ProductId),

    /// Not enough units on hand for a product.
    #[error(
        "Insufficient stock for product \"{product_name}\". Available: {available}, Requested: {requested}."
    )]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        available: i32,
        requested: i32,
    },

    /// The client-submitted total disagrees with the server computation.
    #[error("Order total mismatch: submitted {submitted}, expected {expected}.")]
    TotalMismatch { submitted: Price, expected: Price },

    /// Storage failed; nothing was committed.
    #[error("order commit failed: {0}")]
    CommitFailed(#[from] StoreError),
}

impl OrderError {
    /// Whether the error is caused by the request or by stock levels, as
    /// opposed to infrastructure.
    #[must_use]
    pub const fn is_domain(&self) -> bool {
        !matches!(self, Self::CommitFailed(_))
    }

    /// Whether the error is a stock conflict (`InsufficientStock` or
    /// `ProductNotFound`).
    #[must_use]
    pub const fn is_stock_conflict(&self) -> bool {
        matches!(
            self,
            Self::InsufficientStock { .. } | Self::ProductNotFound(_)
        )
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = OrderError::InsufficientStock {
            product_id: ProductId::new(3),
            product_name: "Men's Casual T-Shirt".to_string(),
            available: 2,
            requested: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product \"Men's Casual T-Shirt\". Available: 2, Requested: 3."
        );
        assert!(err.is_domain());
        assert!(err.is_stock_conflict());
    }

    #[test]
    fn test_commit_failed_is_not_domain() {
        let err = OrderError::from(StoreError::Timeout);
        assert!(!err.is_domain());
        assert!(!err.is_stock_conflict());
    }

    #[test]
    fn test_missing_field_message() {
        let err = OrderError::MissingRequiredField("deliveryCityId");
        assert_eq!(err.to_string(), "Missing required field: deliveryCityId");
    }
}

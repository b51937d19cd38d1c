//! Order API routes.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use souk_core::{
    Order, OrderError, OrderId, PlaceOrderRequest, Price, ProductId, Quantity, RequestedLineItem,
    StockRequest,
};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Response for a placed order.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub message: String,
    pub order_id: OrderId,
    pub total: Price,
    pub created_at: DateTime<Utc>,
}

/// Request body for a stock check.
///
/// Uses the same line shape as an order so a checkout page can send its cart
/// unchanged; `size` and `price` are ignored.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateOrderRequest {
    pub order_items: Option<Vec<RequestedLineItem>>,
}

/// Response for a successful stock check.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateOrderResponse {
    pub valid: bool,
    pub message: String,
}

/// Place an order.
///
/// POST /api/orders
///
/// Returns `201 Created` with the new order id. Stock is decremented in the
/// same transaction that stores the order.
///
/// # Errors
///
/// - 400 for missing or invalid fields and total mismatches
/// - 404 if a product does not exist
/// - 409 if a product does not have enough stock
/// - 500 with a generic message if the commit failed
pub async fn place(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PlaceOrderResponse>)> {
    let Json(request) = payload?;
    let receipt = state.orders().place_order(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(PlaceOrderResponse {
            message: "Order placed successfully!".to_string(),
            order_id: receipt.order_id,
            total: receipt.total,
            created_at: receipt.created_at,
        }),
    ))
}

/// Check that every line item is in stock, without placing an order.
///
/// POST /api/orders/validate
///
/// # Errors
///
/// Same status codes as [`place`] for the stock-related failures.
pub async fn validate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ValidateOrderRequest>, JsonRejection>,
) -> Result<Json<ValidateOrderResponse>> {
    let Json(request) = payload?;
    let requests = stock_requests(request)?;
    state.orders().validate(&requests).await?;

    Ok(Json(ValidateOrderResponse {
        valid: true,
        message: "All items are in stock.".to_string(),
    }))
}

/// Fetch a placed order with its line items.
///
/// GET /api/orders/{id}
///
/// # Errors
///
/// Returns 404 if the order does not exist.
#[instrument(skip(state, path))]
pub async fn show(
    State(state): State<AppState>,
    path: std::result::Result<Path<i32>, PathRejection>,
) -> Result<Json<Order>> {
    let Path(id) = path?;
    let id = OrderId::new(id);
    state
        .store()
        .order(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Order with ID {id} not found.")))
}

fn stock_requests(
    request: ValidateOrderRequest,
) -> std::result::Result<Vec<StockRequest>, OrderError> {
    let items = match request.order_items {
        Some(items) if !items.is_empty() => items,
        _ => return Err(OrderError::MissingRequiredField("orderItems")),
    };

    items
        .into_iter()
        .map(|item| {
            let product_id = item
                .product_id
                .map(ProductId::new)
                .ok_or(OrderError::MissingRequiredField("productId"))?;
            let quantity = item
                .quantity
                .ok_or(OrderError::MissingRequiredField("quantity"))?;
            let quantity = Quantity::try_from(quantity).map_err(|e| OrderError::InvalidField {
                field: "quantity",
                reason: e.to_string(),
            })?;
            Ok(StockRequest::new(product_id, quantity))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(product_id: Option<i32>, quantity: Option<i64>) -> RequestedLineItem {
        RequestedLineItem {
            product_id,
            quantity,
            ..RequestedLineItem::default()
        }
    }

    #[test]
    fn test_stock_requests_require_items() {
        let err = stock_requests(ValidateOrderRequest::default()).unwrap_err();
        assert!(matches!(err, OrderError::MissingRequiredField("orderItems")));
    }

    #[test]
    fn test_stock_requests_reject_bad_quantity() {
        let err = stock_requests(ValidateOrderRequest {
            order_items: Some(vec![line(Some(1), Some(-2))]),
        })
        .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidField {
                field: "quantity",
                ..
            }
        ));
    }

    #[test]
    fn test_stock_requests_keep_lines() {
        let requests = stock_requests(ValidateOrderRequest {
            order_items: Some(vec![line(Some(1), Some(2)), line(Some(3), Some(1))]),
        })
        .unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].product_id, ProductId::new(1));
        assert_eq!(requests[0].quantity.get(), 2);
    }
}

//! Back-office routes: stock and sales reports, order status updates.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use souk_core::{
    CallCenterStatus, DeliveryStatus, LowStockProduct, Order, OrderId, OrderStatusCount,
    OrderedProduct, SoldProduct,
};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Products below this stock level are reported when no threshold is given.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;
/// Number of products in the top-product reports when no limit is given.
pub const DEFAULT_TOP_SOLD_LIMIT: i64 = 10;
const MAX_TOP_SOLD_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopSoldQuery {
    pub limit: Option<i64>,
}

/// Status change for an order. At least one field must be present.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub call_center_status: Option<CallCenterStatus>,
    pub delivery_status: Option<DeliveryStatus>,
}

/// Products whose stock is below a threshold, lowest first.
///
/// GET /api/admin/low-stock-products?threshold=5
///
/// # Errors
///
/// Returns 400 for a negative threshold.
pub async fn low_stock_products(
    State(state): State<AppState>,
    query: std::result::Result<Query<LowStockQuery>, QueryRejection>,
) -> Result<Json<Vec<LowStockProduct>>> {
    let Query(query) = query?;
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    if threshold < 0 {
        return Err(AppError::BadRequest(
            "threshold must not be negative".to_string(),
        ));
    }
    Ok(Json(state.store().low_stock_products(threshold).await?))
}

/// Order counts grouped by call-center and delivery status.
///
/// GET /api/admin/orders-by-status
///
/// # Errors
///
/// Returns 500 if the store cannot be read.
pub async fn orders_by_status(
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderStatusCount>>> {
    Ok(Json(state.store().orders_by_status().await?))
}

/// Best-selling products by units sold.
///
/// GET /api/admin/top-sold-products?limit=10
///
/// # Errors
///
/// Returns 400 if `limit` is outside `1..=100`.
pub async fn top_sold_products(
    State(state): State<AppState>,
    query: std::result::Result<Query<TopSoldQuery>, QueryRejection>,
) -> Result<Json<Vec<SoldProduct>>> {
    let Query(query) = query?;
    let limit = top_limit(query.limit)?;
    Ok(Json(state.store().top_sold_products(limit).await?))
}

/// Products ranked by the number of orders they appear in.
///
/// GET /api/admin/top-ordered-products?limit=10
///
/// # Errors
///
/// Returns 400 if `limit` is outside `1..=100`.
pub async fn top_ordered_products(
    State(state): State<AppState>,
    query: std::result::Result<Query<TopSoldQuery>, QueryRejection>,
) -> Result<Json<Vec<OrderedProduct>>> {
    let Query(query) = query?;
    let limit = top_limit(query.limit)?;
    Ok(Json(state.store().top_ordered_products(limit).await?))
}

fn top_limit(limit: Option<i64>) -> Result<i64> {
    let limit = limit.unwrap_or(DEFAULT_TOP_SOLD_LIMIT);
    if !(1..=MAX_TOP_SOLD_LIMIT).contains(&limit) {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_TOP_SOLD_LIMIT}"
        )));
    }
    Ok(limit)
}

/// Move an order through the call-center or delivery workflow.
///
/// PATCH /api/admin/orders/{id}/status
///
/// Only status fields change; items, totals and stock are never touched.
///
/// # Errors
///
/// - 400 if neither status is given
/// - 404 if the order does not exist
#[instrument(skip(state, path, payload))]
pub async fn update_order_status(
    State(state): State<AppState>,
    path: std::result::Result<Path<i32>, PathRejection>,
    payload: std::result::Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Order>> {
    let Path(id) = path?;
    let Json(update) = payload?;
    let id = OrderId::new(id);

    if update.call_center_status.is_none() && update.delivery_status.is_none() {
        return Err(AppError::BadRequest(
            "Provide callCenterStatus, deliveryStatus, or both.".to_string(),
        ));
    }

    let order = state
        .store()
        .update_order_status(id, update.call_center_status, update.delivery_status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order with ID {id} not found.")))?;

    info!(
        order_id = %id,
        call_center_status = ?order.call_center_status,
        delivery_status = ?order.delivery_status,
        "Order status updated"
    );
    Ok(Json(order))
}

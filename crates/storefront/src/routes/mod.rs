//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET   /health                          - Liveness check
//! GET   /health/ready                    - Readiness check (store ping)
//!
//! # Orders
//! POST  /api/orders                      - Place an order
//! POST  /api/orders/validate             - Stock check without placing
//! GET   /api/orders/{id}                 - Order with line items
//!
//! # Catalog
//! GET   /api/products/{id}               - Price and stock of a product
//! GET   /api/cities                      - Cities with delivery desks and fees
//!
//! # Admin
//! GET   /api/admin/low-stock-products    - Products below a stock threshold
//! GET   /api/admin/orders-by-status      - Order counts per status pair
//! GET   /api/admin/top-sold-products     - Products ranked by units sold
//! GET   /api/admin/top-ordered-products  - Products ranked by orders placed
//! PATCH /api/admin/orders/{id}/status    - Update order statuses
//! ```

pub mod admin;
pub mod catalog;
pub mod health;
pub mod orders;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

/// Create the health check routes.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::place))
        .route("/validate", post(orders::validate))
        .route("/{id}", get(orders::show))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products/{id}", get(catalog::product))
        .route("/cities", get(catalog::cities))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/low-stock-products", get(admin::low_stock_products))
        .route("/orders-by-status", get(admin::orders_by_status))
        .route("/top-sold-products", get(admin::top_sold_products))
        .route("/top-ordered-products", get(admin::top_ordered_products))
        .route("/orders/{id}/status", patch(admin::update_order_status))
}

/// Create the API routes with the given order router.
///
/// The binary wraps `orders` in a rate limiter; tests pass it bare.
pub fn api_routes(orders: Router<AppState>) -> Router<AppState> {
    Router::new()
        .nest("/orders", orders)
        .nest("/admin", admin_routes())
        .merge(catalog_routes())
}

/// Create all routes for the storefront, without rate limiting.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health_routes())
        .nest("/api", api_routes(order_routes()))
}

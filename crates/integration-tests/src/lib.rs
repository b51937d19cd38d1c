//! Integration tests for Souk.
//!
//! # Running Tests
//!
//! ```bash
//! # Router and concurrency tests against the in-memory store
//! cargo test -p souk-integration-tests
//!
//! # Also run the PostgreSQL tests
//! TEST_DATABASE_URL=postgres://localhost/souk_test cargo test -p souk-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `orders_api` - order placement, validation and lookup over HTTP
//! - `admin_api` - reports and status updates over HTTP
//! - `concurrency` - parallel orders never oversell
//! - `stock_properties` - arbitrary order sequences keep stock non-negative
//! - `scenarios` - acceptance scenarios for order placement
//! - `postgres` - the same guarantees against a real database

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use souk_core::{CityId, DeskId, Price, ProductId};
use souk_storefront::config::{StorefrontConfig, TotalPolicy};
use souk_storefront::db::MemoryInventoryStore;
use souk_storefront::routes;
use souk_storefront::state::AppState;

/// Unit price of the headphones in [`Shop::new`].
pub const HEADPHONES_PRICE: &str = "99.99";
/// Unit price of the shirt in [`Shop::new`].
pub const SHIRT_PRICE: &str = "19.99";

/// A small in-memory shop: two products, one city with one desk.
///
/// Home delivery to the city costs 4.00, desk pickup 2.00.
pub struct Shop {
    pub store: MemoryInventoryStore,
    pub headphones: ProductId,
    pub shirt: ProductId,
    pub city: CityId,
    pub desk: DeskId,
}

impl Shop {
    /// Create a shop with the given stock for headphones and shirts.
    #[must_use]
    pub fn new(headphones_stock: i32, shirt_stock: i32) -> Self {
        let store = MemoryInventoryStore::new();
        let electronics = store.add_category("Electronics");
        let apparel = store.add_category("Apparel");
        let headphones = store.add_product(
            electronics,
            "Wireless Bluetooth Headphones",
            "HEAD-BT-001",
            Price::from_cents(9999),
            headphones_stock,
        );
        let shirt = store.add_product(
            apparel,
            "Classic Cotton T-Shirt",
            "TSHIRT-M-002",
            Price::from_cents(1999),
            shirt_stock,
        );
        let city = store.add_city("Alger", Price::from_cents(400));
        let desk = store.add_desk(
            city,
            "Alger Centre",
            Some("1 Rue Didouche"),
            Price::from_cents(200),
        );

        Self {
            store,
            headphones,
            shirt,
            city,
            desk,
        }
    }

    /// Application state over this shop with default order settings.
    #[must_use]
    pub fn state(&self) -> AppState {
        self.state_with(Duration::from_secs(5), TotalPolicy::Verify)
    }

    /// Application state with a custom commit timeout and total policy.
    #[must_use]
    pub fn state_with(&self, timeout: Duration, total_policy: TotalPolicy) -> AppState {
        let mut config = StorefrontConfig::in_memory();
        config.orders.timeout = timeout;
        config.orders.total_policy = total_policy;
        AppState::new(config, Arc::new(self.store.clone()))
    }

    /// Router over this shop, without rate limiting.
    #[must_use]
    pub fn app(&self) -> Router {
        app(self.state())
    }

    /// Desk-delivery order body. Each line is `(product, quantity, unit price)`.
    /// No total is sent, so the server computes it.
    #[must_use]
    pub fn desk_order(&self, lines: &[(ProductId, i64, &str)]) -> Value {
        json!({
            "deliveryType": "DESK",
            "deliveryCityId": self.city.as_i32(),
            "deliveryDeskId": self.desk.as_i32(),
            "orderItems": order_items(lines),
        })
    }

    /// Home-delivery order body with an explicit total.
    #[must_use]
    pub fn home_order(&self, lines: &[(ProductId, i64, &str)], total: &str) -> Value {
        json!({
            "deliveryType": "HOME",
            "deliveryCityId": self.city.as_i32(),
            "address": "12 Rue Larbi Ben M'hidi",
            "clientNote": "Call before delivery",
            "total": total,
            "orderItems": order_items(lines),
        })
    }
}

fn order_items(lines: &[(ProductId, i64, &str)]) -> Value {
    lines
        .iter()
        .map(|(product_id, quantity, price)| {
            json!({
                "productId": product_id.as_i32(),
                "quantity": quantity,
                "price": price,
            })
        })
        .collect()
}

/// Router over the given state, without rate limiting.
pub fn app(state: AppState) -> Router {
    routes::routes().with_state(state)
}

/// Send one request through the router and decode the JSON response body.
///
/// Empty bodies decode to `Value::Null`, non-JSON bodies to `Value::String`.
///
/// # Panics
///
/// Panics if the request cannot be built or the body cannot be read.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

/// POST a JSON body.
pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

/// GET a path.
pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

/// Parse a JSON price field, which travels as a decimal string.
///
/// # Panics
///
/// Panics if the value is not a price.
#[must_use]
pub fn price(value: &Value) -> Price {
    serde_json::from_value(value.clone()).expect("value should be a price")
}

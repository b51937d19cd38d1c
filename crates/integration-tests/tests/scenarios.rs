//! Acceptance scenarios for order placement.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use souk_core::ProductId;
use souk_integration_tests::{HEADPHONES_PRICE, Shop, post};

#[tokio::test]
async fn test_order_within_stock_succeeds() {
    let shop = Shop::new(5, 0);

    let (status, _) = post(
        &shop.app(),
        "/api/orders",
        shop.desk_order(&[(shop.headphones, 3, HEADPHONES_PRICE)]),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(shop.store.stock(shop.headphones), Some(2));
}

#[tokio::test]
async fn test_order_above_stock_is_rejected() {
    let shop = Shop::new(2, 0);

    let (status, body) = post(
        &shop.app(),
        "/api/orders",
        shop.desk_order(&[(shop.headphones, 3, HEADPHONES_PRICE)]),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("Available: 2, Requested: 3"));
    assert_eq!(shop.store.stock(shop.headphones), Some(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_concurrent_orders_one_wins() {
    let shop = Shop::new(5, 0);
    let app = shop.app();
    let body = shop.desk_order(&[(shop.headphones, 3, HEADPHONES_PRICE)]);

    let (first, second) = tokio::join!(
        post(&app, "/api/orders", body.clone()),
        post(&app, "/api/orders", body),
    );

    let statuses = [first.0, second.0];
    assert!(statuses.contains(&StatusCode::CREATED));
    assert!(statuses.contains(&StatusCode::CONFLICT));
    assert_eq!(shop.store.stock(shop.headphones), Some(2));
    assert_eq!(shop.store.order_count(), 1);
}

#[tokio::test]
async fn test_missing_city_names_the_field() {
    let shop = Shop::new(5, 0);
    let mut body = shop.desk_order(&[(shop.headphones, 1, HEADPHONES_PRICE)]);
    body.as_object_mut().unwrap().remove("deliveryCityId");

    let (status, body) = post(&shop.app(), "/api/orders", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required field: deliveryCityId");
    assert_eq!(shop.store.stock(shop.headphones), Some(5));
}

#[tokio::test]
async fn test_unknown_product_is_reported() {
    let shop = Shop::new(5, 0);

    let (status, body) = post(
        &shop.app(),
        "/api/orders",
        shop.desk_order(&[(ProductId::new(9999), 1, "10.00")]),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Product with ID 9999 not found.");
    assert_eq!(shop.store.order_count(), 0);
}

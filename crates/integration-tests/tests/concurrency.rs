//! Concurrent orders against one stock counter.
//!
//! Every order runs on its own task through the router; the store must let
//! exactly as many through as there are units on hand.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use tokio::task::JoinSet;

use souk_integration_tests::{HEADPHONES_PRICE, SHIRT_PRICE, Shop, post};

async fn race(shop: &Shop, orders: usize, quantity: i64) -> (usize, usize) {
    let app = shop.app();
    let mut tasks = JoinSet::new();
    for _ in 0..orders {
        let app = app.clone();
        let body = shop.desk_order(&[(shop.headphones, quantity, HEADPHONES_PRICE)]);
        tasks.spawn(async move { post(&app, "/api/orders", body).await.0 });
    }

    let (mut created, mut conflicts) = (0, 0);
    while let Some(status) = tasks.join_next().await {
        match status.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => conflicts += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    (created, conflicts)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_orders_never_oversell() {
    let shop = Shop::new(10, 0);

    let (created, conflicts) = race(&shop, 50, 1).await;

    assert_eq!(created, 10);
    assert_eq!(conflicts, 40);
    assert_eq!(shop.store.stock(shop.headphones), Some(0));
    assert_eq!(shop.store.order_count(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_multi_unit_orders_leave_remainder() {
    let shop = Shop::new(7, 0);

    let (created, conflicts) = race(&shop, 20, 2).await;

    assert_eq!(created, 3);
    assert_eq!(conflicts, 17);
    assert_eq!(shop.store.stock(shop.headphones), Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crossed_line_order_completes() {
    let shop = Shop::new(20, 20);
    let app = shop.app();
    let mut tasks = JoinSet::new();

    for i in 0..20 {
        let app = app.clone();
        // Half the orders list the products in reverse
        let lines = if i % 2 == 0 {
            [(shop.headphones, 1, HEADPHONES_PRICE), (shop.shirt, 1, SHIRT_PRICE)]
        } else {
            [(shop.shirt, 1, SHIRT_PRICE), (shop.headphones, 1, HEADPHONES_PRICE)]
        };
        let body = shop.desk_order(&lines);
        tasks.spawn(async move { post(&app, "/api/orders", body).await.0 });
    }

    while let Some(status) = tasks.join_next().await {
        assert_eq!(status.unwrap(), StatusCode::CREATED);
    }
    assert_eq!(shop.store.stock(shop.headphones), Some(0));
    assert_eq!(shop.store.stock(shop.shirt), Some(0));
}

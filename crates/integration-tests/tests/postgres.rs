//! PostgreSQL store tests.
//!
//! Skipped unless `TEST_DATABASE_URL` points at a database the tests may
//! wipe. Migrations are applied and the catalog is reseeded, so everything
//! runs in one test to keep the steps ordered.

#![allow(clippy::unwrap_used, clippy::print_stderr)]

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use secrecy::SecretString;
use sqlx::PgPool;
use tokio::task::JoinSet;

use souk_core::{
    CatalogReader, InventoryReports, InventoryStore, OrderError, PlaceOrderRequest, Price,
    ProductId, RequestedLineItem, StoreError,
};
use souk_integration_tests::{app, post};
use souk_storefront::config::StorefrontConfig;
use souk_storefront::db::{self, PgInventoryStore, seed::CatalogSeed};
use souk_storefront::state::AppState;

const SEED: &str = r#"
categories:
  - name: Electronics
products:
  - name: Wireless Bluetooth Headphones
    reference: HEAD-BT-001
    price: "99.99"
    category: Electronics
    stock: 5
    sizes: ["N/A"]
  - name: Coffee Maker Deluxe
    reference: COFFEE-DELUXE-004
    price: "249.99"
    category: Electronics
    stock: 5
    sizes: ["N/A"]
cities:
  - name: Alger
    home_delivery_fee: "400.00"
    desks:
      - name: Alger Centre
        fee: "200.00"
"#;

async fn connect() -> Option<PgPool> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping PostgreSQL tests");
        return None;
    };
    let pool = db::create_pool(&SecretString::from(url)).await.unwrap();
    sqlx::migrate!("../storefront/migrations").run(&pool).await.unwrap();
    Some(pool)
}

async fn product_id(store: &PgInventoryStore, reference: &str) -> ProductId {
    let report = store.low_stock_products(i32::MAX).await.unwrap();
    report
        .into_iter()
        .find(|row| row.reference == reference)
        .map(|row| row.id)
        .unwrap()
}

fn desk_order(city: i32, desk: i32, lines: &[(ProductId, i64)]) -> PlaceOrderRequest {
    PlaceOrderRequest {
        delivery_type: Some("DESK".to_string()),
        delivery_city_id: Some(city),
        delivery_desk_id: Some(desk),
        order_items: Some(
            lines
                .iter()
                .map(|&(product_id, quantity)| RequestedLineItem {
                    product_id: Some(product_id.as_i32()),
                    quantity: Some(quantity),
                    size: None,
                    price: Some(Price::from_cents(100)),
                })
                .collect(),
        ),
        ..PlaceOrderRequest::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_postgres_store() {
    let Some(pool) = connect().await else {
        return;
    };

    let seed = CatalogSeed::from_yaml(SEED).unwrap();
    let result = db::seed::seed_catalog(&pool, &seed, true).await.unwrap();
    assert_eq!(result.inserted, 2);
    assert_eq!(result.desks, 1);

    // Seeding again skips existing rows
    let again = db::seed::seed_catalog(&pool, &seed, false).await.unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(again.skipped, 2);

    let store = PgInventoryStore::new(pool.clone(), Duration::from_secs(5));
    store.ping().await.unwrap();
    let headphones = product_id(&store, "HEAD-BT-001").await;
    let coffee = product_id(&store, "COFFEE-DELUXE-004").await;
    let cities = store.cities().await.unwrap();
    let city = cities[0].id.as_i32();
    let desk = cities[0].delivery_desks[0].id.as_i32();

    let state = AppState::new(StorefrontConfig::in_memory(), Arc::new(store.clone()));

    // Atomicity: the second line fails, the first keeps its stock
    let err = state
        .orders()
        .place_order(desk_order(city, desk, &[(headphones, 2), (coffee, 6)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InsufficientStock { available: 5, .. }));
    assert_eq!(store.product(headphones).await.unwrap().unwrap().stock, 5);

    // Committed order keeps the submitted unit price
    let receipt = state
        .orders()
        .place_order(desk_order(city, desk, &[(headphones, 1)]))
        .await
        .unwrap();
    assert_eq!(receipt.total, Price::from_cents(20100));
    let order = store.order(receipt.order_id).await.unwrap().unwrap();
    assert_eq!(order.order_items.len(), 1);
    assert_eq!(order.order_items[0].price, Price::from_cents(100));

    // Parallel orders over crossed lines: no oversell, no deadlock
    let router = app(state.clone());
    let mut tasks = JoinSet::new();
    for i in 0..12 {
        let router = router.clone();
        let lines = if i % 2 == 0 {
            [(headphones, 1), (coffee, 1)]
        } else {
            [(coffee, 1), (headphones, 1)]
        };
        let body = serde_json::to_value(desk_order(city, desk, &lines)).unwrap();
        tasks.spawn(async move { post(&router, "/api/orders", body).await.0 });
    }
    let mut created = 0;
    while let Some(status) = tasks.join_next().await {
        match status.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => {}
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(created, 4);
    assert_eq!(store.product(headphones).await.unwrap().unwrap().stock, 0);
    assert_eq!(store.product(coffee).await.unwrap().unwrap().stock, 1);

    let top = store.top_sold_products(10).await.unwrap();
    assert_eq!(top[0].id, headphones);
    assert_eq!(top[0].total_quantity_sold, 5);

    let ordered = store.top_ordered_products(10).await.unwrap();
    assert_eq!(ordered[0].id, headphones);
    assert_eq!(ordered[0].order_count, 5);

    commit_deadline(&pool, &store, headphones, city, desk).await;
}

const SLOW_WRITES: &str = r"
CREATE OR REPLACE FUNCTION storefront.slow_order_item() RETURNS trigger
LANGUAGE plpgsql AS $$ BEGIN PERFORM pg_sleep(0.3); RETURN NEW; END $$;

CREATE OR REPLACE FUNCTION storefront.slow_commit() RETURNS trigger
LANGUAGE plpgsql AS $$ BEGIN PERFORM pg_sleep(0.4); RETURN NULL; END $$;

CREATE TRIGGER slow_order_item BEFORE INSERT ON storefront.order_item
FOR EACH ROW EXECUTE FUNCTION storefront.slow_order_item();

CREATE CONSTRAINT TRIGGER slow_commit AFTER INSERT ON storefront.order
DEFERRABLE INITIALLY DEFERRED
FOR EACH ROW EXECUTE FUNCTION storefront.slow_commit();
";

const FAST_WRITES: &str = r"
DROP TRIGGER IF EXISTS slow_order_item ON storefront.order_item;
DROP TRIGGER IF EXISTS slow_commit ON storefront.order;
DROP FUNCTION IF EXISTS storefront.slow_order_item();
DROP FUNCTION IF EXISTS storefront.slow_commit();
";

async fn order_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM storefront.order")
        .fetch_one(pool)
        .await
        .unwrap()
}

/// A timed-out commit writes nothing, and a slow `COMMIT` that started in
/// time is never reported as a failure.
async fn commit_deadline(
    pool: &PgPool,
    store: &PgInventoryStore,
    headphones: ProductId,
    city: i32,
    desk: i32,
) {
    sqlx::query("UPDATE storefront.product SET stock = 5 WHERE id = $1")
        .bind(headphones)
        .execute(pool)
        .await
        .unwrap();
    sqlx::raw_sql(FAST_WRITES).execute(pool).await.unwrap();
    sqlx::raw_sql(SLOW_WRITES).execute(pool).await.unwrap();

    let mut config = StorefrontConfig::in_memory();
    config.orders.timeout = Duration::from_millis(500);
    let state = AppState::new(config, Arc::new(store.clone()));

    // COMMIT takes 400ms but starts about 300ms in: the order stands
    let before = order_count(pool).await;
    let receipt = state
        .orders()
        .place_order(desk_order(city, desk, &[(headphones, 3)]))
        .await;
    let orders = order_count(pool).await;
    let stock = store.product(headphones).await.unwrap().unwrap().stock;
    let receipt = receipt.unwrap();
    assert_eq!(orders, before + 1);
    assert_eq!(stock, 2);
    assert!(store.order(receipt.order_id).await.unwrap().is_some());

    // Two slow line items run past the deadline before COMMIT
    let before = order_count(pool).await;
    let err = state
        .orders()
        .place_order(desk_order(city, desk, &[(headphones, 1), (headphones, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::CommitFailed(StoreError::Timeout)));
    assert_eq!(order_count(pool).await, before);
    assert_eq!(store.product(headphones).await.unwrap().unwrap().stock, 2);

    sqlx::raw_sql(FAST_WRITES).execute(pool).await.unwrap();
}

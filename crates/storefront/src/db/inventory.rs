//! `PostgreSQL` inventory store.
//!
//! Orders are committed in one transaction:
//!
//! 1. Lock every referenced product row (`FOR UPDATE`, ascending id).
//! 2. Re-check stock against the locked rows.
//! 3. Insert the order and its line items.
//! 4. Decrement stock with a `stock >= n` guard on each `UPDATE`.
//!
//! Row locks are always taken in ascending product id order so two orders
//! sharing products cannot deadlock. `lock_timeout` and `statement_timeout`
//! are set per transaction so a stuck lock surfaces as `StoreError::Timeout`
//! instead of holding a connection forever.
//!
//! The caller's deadline bounds steps 1-4 only. Once `COMMIT` has been sent it
//! is always awaited, so a `StoreError::Timeout` result means nothing was
//! written.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use souk_core::{
    CallCenterStatus, CatalogReader, City, CityId, DeliveryDesk, DeliverySelection,
    DeliveryStatus, DeliveryType, DeskId, InventoryStore, Order, OrderDraft, OrderError, OrderId,
    OrderItem, OrderItemId, OrderReceipt, Price, ProductId, ProductSnapshot, Quantity,
    StockRequest, StoreError, UserId,
};

use super::RepositoryError;

/// Inventory store backed by the `storefront` schema.
#[derive(Clone)]
pub struct PgInventoryStore {
    pool: PgPool,
    lock_timeout: Duration,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    price: Price,
    stock: i32,
}

#[derive(sqlx::FromRow)]
struct LockedStockRow {
    id: ProductId,
    name: String,
    stock: i32,
}

#[derive(sqlx::FromRow)]
struct CityRow {
    id: CityId,
    name: String,
    home_delivery_fee: Price,
}

#[derive(sqlx::FromRow)]
struct DeskRow {
    id: DeskId,
    city_id: CityId,
    name: String,
    address: Option<String>,
    fee: Price,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: Option<UserId>,
    total: Price,
    delivery_type: DeliveryType,
    delivery_city_id: CityId,
    delivery_desk_id: Option<DeskId>,
    address: Option<String>,
    client_note: Option<String>,
    call_center_status: CallCenterStatus,
    delivery_status: DeliveryStatus,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    product_id: ProductId,
    quantity: i32,
    size: Option<String>,
    price: Price,
}

impl PgInventoryStore {
    /// Create a store over an existing pool.
    ///
    /// `lock_timeout` bounds how long the commit transaction waits for
    /// product row locks and for any single statement.
    #[must_use]
    pub const fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn commit_before(
        &self,
        draft: &OrderDraft,
        total: Price,
        deadline: Instant,
    ) -> Result<OrderReceipt, OrderError> {
        let until = tokio::time::Instant::from_std(deadline);
        let mut tx = tokio::time::timeout_at(until, self.pool.begin())
            .await
            .map_err(|_| timed_out())?
            .map_err(store_err)?;

        // Postgres reads a zero timeout as "no timeout".
        let statement_timeout = self
            .lock_timeout
            .min(deadline.saturating_duration_since(Instant::now()))
            .max(Duration::from_millis(1));

        // Dropping `tx` before COMMIT rolls it back.
        let receipt = tokio::time::timeout_at(
            until,
            write_order(&mut tx, draft, total, statement_timeout),
        )
        .await
        .map_err(|_| timed_out())??;

        if Instant::now() >= deadline {
            return Err(timed_out());
        }
        tx.commit().await.map_err(store_err)?;

        Ok(receipt)
    }
}

/// Lock, re-check, insert and decrement inside an open transaction.
async fn write_order(
    tx: &mut Transaction<'_, Postgres>,
    draft: &OrderDraft,
    total: Price,
    statement_timeout: Duration,
) -> Result<OrderReceipt, OrderError> {
    let mut requests = draft.stock_requests()?;
    requests.sort_unstable_by_key(|r| r.product_id);
    let ids: Vec<ProductId> = requests.iter().map(|r| r.product_id).collect();

    set_local_timeouts(tx, statement_timeout).await?;

    let locked: Vec<LockedStockRow> = sqlx::query_as(
        r"
        SELECT id, name, stock
        FROM storefront.product
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(&ids)
    .fetch_all(&mut **tx)
    .await
    .map_err(store_err)?;

    let locked: BTreeMap<ProductId, LockedStockRow> =
        locked.into_iter().map(|row| (row.id, row)).collect();
    check_locked_stock(&requests, &locked)?;

    let (order_id, created_at): (OrderId, DateTime<Utc>) = sqlx::query_as(
        r"
        INSERT INTO storefront.order
            (user_id, total, delivery_type, delivery_city_id, delivery_desk_id,
             address, client_note)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, created_at
        ",
    )
    .bind(draft.user_id)
    .bind(total)
    .bind(draft.delivery.delivery_type())
    .bind(draft.delivery.city_id())
    .bind(draft.delivery.desk_id())
    .bind(draft.delivery.address())
    .bind(draft.client_note.as_deref())
    .fetch_one(&mut **tx)
    .await
    .map_err(store_err)?;

    for item in &draft.items {
        sqlx::query(
            r"
            INSERT INTO storefront.order_item (order_id, product_id, quantity, size, price)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.quantity.get())
        .bind(item.size.as_deref())
        .bind(item.price)
        .execute(&mut **tx)
        .await
        .map_err(store_err)?;
    }

    for request in &requests {
        let result = sqlx::query(
            r"
            UPDATE storefront.product
            SET stock = stock - $1, updated_at = NOW()
            WHERE id = $2 AND stock >= $1
            ",
        )
        .bind(request.quantity.get())
        .bind(request.product_id)
        .execute(&mut **tx)
        .await
        .map_err(store_err)?;

        if result.rows_affected() != 1 {
            // The row is locked, so this only happens if stock moved under
            // the lock. Treat it like any other shortfall.
            return Err(shortfall(request, locked.get(&request.product_id)));
        }
    }

    Ok(OrderReceipt {
        order_id,
        total,
        created_at,
    })
}

/// Load an order row and its line items.
async fn load_order(pool: &PgPool, id: OrderId) -> Result<Option<Order>, RepositoryError> {
    let Some(row) = sqlx::query_as::<_, OrderRow>(
        r"
        SELECT id, user_id, total, delivery_type, delivery_city_id, delivery_desk_id,
               address, client_note, call_center_status, delivery_status, created_at
        FROM storefront.order
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let items: Vec<OrderItemRow> = sqlx::query_as(
        r"
        SELECT id, product_id, quantity, size, price
        FROM storefront.order_item
        WHERE order_id = $1
        ORDER BY id
        ",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let order_items = items
        .into_iter()
        .map(|item| {
            let quantity = Quantity::new(item.quantity).map_err(|e| {
                RepositoryError::DataCorruption(format!(
                    "invalid quantity on order item {}: {e}",
                    item.id
                ))
            })?;
            Ok(OrderItem {
                id: item.id,
                product_id: item.product_id,
                quantity,
                size: item.size,
                price: item.price,
            })
        })
        .collect::<Result<Vec<_>, RepositoryError>>()?;

    Ok(Some(Order {
        id: row.id,
        user_id: row.user_id,
        total: row.total,
        delivery_type: row.delivery_type,
        delivery_city_id: row.delivery_city_id,
        delivery_desk_id: row.delivery_desk_id,
        address: row.address,
        client_note: row.client_note,
        call_center_status: row.call_center_status,
        delivery_status: row.delivery_status,
        created_at: row.created_at,
        order_items,
    }))
}

/// Apply per-transaction lock and statement timeouts.
async fn set_local_timeouts(
    tx: &mut Transaction<'_, Postgres>,
    timeout: Duration,
) -> Result<(), OrderError> {
    let millis = format!("{}ms", timeout.as_millis());
    sqlx::query(
        r"
        SELECT set_config('lock_timeout', $1, true),
               set_config('statement_timeout', $1, true)
        ",
    )
    .bind(millis)
    .execute(&mut **tx)
    .await
    .map_err(store_err)?;
    Ok(())
}

/// Compare summed requests against the locked rows.
fn check_locked_stock(
    requests: &[StockRequest],
    locked: &BTreeMap<ProductId, LockedStockRow>,
) -> Result<(), OrderError> {
    for request in requests {
        let row = locked
            .get(&request.product_id)
            .ok_or(OrderError::ProductNotFound(request.product_id))?;
        if row.stock < request.quantity.get() {
            return Err(shortfall(request, Some(row)));
        }
    }
    Ok(())
}

fn shortfall(request: &StockRequest, row: Option<&LockedStockRow>) -> OrderError {
    match row {
        Some(row) => OrderError::InsufficientStock {
            product_id: row.id,
            product_name: row.name.clone(),
            available: row.stock,
            requested: request.quantity.get(),
        },
        None => OrderError::ProductNotFound(request.product_id),
    }
}

fn timed_out() -> OrderError {
    OrderError::CommitFailed(StoreError::Timeout)
}

fn store_err(err: sqlx::Error) -> OrderError {
    OrderError::CommitFailed(RepositoryError::from(err).into())
}

#[async_trait]
impl CatalogReader for PgInventoryStore {
    async fn product(&self, id: ProductId) -> Result<Option<ProductSnapshot>, StoreError> {
        let row: Option<ProductRow> = sqlx::query_as(
            r"
            SELECT id, name, price, stock
            FROM storefront.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.map(|r| ProductSnapshot {
            id: r.id,
            name: r.name,
            price: r.price,
            stock: r.stock,
        }))
    }

    async fn delivery_fee(
        &self,
        delivery: &DeliverySelection,
    ) -> Result<Option<Price>, StoreError> {
        let fee: Option<Price> = match delivery {
            DeliverySelection::Home { city_id, .. } => {
                sqlx::query_scalar::<_, Price>(
                    "SELECT home_delivery_fee FROM storefront.city WHERE id = $1",
                )
                .bind(*city_id)
                .fetch_optional(&self.pool)
                .await
            }
            DeliverySelection::Desk { city_id, desk_id } => {
                sqlx::query_scalar::<_, Price>(
                    "SELECT fee FROM storefront.delivery_desk WHERE id = $1 AND city_id = $2",
                )
                .bind(*desk_id)
                .bind(*city_id)
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(RepositoryError::from)?;
        Ok(fee)
    }

    async fn cities(&self) -> Result<Vec<City>, StoreError> {
        let cities: Vec<CityRow> = sqlx::query_as(
            "SELECT id, name, home_delivery_fee FROM storefront.city ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        let desks: Vec<DeskRow> = sqlx::query_as(
            "SELECT id, city_id, name, address, fee FROM storefront.delivery_desk ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        let mut by_city: BTreeMap<CityId, Vec<DeliveryDesk>> = BTreeMap::new();
        for desk in desks {
            by_city.entry(desk.city_id).or_default().push(DeliveryDesk {
                id: desk.id,
                city_id: desk.city_id,
                name: desk.name,
                address: desk.address,
                fee: desk.fee,
            });
        }

        Ok(cities
            .into_iter()
            .map(|city| City {
                delivery_desks: by_city.remove(&city.id).unwrap_or_default(),
                id: city.id,
                name: city.name,
                home_delivery_fee: city.home_delivery_fee,
            })
            .collect())
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    #[instrument(skip(self, draft, deadline), fields(items = draft.items.len(), total = %total))]
    async fn commit_order(
        &self,
        draft: &OrderDraft,
        total: Price,
        deadline: Instant,
    ) -> Result<OrderReceipt, OrderError> {
        self.commit_before(draft, total, deadline).await
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(load_order(&self.pool, id).await?)
    }

    #[instrument(skip(self))]
    async fn update_order_status(
        &self,
        id: OrderId,
        call_center: Option<CallCenterStatus>,
        delivery: Option<DeliveryStatus>,
    ) -> Result<Option<Order>, StoreError> {
        let updated = sqlx::query(
            r"
            UPDATE storefront.order
            SET call_center_status = COALESCE($2, call_center_status),
                delivery_status = COALESCE($3, delivery_status),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(call_center)
        .bind(delivery)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(load_order(&self.pool, id).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(())
    }
}

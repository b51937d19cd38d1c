//! Store traits for the order core.
//!
//! The storefront wires a concrete backend (PostgreSQL, or the in-process
//! store used by tests) behind these traits. Only
//! [`InventoryStore::commit_order`] may change stock; every other method is a
//! read or touches order status fields only.

use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::{City, LowStockProduct, OrderStatusCount, OrderedProduct, SoldProduct};
use crate::order::{DeliverySelection, Order, OrderDraft, OrderError, OrderReceipt};
use crate::types::{CallCenterStatus, DeliveryStatus, OrderId, Price, ProductId};

pub use crate::catalog::ProductSnapshot;

/// Boxed error from a storage backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Infrastructure failures from a store.
///
/// These never carry client-facing detail; callers log them and report a
/// generic failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or failed the operation.
    #[error("storage backend error: {0}")]
    Backend(#[source] BoxError),

    /// The operation did not finish within the configured timeout.
    #[error("storage operation timed out")]
    Timeout,

    /// Stored data could not be mapped back into domain types.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Read-only catalog lookups.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Current name, price and stock of a product, if it exists.
    async fn product(&self, id: ProductId) -> Result<Option<ProductSnapshot>, StoreError>;

    /// Delivery fee for a selection.
    ///
    /// Returns `None` when the city or desk does not exist, or the desk is
    /// not in the selected city.
    async fn delivery_fee(&self, delivery: &DeliverySelection)
    -> Result<Option<Price>, StoreError>;

    /// All cities with their delivery desks, ordered by city id.
    async fn cities(&self) -> Result<Vec<City>, StoreError>;
}

/// The transactional store that owns stock and orders.
#[async_trait]
pub trait InventoryStore: CatalogReader {
    /// Atomically re-check stock, create the order and decrement stock.
    ///
    /// `total` is the amount persisted on the order row. Either every effect
    /// is applied or none is.
    ///
    /// `deadline` bounds the work done before the final commit. Once the
    /// commit itself has started it always runs to completion, so a
    /// `StoreError::Timeout` result guarantees nothing was written.
    ///
    /// # Errors
    ///
    /// - `OrderError::ProductNotFound` / `OrderError::InsufficientStock` when
    ///   the re-check under lock fails.
    /// - `OrderError::CommitFailed` for any storage failure, including
    ///   `StoreError::Timeout` when `deadline` passes first; nothing was
    ///   written.
    async fn commit_order(
        &self,
        draft: &OrderDraft,
        total: Price,
        deadline: Instant,
    ) -> Result<OrderReceipt, OrderError>;

    /// A placed order with its line items.
    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Update one or both status fields. Returns the updated order, or `None`
    /// if it does not exist.
    async fn update_order_status(
        &self,
        id: OrderId,
        call_center: Option<CallCenterStatus>,
        delivery: Option<DeliveryStatus>,
    ) -> Result<Option<Order>, StoreError>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Aggregate read models for the back office.
#[async_trait]
pub trait InventoryReports: Send + Sync {
    /// Products with stock strictly below `threshold`, lowest stock first.
    async fn low_stock_products(&self, threshold: i32) -> Result<Vec<LowStockProduct>, StoreError>;

    /// Order counts grouped by (call-center status, delivery status).
    async fn orders_by_status(&self) -> Result<Vec<OrderStatusCount>, StoreError>;

    /// Products ranked by total units sold, highest first.
    async fn top_sold_products(&self, limit: i64) -> Result<Vec<SoldProduct>, StoreError>;

    /// Products ranked by the number of distinct orders containing them,
    /// highest first.
    async fn top_ordered_products(&self, limit: i64) -> Result<Vec<OrderedProduct>, StoreError>;
}

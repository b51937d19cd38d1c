//! Back-office aggregate queries over the `storefront` schema.

use async_trait::async_trait;

use souk_core::{
    CallCenterStatus, DeliveryStatus, InventoryReports, LowStockProduct, OrderStatusCount,
    OrderedProduct, ProductId, SoldProduct, StoreError,
};

use super::{PgInventoryStore, RepositoryError};

#[derive(sqlx::FromRow)]
struct LowStockRow {
    id: ProductId,
    name: String,
    reference: String,
    stock: i32,
    category: String,
}

#[derive(sqlx::FromRow)]
struct StatusCountRow {
    call_center_status: CallCenterStatus,
    delivery_status: DeliveryStatus,
    count: i64,
}

#[derive(sqlx::FromRow)]
struct SoldRow {
    id: ProductId,
    name: String,
    reference: String,
    total_quantity_sold: i64,
}

#[derive(sqlx::FromRow)]
struct OrderedRow {
    id: ProductId,
    name: String,
    reference: String,
    order_count: i64,
}

#[async_trait]
impl InventoryReports for PgInventoryStore {
    async fn low_stock_products(
        &self,
        threshold: i32,
    ) -> Result<Vec<LowStockProduct>, StoreError> {
        let rows: Vec<LowStockRow> = sqlx::query_as(
            r"
            SELECT p.id, p.name, p.reference, p.stock, c.name AS category
            FROM storefront.product p
            JOIN storefront.category c ON c.id = p.category_id
            WHERE p.stock < $1
            ORDER BY p.stock ASC, p.id ASC
            ",
        )
        .bind(threshold)
        .fetch_all(self.pool())
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows
            .into_iter()
            .map(|r| LowStockProduct {
                id: r.id,
                name: r.name,
                reference: r.reference,
                stock: r.stock,
                category: r.category,
            })
            .collect())
    }

    async fn orders_by_status(&self) -> Result<Vec<OrderStatusCount>, StoreError> {
        let rows: Vec<StatusCountRow> = sqlx::query_as(
            r"
            SELECT call_center_status, delivery_status, COUNT(*) AS count
            FROM storefront.order
            GROUP BY call_center_status, delivery_status
            ORDER BY call_center_status, delivery_status
            ",
        )
        .fetch_all(self.pool())
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows
            .into_iter()
            .map(|r| OrderStatusCount {
                call_center_status: r.call_center_status,
                delivery_status: r.delivery_status,
                count: r.count,
            })
            .collect())
    }

    async fn top_sold_products(&self, limit: i64) -> Result<Vec<SoldProduct>, StoreError> {
        let rows: Vec<SoldRow> = sqlx::query_as(
            r"
            SELECT p.id, p.name, p.reference,
                   SUM(oi.quantity)::BIGINT AS total_quantity_sold
            FROM storefront.order_item oi
            JOIN storefront.product p ON p.id = oi.product_id
            GROUP BY p.id, p.name, p.reference
            ORDER BY total_quantity_sold DESC, p.id ASC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows
            .into_iter()
            .map(|r| SoldProduct {
                id: r.id,
                name: r.name,
                reference: r.reference,
                total_quantity_sold: r.total_quantity_sold,
            })
            .collect())
    }

    async fn top_ordered_products(&self, limit: i64) -> Result<Vec<OrderedProduct>, StoreError> {
        let rows: Vec<OrderedRow> = sqlx::query_as(
            r"
            SELECT p.id, p.name, p.reference,
                   COUNT(DISTINCT oi.order_id) AS order_count
            FROM storefront.order_item oi
            JOIN storefront.product p ON p.id = oi.product_id
            GROUP BY p.id, p.name, p.reference
            ORDER BY order_count DESC, p.id ASC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows
            .into_iter()
            .map(|r| OrderedProduct {
                id: r.id,
                name: r.name,
                reference: r.reference,
                order_count: r.order_count,
            })
            .collect())
    }
}

//! Stock pre-check against a catalog snapshot.
//!
//! The result is advisory: nothing is reserved. The commit transaction
//! re-checks every product under lock before touching stock.

use crate::inventory::CatalogReader;
use crate::types::{ProductId, Quantity};

use super::OrderError;

/// Units requested for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockRequest {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

impl StockRequest {
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: Quantity) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Check each requested product against current stock, in order.
///
/// Requests naming the same product are summed before checking. The first
/// failing product decides the error.
///
/// # Errors
///
/// - `OrderError::ProductNotFound` if a product does not exist.
/// - `OrderError::InsufficientStock` if stock is below the requested units.
/// - `OrderError::CommitFailed` if the catalog could not be read.
pub async fn validate_order<R>(reader: &R, requests: &[StockRequest]) -> Result<(), OrderError>
where
    R: CatalogReader + ?Sized,
{
    for request in aggregate(requests.iter().copied())? {
        let product = reader
            .product(request.product_id)
            .await?
            .ok_or(OrderError::ProductNotFound(request.product_id))?;

        if product.stock < request.quantity.get() {
            return Err(OrderError::InsufficientStock {
                product_id: product.id,
                product_name: product.name,
                available: product.stock,
                requested: request.quantity.get(),
            });
        }
    }
    Ok(())
}

/// Sum quantities per product, keeping first-appearance order.
pub(super) fn aggregate(
    requests: impl IntoIterator<Item = StockRequest>,
) -> Result<Vec<StockRequest>, OrderError> {
    let mut merged: Vec<StockRequest> = Vec::new();
    for request in requests {
        match merged
            .iter_mut()
            .find(|existing| existing.product_id == request.product_id)
        {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(request.quantity)
                    .map_err(|e| OrderError::invalid("quantity", e.to_string()))?;
            }
            None => merged.push(request),
        }
    }
    Ok(merged)
}

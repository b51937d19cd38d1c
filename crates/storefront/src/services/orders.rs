//! Order placement service.
//!
//! Placing an order runs, in order:
//!
//! 1. Structural validation of the request ([`PlaceOrderRequest::into_draft`]).
//! 2. A stock pre-check against current catalog data, for a fast and
//!    specific error message.
//! 3. Server-side pricing: line totals plus the delivery fee.
//! 4. The atomic commit, with a deadline the configured timeout from now.
//!
//! Only step 4 changes state. The pre-check reserves nothing; the commit
//! re-checks stock under lock. The store enforces the deadline itself and
//! never abandons a commit already sent, so a timeout is only reported when
//! nothing was written.

use std::sync::Arc;
use std::time::Instant;

use tracing::{Span, field, info, instrument, warn};

use souk_core::{
    DeliverySelection, OrderDraft, OrderError, OrderReceipt, PlaceOrderRequest, Price,
    StockRequest, StoreError, validate_order,
};

use crate::config::{OrderConfig, TotalPolicy};
use crate::db::StorefrontStore;

/// Largest accepted gap between a submitted total and the server's total.
const TOTAL_TOLERANCE_CENTS: i64 = 1;

/// Places orders against a store.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn StorefrontStore>,
    config: OrderConfig,
}

impl OrderService {
    #[must_use]
    pub fn new(store: Arc<dyn StorefrontStore>, config: OrderConfig) -> Self {
        Self { store, config }
    }

    /// Check stock for a list of line items without changing anything.
    ///
    /// # Errors
    ///
    /// - `OrderError::ProductNotFound` / `OrderError::InsufficientStock` for
    ///   the first product that fails.
    /// - `OrderError::CommitFailed` if the catalog could not be read.
    #[instrument(skip(self, requests), fields(lines = requests.len()))]
    pub async fn validate(&self, requests: &[StockRequest]) -> Result<(), OrderError> {
        validate_order(self.store.as_ref(), requests).await
    }

    /// Validate, price and commit an order.
    ///
    /// # Errors
    ///
    /// - `OrderError::MissingRequiredField` / `OrderError::InvalidField` for
    ///   malformed requests or an unknown city or desk.
    /// - `OrderError::ProductNotFound` / `OrderError::InsufficientStock` from
    ///   the pre-check or the commit.
    /// - `OrderError::TotalMismatch` under [`TotalPolicy::Verify`].
    /// - `OrderError::CommitFailed` for storage failures, including
    ///   `StoreError::Timeout` when the commit exceeds the configured bound.
    #[instrument(
        skip_all,
        fields(
            delivery_type = field::Empty,
            lines = field::Empty,
            order_id = field::Empty,
        )
    )]
    pub async fn place_order(
        &self,
        request: PlaceOrderRequest,
    ) -> Result<OrderReceipt, OrderError> {
        let draft = request.into_draft()?;
        let span = Span::current();
        span.record("delivery_type", field::display(draft.delivery.delivery_type()));
        span.record("lines", draft.items.len());

        validate_order(self.store.as_ref(), &draft.stock_requests()?).await?;
        let total = self.price(&draft).await?;

        let deadline = Instant::now() + self.config.timeout;
        let receipt = match self.store.commit_order(&draft, total, deadline).await {
            Ok(receipt) => receipt,
            Err(OrderError::CommitFailed(StoreError::Timeout)) => {
                let timeout_ms =
                    u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(timeout_ms, "Order commit timed out");
                return Err(StoreError::Timeout.into());
            }
            Err(e) => return Err(e),
        };

        span.record("order_id", receipt.order_id.as_i32());
        info!(total = %receipt.total, "Order placed");
        Ok(receipt)
    }

    /// Server-side order total: line totals plus the delivery fee.
    async fn price(&self, draft: &OrderDraft) -> Result<Price, OrderError> {
        let fee = self
            .store
            .delivery_fee(&draft.delivery)
            .await?
            .ok_or_else(|| unknown_destination(&draft.delivery))?;
        let expected = (draft.subtotal() + fee).round_cents();

        if self.config.total_policy == TotalPolicy::Verify
            && let Some(submitted) = draft.submitted_total
            && submitted.abs_diff(expected) > Price::from_cents(TOTAL_TOLERANCE_CENTS)
        {
            return Err(OrderError::TotalMismatch {
                submitted,
                expected,
            });
        }
        Ok(expected)
    }
}

fn unknown_destination(delivery: &DeliverySelection) -> OrderError {
    match delivery {
        DeliverySelection::Home { city_id, .. } => OrderError::InvalidField {
            field: "deliveryCityId",
            reason: format!("no city with ID {city_id}"),
        },
        DeliverySelection::Desk { city_id, desk_id } => OrderError::InvalidField {
            field: "deliveryDeskId",
            reason: format!("no delivery desk with ID {desk_id} in city {city_id}"),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use souk_core::{ProductId, Quantity, RequestedLineItem};

    use super::*;
    use crate::db::MemoryInventoryStore;

    struct Fixture {
        store: MemoryInventoryStore,
        shirt: ProductId,
        city: i32,
        desk: i32,
    }

    fn fixture(stock: i32) -> Fixture {
        let store = MemoryInventoryStore::new();
        let apparel = store.add_category("Apparel");
        let shirt = store.add_product(
            apparel,
            "Men's Casual T-Shirt",
            "TSHIRT-M-002",
            Price::from_cents(1999),
            stock,
        );
        let city = store.add_city("Algiers", Price::from_cents(400));
        let desk = store.add_desk(city, "Algiers Desk 1", None, Price::from_cents(200));
        Fixture {
            store,
            shirt,
            city: city.as_i32(),
            desk: desk.as_i32(),
        }
    }

    fn service(f: &Fixture, policy: TotalPolicy) -> OrderService {
        OrderService::new(
            Arc::new(f.store.clone()),
            OrderConfig {
                timeout: Duration::from_millis(200),
                total_policy: policy,
            },
        )
    }

    fn request(f: &Fixture, quantity: i64, total: Option<Price>) -> PlaceOrderRequest {
        PlaceOrderRequest {
            total,
            delivery_type: Some("DESK".to_string()),
            delivery_city_id: Some(f.city),
            delivery_desk_id: Some(f.desk),
            order_items: Some(vec![RequestedLineItem {
                product_id: Some(f.shirt.as_i32()),
                quantity: Some(quantity),
                size: Some("L".to_string()),
                price: Some(Price::from_cents(1999)),
            }]),
            ..PlaceOrderRequest::default()
        }
    }

    #[tokio::test]
    async fn test_place_order_prices_with_desk_fee() {
        let f = fixture(5);
        let receipt = service(&f, TotalPolicy::Verify)
            .place_order(request(&f, 2, Some(Price::from_cents(4198))))
            .await
            .unwrap();
        assert_eq!(receipt.total, Price::from_cents(4198));
        assert_eq!(f.store.stock(f.shirt), Some(3));
    }

    #[tokio::test]
    async fn test_total_mismatch_rejected_under_verify() {
        let f = fixture(5);
        let err = service(&f, TotalPolicy::Verify)
            .place_order(request(&f, 2, Some(Price::from_cents(3998))))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::TotalMismatch { .. }));
        assert_eq!(f.store.stock(f.shirt), Some(5));
    }

    #[tokio::test]
    async fn test_recompute_ignores_submitted_total() {
        let f = fixture(5);
        let receipt = service(&f, TotalPolicy::Recompute)
            .place_order(request(&f, 2, Some(Price::from_cents(1))))
            .await
            .unwrap();
        assert_eq!(receipt.total, Price::from_cents(4198));
    }

    #[tokio::test]
    async fn test_one_cent_difference_is_tolerated() {
        let f = fixture(5);
        let receipt = service(&f, TotalPolicy::Verify)
            .place_order(request(&f, 2, Some(Price::from_cents(4199))))
            .await
            .unwrap();
        assert_eq!(receipt.total, Price::from_cents(4198));
    }

    #[tokio::test]
    async fn test_unknown_desk_is_invalid_field() {
        let f = fixture(5);
        let mut req = request(&f, 1, None);
        req.delivery_desk_id = Some(9999);
        let err = service(&f, TotalPolicy::Verify)
            .place_order(req)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidField {
                field: "deliveryDeskId",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_commit_timeout_changes_nothing() {
        let f = fixture(5);
        f.store.set_commit_delay(Some(Duration::from_secs(5)));
        let err = service(&f, TotalPolicy::Verify)
            .place_order(request(&f, 1, None))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::CommitFailed(StoreError::Timeout)));
        assert_eq!(f.store.stock(f.shirt), Some(5));
        assert_eq!(f.store.order_count(), 0);
    }

    #[tokio::test]
    async fn test_validate_does_not_change_stock() {
        let f = fixture(2);
        let svc = service(&f, TotalPolicy::Verify);
        let requests = [StockRequest::new(f.shirt, Quantity::new(2).unwrap())];
        svc.validate(&requests).await.unwrap();
        svc.validate(&requests).await.unwrap();
        assert_eq!(f.store.stock(f.shirt), Some(2));
    }
}

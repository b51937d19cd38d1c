//! Order model, request parsing and validation.
//!
//! The flow through this module is:
//!
//! 1. [`PlaceOrderRequest`] - the raw JSON body, every field optional.
//! 2. [`PlaceOrderRequest::into_draft`] - structural validation into an
//!    [`OrderDraft`], with no store access.
//! 3. [`validate_order`] - stock pre-check against a [`CatalogReader`]
//!    snapshot for fast feedback.
//! 4. [`InventoryStore::commit_order`] - the atomic commit that re-checks
//!    stock under lock.
//!
//! [`CatalogReader`]: crate::inventory::CatalogReader
//! [`InventoryStore::commit_order`]: crate::inventory::InventoryStore::commit_order

mod error;
mod request;
mod validator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    CallCenterStatus, CityId, DeliveryStatus, DeliveryType, DeskId, OrderId, OrderItemId, Price,
    ProductId, Quantity, UserId,
};

pub use error::OrderError;
pub use request::{PlaceOrderRequest, RequestedLineItem};
pub use validator::{StockRequest, validate_order};

/// One product + quantity within an order.
///
/// `price` is the unit price the customer was shown. It is stored as-is and
/// never re-read from the product row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub size: Option<String>,
    pub price: Price,
}

impl LineItem {
    /// `price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price * self.quantity
    }
}

/// Where and how the order is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliverySelection {
    /// Courier delivery to a street address.
    Home { city_id: CityId, address: String },
    /// Pickup from a delivery desk.
    Desk { city_id: CityId, desk_id: DeskId },
}

impl DeliverySelection {
    #[must_use]
    pub const fn delivery_type(&self) -> DeliveryType {
        match self {
            Self::Home { .. } => DeliveryType::Home,
            Self::Desk { .. } => DeliveryType::Desk,
        }
    }

    #[must_use]
    pub const fn city_id(&self) -> CityId {
        match self {
            Self::Home { city_id, .. } | Self::Desk { city_id, .. } => *city_id,
        }
    }

    #[must_use]
    pub const fn desk_id(&self) -> Option<DeskId> {
        match self {
            Self::Home { .. } => None,
            Self::Desk { desk_id, .. } => Some(*desk_id),
        }
    }

    #[must_use]
    pub fn address(&self) -> Option<&str> {
        match self {
            Self::Home { address, .. } => Some(address),
            Self::Desk { .. } => None,
        }
    }
}

/// A structurally valid order that has not been committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub delivery: DeliverySelection,
    pub client_note: Option<String>,
    pub user_id: Option<UserId>,
    /// Never empty.
    pub items: Vec<LineItem>,
    /// The total the client computed, if it sent one.
    pub submitted_total: Option<Price>,
}

impl OrderDraft {
    /// Sum of `price × quantity` over all line items.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Requested units per product, in first-appearance order.
    ///
    /// Line items that name the same product (e.g. two sizes of one shirt)
    /// are summed, since they draw from one stock counter.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidField` if a summed quantity overflows.
    pub fn stock_requests(&self) -> Result<Vec<StockRequest>, OrderError> {
        validator::aggregate(
            self.items
                .iter()
                .map(|item| StockRequest::new(item.product_id, item.quantity)),
        )
    }
}

/// Acknowledgement of a committed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub total: Price,
    pub created_at: DateTime<Utc>,
}

/// A stored line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub size: Option<String>,
    pub price: Price,
}

/// A placed order. Immutable except for its two status fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub total: Price,
    pub delivery_type: DeliveryType,
    pub delivery_city_id: CityId,
    pub delivery_desk_id: Option<DeskId>,
    pub address: Option<String>,
    pub client_note: Option<String>,
    pub call_center_status: CallCenterStatus,
    pub delivery_status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    pub order_items: Vec<OrderItem>,
}

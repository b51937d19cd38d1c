//! Read-side catalog and reference data.
//!
//! These are the shapes the order core consults but never mutates: product
//! snapshots for validation messages, delivery reference data for fees, and
//! the aggregate rows behind the admin reports.

use serde::{Deserialize, Serialize};

use crate::types::{CallCenterStatus, CityId, DeliveryStatus, DeskId, Price, ProductId};

/// Point-in-time view of a product.
///
/// A snapshot is only used for fast feedback and messages. The authoritative
/// stock check happens again inside the commit transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub stock: i32,
}

/// A pickup desk inside a city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDesk {
    pub id: DeskId,
    pub city_id: CityId,
    pub name: String,
    pub address: Option<String>,
    /// Fee charged when the customer collects from this desk.
    pub fee: Price,
}

/// A city (wilaya) with its home delivery fee and pickup desks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: CityId,
    pub name: String,
    /// Fee charged for courier delivery to an address in this city.
    pub home_delivery_fee: Price,
    pub delivery_desks: Vec<DeliveryDesk>,
}

/// A product whose stock fell below the reorder threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockProduct {
    pub id: ProductId,
    pub name: String,
    pub reference: String,
    pub stock: i32,
    pub category: String,
}

/// Number of orders sharing one status pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusCount {
    pub call_center_status: CallCenterStatus,
    pub delivery_status: DeliveryStatus,
    pub count: i64,
}

/// Units sold for one product across all orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoldProduct {
    pub id: ProductId,
    pub name: String,
    pub reference: String,
    pub total_quantity_sold: i64,
}

/// Number of distinct orders containing one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedProduct {
    pub id: ProductId,
    pub name: String,
    pub reference: String,
    pub order_count: i64,
}

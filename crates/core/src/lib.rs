//! Souk Core - Shared order and inventory types.
//!
//! This crate provides the types and traits shared by all Souk components:
//! - `storefront` - Public-facing order API
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure logic - no database
//! access, no HTTP. Stores are plugged in through the traits in [`inventory`].
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, quantities and statuses
//! - [`catalog`] - Product snapshots, delivery reference data and report rows
//! - [`order`] - Order model, request parsing, validation and domain errors
//! - [`inventory`] - Catalog reader and inventory store traits

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod inventory;
pub mod order;
pub mod types;

pub use catalog::{
    City, DeliveryDesk, LowStockProduct, OrderStatusCount, OrderedProduct, SoldProduct,
};
pub use inventory::{CatalogReader, InventoryReports, InventoryStore, ProductSnapshot, StoreError};
pub use order::{
    DeliverySelection, LineItem, Order, OrderDraft, OrderError, OrderItem, OrderReceipt,
    PlaceOrderRequest, RequestedLineItem, StockRequest, validate_order,
};
pub use types::*;

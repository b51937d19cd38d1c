//! Business logic services for storefront.
//!
//! # Services
//!
//! - `orders` - Order placement: validation, pricing, and the timed commit

pub mod orders;

pub use orders::OrderService;

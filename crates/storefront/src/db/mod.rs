//! Storage backends for the storefront.
//!
//! # Backends
//!
//! - [`PgInventoryStore`] - `PostgreSQL`, the production store
//! - [`MemoryInventoryStore`] - in-process store for tests and local demos
//!
//! Both implement the `souk_core` store traits and are used through
//! `Arc<dyn StorefrontStore>` in [`AppState`](crate::state::AppState).
//!
//! # Schema: `storefront`
//!
//! - `category`, `product`, `product_image` - catalog
//! - `city`, `delivery_desk` - delivery reference data
//! - `order`, `order_item` - placed orders
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p souk-cli -- migrate
//! ```

pub mod inventory;
pub mod memory;
pub mod reports;
pub mod seed;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use souk_core::{InventoryReports, InventoryStore, StoreError};

pub use inventory::PgInventoryStore;
pub use memory::MemoryInventoryStore;

/// Postgres SQLSTATE for `lock_not_available` (raised by `lock_timeout`).
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// Postgres SQLSTATE for `query_canceled` (raised by `statement_timeout`).
const QUERY_CANCELED: &str = "57014";

/// Everything the HTTP layer needs from a backend.
pub trait StorefrontStore: InventoryStore + InventoryReports {}

impl<T: InventoryStore + InventoryReports> StorefrontStore for T {}

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl From<RepositoryError> for StoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(sqlx::Error::Database(ref db_err))
                if matches!(
                    db_err.code().as_deref(),
                    Some(LOCK_NOT_AVAILABLE | QUERY_CANCELED)
                ) =>
            {
                Self::Timeout
            }
            RepositoryError::Database(sqlx::Error::PoolTimedOut) => Self::Timeout,
            RepositoryError::Database(e) => Self::Backend(Box::new(e)),
            RepositoryError::DataCorruption(msg) => Self::DataCorruption(msg),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

//! Catalog seed data.
//!
//! A YAML file describes categories, products and delivery reference data.
//! The same file seeds `PostgreSQL` (via `souk-cli seed`) or an in-memory
//! store at startup.
//!
//! ```yaml
//! categories:
//!   - name: Electronics
//! products:
//!   - name: Wireless Bluetooth Headphones
//!     reference: HEAD-BT-001
//!     price: "99.99"
//!     category: Electronics
//!     stock: 50
//!     sizes: ["N/A"]
//! cities:
//!   - name: Algiers
//!     home_delivery_fee: "600.00"
//!     desks:
//!       - name: Algiers Desk 1
//!         fee: "300.00"
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use souk_core::{CategoryId, CityId, Price, ProductId};

/// Errors from loading or applying seed data.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The seed file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The seed file is not valid YAML for [`CatalogSeed`].
    #[error("failed to parse seed YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The seed data is internally inconsistent.
    #[error("{} validation errors in seed data", .0.len())]
    Invalid(Vec<String>),

    /// Writing to the database failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Top-level seed document.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSeed {
    pub categories: Vec<CategorySeed>,
    pub products: Vec<ProductSeed>,
    #[serde(default)]
    pub cities: Vec<CitySeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategorySeed {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductSeed {
    pub name: String,
    /// Unique SKU-like reference, e.g. `HEAD-BT-001`.
    pub reference: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub old_price: Option<Price>,
    #[serde(default)]
    pub is_sale: bool,
    /// Category name; must match an entry in `categories`.
    pub category: String,
    pub stock: i32,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub images: Vec<ImageSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageSeed {
    #[serde(default)]
    pub color: Option<String>,
    pub image_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CitySeed {
    pub name: String,
    pub home_delivery_fee: Price,
    #[serde(default)]
    pub desks: Vec<DeskSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeskSeed {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    pub fee: Price,
}

/// Result of a seeding run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedResult {
    /// Products inserted.
    pub inserted: u64,
    /// Products skipped because their reference already exists.
    pub skipped: u64,
    /// Cities inserted.
    pub cities: u64,
    /// Delivery desks inserted.
    pub desks: u64,
}

impl CatalogSeed {
    /// Parse a seed document from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Parse` if the YAML does not match the schema.
    pub fn from_yaml(content: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Read and parse a seed file.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Io` if the file cannot be read, or
    /// `SeedError::Parse` if it is not a valid seed document.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SeedError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_yaml(&content)
    }

    /// Check the document for problems the database would reject.
    ///
    /// Returns one message per problem; an empty list means the seed is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let categories: HashSet<&str> = self.categories.iter().map(|c| c.name.as_str()).collect();
        if categories.len() != self.categories.len() {
            errors.push("Duplicate category names".to_string());
        }

        let mut references = HashSet::new();
        for product in &self.products {
            if !references.insert(product.reference.as_str()) {
                errors.push(format!("Duplicate product reference: {}", product.reference));
            }
            if !categories.contains(product.category.as_str()) {
                errors.push(format!(
                    "Unknown category '{}' for product '{}'",
                    product.category, product.reference
                ));
            }
            if product.stock < 0 {
                errors.push(format!("Negative stock for product '{}'", product.reference));
            }
            if product.price.is_negative() {
                errors.push(format!("Negative price for product '{}'", product.reference));
            }
        }

        let mut cities = HashSet::new();
        for city in &self.cities {
            if !cities.insert(city.name.as_str()) {
                errors.push(format!("Duplicate city: {}", city.name));
            }
            if city.home_delivery_fee.is_negative() {
                errors.push(format!("Negative home delivery fee for city '{}'", city.name));
            }
            if city.desks.iter().any(|d| d.fee.is_negative()) {
                errors.push(format!("Negative desk fee in city '{}'", city.name));
            }
        }

        errors
    }
}

/// Write seed data to `PostgreSQL` in one transaction.
///
/// Existing products (by reference) and cities (by name) are left untouched,
/// so running the seed twice is harmless. With `clear_existing`, all orders,
/// products, categories and delivery data are deleted first.
///
/// # Errors
///
/// Returns `SeedError::Invalid` if [`CatalogSeed::validate`] reports problems,
/// or `SeedError::Database` if any statement fails; nothing is written then.
#[instrument(skip(pool, seed), fields(products = seed.products.len(), cities = seed.cities.len()))]
pub async fn seed_catalog(
    pool: &PgPool,
    seed: &CatalogSeed,
    clear_existing: bool,
) -> Result<SeedResult, SeedError> {
    let errors = seed.validate();
    if !errors.is_empty() {
        return Err(SeedError::Invalid(errors));
    }

    let mut tx = pool.begin().await?;

    if clear_existing {
        // Children first: order_item references product and order.
        for table in [
            "storefront.order_item",
            "storefront.order",
            "storefront.product_image",
            "storefront.product",
            "storefront.category",
            "storefront.delivery_desk",
            "storefront.city",
        ] {
            let deleted = sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?
                .rows_affected();
            info!(table, deleted, "Cleared table");
        }
    }

    let mut category_ids: HashMap<&str, CategoryId> = HashMap::new();
    for category in &seed.categories {
        let id: CategoryId = sqlx::query_scalar(
            r"
            INSERT INTO storefront.category (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            ",
        )
        .bind(&category.name)
        .fetch_one(&mut *tx)
        .await?;
        category_ids.insert(category.name.as_str(), id);
    }

    let mut result = SeedResult::default();

    for product in &seed.products {
        let Some(&category_id) = category_ids.get(product.category.as_str()) else {
            continue;
        };

        let inserted: Option<ProductId> = sqlx::query_scalar(
            r"
            INSERT INTO storefront.product
                (name, reference, description, price, old_price, is_sale, stock, sizes, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (reference) DO NOTHING
            RETURNING id
            ",
        )
        .bind(&product.name)
        .bind(&product.reference)
        .bind(product.description.as_deref())
        .bind(product.price)
        .bind(product.old_price)
        .bind(product.is_sale)
        .bind(product.stock)
        .bind(&product.sizes)
        .bind(category_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(product_id) = inserted else {
            result.skipped += 1;
            continue;
        };
        result.inserted += 1;

        for image in &product.images {
            sqlx::query(
                r"
                INSERT INTO storefront.product_image (product_id, color, image_path)
                VALUES ($1, $2, $3)
                ",
            )
            .bind(product_id)
            .bind(image.color.as_deref())
            .bind(&image.image_path)
            .execute(&mut *tx)
            .await?;
        }
    }

    for city in &seed.cities {
        let inserted: Option<CityId> = sqlx::query_scalar(
            r"
            INSERT INTO storefront.city (name, home_delivery_fee)
            VALUES ($1, $2)
            ON CONFLICT (name) DO NOTHING
            RETURNING id
            ",
        )
        .bind(&city.name)
        .bind(city.home_delivery_fee)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(city_id) = inserted else {
            continue;
        };
        result.cities += 1;

        for desk in &city.desks {
            sqlx::query(
                r"
                INSERT INTO storefront.delivery_desk (city_id, name, address, fee)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(city_id)
            .bind(&desk.name)
            .bind(desk.address.as_deref())
            .bind(desk.fee)
            .execute(&mut *tx)
            .await?;
            result.desks += 1;
        }
    }

    tx.commit().await?;
    Ok(result)
}

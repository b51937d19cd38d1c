//! Seed the storefront database with a catalog.
//!
//! Reads categories, products, cities and delivery desks from a YAML file and
//! inserts them in one transaction. Products whose reference already exists
//! are skipped, so seeding twice is harmless.

use std::path::Path;

use tracing::{error, info};

use souk_storefront::db::{self, seed::CatalogSeed};

use super::{DATABASE_URL_VAR, database_url};

/// Seed the catalog from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the catalog YAML file
/// * `clear_existing` - If true, delete orders and the catalog first
///
/// # Errors
///
/// Returns an error if the database URL is missing, the file cannot be read
/// or fails validation, or database operations fail.
pub async fn catalog(
    file_path: &Path,
    clear_existing: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = database_url().ok_or_else(|| format!("{DATABASE_URL_VAR} not set"))?;

    info!(path = %file_path.display(), "Loading catalog from file");

    // Parse and validate before connecting to the database
    let seed = CatalogSeed::from_file(file_path).await?;
    info!(
        categories = seed.categories.len(),
        products = seed.products.len(),
        cities = seed.cities.len(),
        "Parsed catalog"
    );

    let errors = seed.validate();
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    if clear_existing {
        info!("Existing orders and catalog will be deleted");
    }
    let result = db::seed::seed_catalog(&pool, &seed, clear_existing).await?;

    info!("Seeding complete!");
    info!("  Products inserted: {}", result.inserted);
    info!("  Products skipped (already exist): {}", result.skipped);
    info!("  Cities inserted: {}", result.cities);
    info!("  Delivery desks inserted: {}", result.desks);

    Ok(())
}

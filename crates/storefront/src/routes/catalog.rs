//! Catalog and delivery reference routes used by the checkout page.

use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
};

use souk_core::{City, ProductId, ProductSnapshot};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Current price and stock of a product.
///
/// GET /api/products/{id}
///
/// # Errors
///
/// Returns 404 if the product does not exist.
pub async fn product(
    State(state): State<AppState>,
    path: std::result::Result<Path<i32>, PathRejection>,
) -> Result<Json<ProductSnapshot>> {
    let Path(id) = path?;
    let id = ProductId::new(id);
    state
        .store()
        .product(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Product with ID {id} not found.")))
}

/// All cities with their home delivery fee and pickup desks.
///
/// GET /api/cities
///
/// # Errors
///
/// Returns 500 if the store cannot be read.
pub async fn cities(State(state): State<AppState>) -> Result<Json<Vec<City>>> {
    Ok(Json(state.store().cities().await?))
}

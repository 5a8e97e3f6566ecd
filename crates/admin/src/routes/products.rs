//! Product catalog route handlers.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tracing::instrument;
use vitrina_core::Product;

use crate::error::ApiError;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/products", get(list).post(save_all))
}

/// Response to a successful whole-catalog save.
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub success: bool,
    pub products: Vec<Product>,
    pub url: String,
}

/// The current product list.
///
/// Serves the cached list while fresh and degrades to stale-or-empty on
/// storage failure; this endpoint never returns a fetch error.
#[instrument(skip_all)]
pub async fn list(State(state): State<AppState>) -> Json<Vec<Product>> {
    Json(state.catalog().list(false).await)
}

/// Replace the whole catalog.
///
/// Raw (`data:`) images are optimized and uploaded before the list is
/// persisted; a failure anywhere leaves the stored catalog untouched.
#[instrument(skip_all, fields(count = body.len()))]
pub async fn save_all(
    RequireAuth(_): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<Vec<Product>>,
) -> Result<Json<SaveResponse>, ApiError> {
    let outcome = state.catalog().save_all(body).await?;
    tracing::info!(count = outcome.products.len(), "catalog saved");
    Ok(Json(SaveResponse {
        success: true,
        products: outcome.products,
        url: outcome.url,
    }))
}

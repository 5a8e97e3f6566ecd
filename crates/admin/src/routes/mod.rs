//! HTTP route handlers for the admin API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Health check
//!
//! # Auth (single shared-secret bearer token)
//! POST /api/auth                - Exchange password for a token
//! POST /api/logout              - Advisory logout (always succeeds)
//! POST /api/refresh-token       - Reissue a token near expiry
//!
//! # Catalog
//! GET  /api/products            - Current product list (never a fetch error)
//! POST /api/products            - Replace the whole catalog (auth)
//! POST /api/upload              - Optimize and store one image (auth)
//!
//! # Header configuration
//! GET  /api/header              - Current header configuration
//! PUT  /api/header              - Overwrite and broadcast (auth)
//! GET  /api/header/events       - SSE stream of configuration updates
//! ```

pub mod auth;
pub mod header;
pub mod products;
pub mod upload;

use axum::Router;

use crate::state::AppState;

/// Build the API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(products::router())
        .merge(upload::router())
        .merge(header::router())
}

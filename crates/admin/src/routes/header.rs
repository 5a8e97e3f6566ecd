//! Header configuration route handlers.

use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::Stream;
use serde::Serialize;
use tracing::instrument;
use vitrina_core::HeaderConfig;

use crate::error::ApiError;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Build the header configuration router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/header", get(load).put(save))
        .route("/api/header/events", get(events))
}

/// Response to a successful header save.
#[derive(Debug, Serialize)]
pub struct HeaderSaveResponse {
    pub success: bool,
}

/// The current header configuration (default when nothing is stored).
#[instrument(skip_all)]
pub async fn load(State(state): State<AppState>) -> Json<HeaderConfig> {
    Json(state.header().load().await)
}

/// Overwrite the header configuration and notify subscribers.
#[instrument(skip_all)]
pub async fn save(
    RequireAuth(_): RequireAuth,
    State(state): State<AppState>,
    Json(config): Json<HeaderConfig>,
) -> Result<Json<HeaderSaveResponse>, ApiError> {
    state
        .header()
        .save(&config)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    tracing::info!("header configuration saved");
    Ok(Json(HeaderSaveResponse { success: true }))
}

/// SSE stream of header configuration updates.
///
/// Each save pushes the new configuration as a `header` event; open editor
/// views subscribe here instead of polling.
#[instrument(skip_all)]
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut updates = state.header().subscribe();

    let stream = async_stream::stream! {
        loop {
            match updates.recv().await {
                Ok(config) => {
                    if let Ok(event) = Event::default().event("header").json_data(&config) {
                        yield Ok::<_, Infallible>(event);
                    }
                }
                // A slow consumer missed some updates; the next one carries
                // the full current state anyway.
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

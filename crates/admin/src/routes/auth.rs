//! Authentication route handlers.

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::ApiError;
use crate::middleware::bearer_token;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth", post(authenticate))
        .route("/api/logout", post(logout))
        .route("/api/refresh-token", post(refresh))
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub password: String,
}

/// Successful login response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

/// Logout response; returned unconditionally.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// Refresh response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub needs_refresh: bool,
}

/// Exchange the admin password for a bearer token.
#[instrument(skip_all)]
pub async fn authenticate(
    State(state): State<AppState>,
    Json(body): Json<AuthRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if body.password.is_empty() {
        return Err(ApiError::Validation("password is required".to_string()));
    }

    let token = state.auth().authenticate(&body.password)?;
    tracing::info!("admin authenticated");
    Ok(Json(AuthResponse { token }))
}

/// Advisory logout: reports success whether or not a usable token was
/// presented. Nothing is revoked; clients drop their stored token.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<LogoutResponse> {
    state.auth().logout(bearer_token(&headers));
    Json(LogoutResponse {
        message: "Logged out successfully".to_string(),
    })
}

/// Reissue a token when the presented one is close to expiry.
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, ApiError> {
    let token = bearer_token(&headers).ok_or(ApiError::Auth(AuthError::MissingToken))?;
    let outcome = state.auth().refresh(token)?;
    Ok(Json(RefreshResponse {
        token: outcome.token,
        needs_refresh: outcome.needs_refresh,
    }))
}

//! Authentication extractor for protected routes.
//!
//! Every mutating endpoint takes [`RequireAuth`], which validates the
//! `Authorization: Bearer` header against the token service before the
//! handler body runs.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use crate::error::ApiError;
use crate::services::auth::{AuthError, TokenStatus};
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// Rejects with 401 (as an [`ApiError::Auth`] JSON body) when the header is
/// missing, malformed, expired, or signed by someone else.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(status): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("token expires at {}", status.claims.exp)
/// }
/// ```
pub struct RequireAuth(pub TokenStatus);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(ApiError::Auth(AuthError::MissingToken))?;
        let status = state.auth().verify(token)?;
        Ok(Self(status))
    }
}

/// The token from an `Authorization: Bearer` header, if present.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

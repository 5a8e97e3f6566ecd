//! Auth service errors.

use thiserror::Error;

/// Errors from credential checks and token handling.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Password did not match the configured digest.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No bearer token on a protected request.
    #[error("no token provided")]
    MissingToken,

    /// Token signature valid but past its expiry.
    #[error("token expired")]
    TokenExpired,

    /// Token malformed, unsigned by us, or missing the authorized claim.
    #[error("invalid token")]
    InvalidToken,

    /// Token could not be signed (configuration-level failure).
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::TokenExpired,
            _ => Self::InvalidToken,
        }
    }
}

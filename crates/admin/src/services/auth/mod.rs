//! Bearer-token authentication.
//!
//! One shared secret, one kind of token: a signed claim that the caller is
//! authorized, valid for 24 hours. Tokens within an hour of expiry should
//! be refreshed. There is no revocation list; logout is advisory and the
//! only thing that ends a token's life is its signed expiry.

mod error;

pub use error::AuthError;

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::instrument;

/// Token lifetime.
const TOKEN_TTL_HOURS: i64 = 24;

/// Remaining lifetime under which a refresh is recommended.
const REFRESH_THRESHOLD_SECS: i64 = 60 * 60;

/// Signed token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The only assertion the token carries.
    pub authorized: bool,
    /// Issue time (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// Verification outcome for a live token.
#[derive(Debug, Clone)]
pub struct TokenStatus {
    /// Decoded claims.
    pub claims: Claims,
    /// Remaining lifetime is under the refresh threshold.
    pub should_refresh: bool,
}

/// Outcome of a refresh request.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// Replacement token, present only when a refresh was due.
    pub token: Option<String>,
    /// Whether the presented token was inside the refresh window.
    pub needs_refresh: bool,
}

/// The auth guard: credential check plus token mint/verify/refresh.
pub struct TokenService {
    secret: SecretString,
    password_digest: Vec<u8>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a service from the signing secret and the hex SHA-256 digest
    /// the login password is checked against.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if the configured digest is not valid
    /// hex (configuration validation should have caught this earlier).
    pub fn new(secret: SecretString, password_hash_hex: &str) -> Result<Self, AuthError> {
        let password_digest = hex::decode(password_hash_hex)
            .map_err(|e| AuthError::Signing(format!("bad password digest: {e}")))?;
        Ok(Self {
            secret,
            password_digest,
        })
    }

    /// Check a password and mint a token on success.
    ///
    /// The comparison is between SHA-256 digests, so timing reveals nothing
    /// about where the raw password diverges.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] on mismatch.
    #[instrument(skip_all)]
    pub fn authenticate(&self, password: &str) -> Result<String, AuthError> {
        let supplied = Sha256::digest(password.as_bytes());
        if !digest_eq(supplied.as_slice(), &self.password_digest) {
            return Err(AuthError::InvalidCredentials);
        }
        self.mint()
    }

    /// Sign a fresh token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if encoding fails.
    pub fn mint(&self) -> Result<String, AuthError> {
        self.mint_with_ttl(Duration::hours(TOKEN_TTL_HOURS))
    }

    fn mint_with_ttl(&self, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            authorized: true,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Validate a token's signature, expiry, and authorized claim.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenExpired`] past the signed expiry and
    /// [`AuthError::InvalidToken`] for anything else that fails.
    #[instrument(skip_all)]
    pub fn verify(&self, token: &str) -> Result<TokenStatus, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &Validation::default(),
        )?;

        if !data.claims.authorized {
            return Err(AuthError::InvalidToken);
        }

        let remaining = data.claims.exp - Utc::now().timestamp();
        Ok(TokenStatus {
            should_refresh: remaining < REFRESH_THRESHOLD_SECS,
            claims: data.claims,
        })
    }

    /// Reissue a token when the presented one is inside the refresh window.
    ///
    /// # Errors
    ///
    /// Propagates verification failures on the presented token.
    #[instrument(skip_all)]
    pub fn refresh(&self, token: &str) -> Result<RefreshOutcome, AuthError> {
        let status = self.verify(token)?;
        if status.should_refresh {
            Ok(RefreshOutcome {
                token: Some(self.mint()?),
                needs_refresh: true,
            })
        } else {
            Ok(RefreshOutcome {
                token: None,
                needs_refresh: false,
            })
        }
    }

    /// Advisory logout: verifies the token for the logs, revokes nothing,
    /// and always reports success. The token stays valid until its expiry.
    #[instrument(skip_all)]
    pub fn logout(&self, token: Option<&str>) {
        if let Some(token) = token {
            match self.verify(token) {
                Ok(_) => tracing::info!("logout with valid token"),
                Err(e) => tracing::debug!(error = %e, "logout with unusable token"),
            }
        }
    }
}

/// Fixed-time equality over digests.
fn digest_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "unit-test-signing-secret-with-length";
    const PASSWORD: &str = "correct horse battery staple";

    fn service() -> TokenService {
        let digest = hex::encode(Sha256::digest(PASSWORD.as_bytes()));
        TokenService::new(SecretString::from(TEST_SECRET), &digest).unwrap()
    }

    #[test]
    fn test_authenticate_then_verify() {
        let service = service();
        let token = service.authenticate(PASSWORD).unwrap();

        let status = service.verify(&token).unwrap();
        assert!(status.claims.authorized);
        assert!(!status.should_refresh, "fresh 24h token needs no refresh");
        assert!(status.claims.exp > status.claims.iat);
    }

    #[test]
    fn test_wrong_password_is_rejected() {
        let err = service().authenticate("not the password").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = service();
        // Past expiry beyond the library's default leeway.
        let token = service.mint_with_ttl(Duration::hours(-2)).unwrap();
        let err = service.verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let service = service();
        let other = TokenService::new(
            SecretString::from("a-completely-different-signing-secret"),
            &hex::encode(Sha256::digest(PASSWORD.as_bytes())),
        )
        .unwrap();

        let token = other.mint().unwrap();
        let err = service.verify(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let err = service().verify("not.a.token").unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn test_near_expiry_token_should_refresh() {
        let service = service();
        let token = service.mint_with_ttl(Duration::minutes(30)).unwrap();
        let status = service.verify(&token).unwrap();
        assert!(status.should_refresh);
    }

    #[test]
    fn test_refresh_reissues_only_inside_window() {
        let service = service();

        let fresh = service.mint().unwrap();
        let outcome = service.refresh(&fresh).unwrap();
        assert!(!outcome.needs_refresh);
        assert!(outcome.token.is_none());

        let near_expiry = service.mint_with_ttl(Duration::minutes(30)).unwrap();
        let outcome = service.refresh(&near_expiry).unwrap();
        assert!(outcome.needs_refresh);
        let new_token = outcome.token.unwrap();
        assert!(!service.verify(&new_token).unwrap().should_refresh);
    }

    #[test]
    fn test_logout_never_fails() {
        let service = service();
        service.logout(None);
        service.logout(Some("garbage"));

        // Advisory only: the token still verifies afterwards.
        let token = service.mint().unwrap();
        service.logout(Some(&token));
        assert!(service.verify(&token).is_ok());
    }

    #[test]
    fn test_digest_eq() {
        assert!(digest_eq(&[1, 2, 3], &[1, 2, 3]));
        assert!(!digest_eq(&[1, 2, 3], &[1, 2, 4]));
        assert!(!digest_eq(&[1, 2], &[1, 2, 3]));
    }

    #[test]
    fn test_bad_configured_digest_is_a_setup_error() {
        let err = TokenService::new(SecretString::from(TEST_SECRET), "zzzz").unwrap_err();
        assert!(matches!(err, AuthError::Signing(_)));
    }
}

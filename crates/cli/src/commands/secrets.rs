//! Secret-material helpers: password digests and scripted tokens.

#![allow(clippy::print_stdout)] // command output

use secrecy::SecretString;
use sha2::{Digest, Sha256};

use vitrina_admin::services::auth::TokenService;

/// Print the hex SHA-256 digest of `password`.
///
/// The digest is what goes into `ADMIN_PASSWORD_HASH`; the password itself
/// never appears in deployment configuration.
pub fn hash_password(password: &str) {
    println!("{}", hex::encode(Sha256::digest(password.as_bytes())));
}

/// Mint a bearer token with the secret from the environment.
///
/// Useful for scripted API calls (curl, CI smoke tests) without going
/// through the password exchange.
///
/// # Errors
///
/// Returns an error if `ADMIN_TOKEN_SECRET` or `ADMIN_PASSWORD_HASH` is
/// missing or unusable.
pub fn mint_token() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let secret = std::env::var("ADMIN_TOKEN_SECRET")
        .map(SecretString::from)
        .map_err(|_| "ADMIN_TOKEN_SECRET not set")?;
    let password_hash =
        std::env::var("ADMIN_PASSWORD_HASH").map_err(|_| "ADMIN_PASSWORD_HASH not set")?;

    let service = TokenService::new(secret, &password_hash)?;
    println!("{}", service.mint()?);
    Ok(())
}

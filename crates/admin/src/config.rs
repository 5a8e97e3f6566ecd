//! Admin service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_PASSWORD_HASH` - Hex SHA-256 digest of the admin password
//! - `ADMIN_TOKEN_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3000)
//! - `BLOB_BACKEND` - `vercel`, `local`, or `memory` (default: local)
//! - `BLOB_READ_WRITE_TOKEN` - Write credential for the hosted blob API
//! - `BLOB_API_URL` - Hosted blob API endpoint (default: https://blob.vercel-storage.com)
//! - `BLOB_LOCAL_ROOT` - Directory for the local backend (default: data/blobs)
//! - `BLOB_PUBLIC_BASE_URL` - Public URL prefix for locally stored blobs
//! - `HEADER_CONFIG_PATH` - Header document path (default: data/header.json)
//! - `CORS_ALLOWED_ORIGIN` - Allowed origin; `*` if unset
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which blob storage adapter to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobBackend {
    /// Hosted blob HTTP API (bearer-token REST).
    Vercel,
    /// Local filesystem directory.
    Local,
    /// In-process map; contents die with the process.
    Memory,
}

impl BlobBackend {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        match s {
            "vercel" => Ok(Self::Vercel),
            "local" => Ok(Self::Local),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidEnvVar(
                "BLOB_BACKEND".to_string(),
                format!("unknown backend '{other}' (expected vercel, local, or memory)"),
            )),
        }
    }
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Hex SHA-256 digest the login password is checked against
    pub password_hash: String,
    /// Token signing secret
    pub token_secret: SecretString,
    /// Blob storage configuration
    pub blob: BlobConfig,
    /// Path of the persisted header configuration document
    pub header_config_path: PathBuf,
    /// Allowed CORS origin; `None` means any origin
    pub cors_allowed_origin: Option<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Blob storage configuration.
///
/// Implements `Debug` manually to redact the write credential.
#[derive(Clone)]
pub struct BlobConfig {
    /// Selected adapter
    pub backend: BlobBackend,
    /// Write credential for the hosted API; absence makes writes fail with
    /// a not-configured error at call time, not at startup
    pub read_write_token: Option<SecretString>,
    /// Hosted blob API endpoint
    pub api_url: String,
    /// Root directory for the local backend
    pub local_root: PathBuf,
    /// Public URL prefix under which locally stored blobs are served
    pub public_base_url: String,
}

impl std::fmt::Debug for BlobConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobConfig")
            .field("backend", &self.backend)
            .field(
                "read_write_token",
                &self.read_write_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_url", &self.api_url)
            .field("local_root", &self.local_root)
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the token secret fails validation (placeholder detection, entropy
    /// check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ADMIN_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;

        let password_hash = get_required_env("ADMIN_PASSWORD_HASH")?;
        validate_password_hash(&password_hash)?;

        let token_secret = get_validated_secret("ADMIN_TOKEN_SECRET")?;
        validate_token_secret(&token_secret, "ADMIN_TOKEN_SECRET")?;

        let blob = BlobConfig::from_env()?;
        let header_config_path =
            PathBuf::from(get_env_or_default("HEADER_CONFIG_PATH", "data/header.json"));

        Ok(Self {
            host,
            port,
            password_hash,
            token_secret,
            blob,
            header_config_path,
            cors_allowed_origin: get_optional_env("CORS_ALLOWED_ORIGIN"),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl BlobConfig {
    /// Load blob storage configuration on its own (the seeding CLI needs
    /// it without the auth half of [`AdminConfig`]).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `BLOB_BACKEND` names an unknown adapter.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = BlobBackend::parse(&get_env_or_default("BLOB_BACKEND", "local"))?;
        let local_root = PathBuf::from(get_env_or_default("BLOB_LOCAL_ROOT", "data/blobs"));
        let public_base_url =
            get_env_or_default("BLOB_PUBLIC_BASE_URL", "http://localhost:3000/blobs");

        Ok(Self {
            backend,
            read_write_token: get_optional_env("BLOB_READ_WRITE_TOKEN").map(SecretString::from),
            api_url: get_env_or_default("BLOB_API_URL", "https://blob.vercel-storage.com"),
            local_root,
            public_base_url,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that the stored password hash is a hex SHA-256 digest.
fn validate_password_hash(hash: &str) -> Result<(), ConfigError> {
    if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ConfigError::InvalidEnvVar(
            "ADMIN_PASSWORD_HASH".to_string(),
            "expected a 64-character hex SHA-256 digest (see `vitrina-cli hash-password`)"
                .to_string(),
        ));
    }
    Ok(())
}

/// Validate that the token secret meets minimum length requirements.
fn validate_token_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

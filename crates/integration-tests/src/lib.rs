//! Integration tests for Vitrina.
//!
//! # Running Tests
//!
//! The service-level tests run anywhere (they use the in-memory blob
//! backend). The HTTP tests are `#[ignore]`d and need a running server:
//!
//! ```bash
//! # Start the admin API with the local blob backend
//! BLOB_BACKEND=memory cargo run -p vitrina-admin
//!
//! # Run the HTTP tests against it
//! ADMIN_TEST_PASSWORD=... cargo test -p vitrina-integration-tests -- --ignored
//! ```

/// Base URL for the admin API (configurable via environment).
#[must_use]
pub fn admin_base_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// The admin password HTTP tests authenticate with.
#[must_use]
pub fn test_password() -> String {
    std::env::var("ADMIN_TEST_PASSWORD").unwrap_or_else(|_| "integration-test-password".to_string())
}

/// A 1x1 transparent PNG as a base64 `data:` URL; enough to drive the
/// image pipeline without an image dependency in this crate.
pub const TINY_PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

/// Authenticate against a running server and return a bearer token.
///
/// # Panics
///
/// Panics when the server is unreachable or rejects the test password;
/// HTTP tests cannot proceed without a token.
pub async fn authenticate(client: &reqwest::Client) -> String {
    let response = client
        .post(format!("{}/api/auth", admin_base_url()))
        .json(&serde_json::json!({ "password": test_password() }))
        .send()
        .await
        .expect("auth request failed");
    assert!(
        response.status().is_success(),
        "authentication failed; is ADMIN_TEST_PASSWORD correct?"
    );

    let body: serde_json::Value = response.json().await.expect("auth response not JSON");
    body.get("token")
        .and_then(|t| t.as_str())
        .expect("auth response has no token")
        .to_string()
}

//! Hosted blob store adapter (Vercel Blob HTTP API).
//!
//! Plain REST over `reqwest`: `PUT /{pathname}` to store, `GET /?limit=` to
//! list, `POST /delete` to remove, and an anonymous `GET` on the public URL
//! to read. All mutating calls carry the deployment's read-write token.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::{BlobInfo, BlobStore, PutOptions, StorageError, validate_name};

const API_VERSION: &str = "7";

/// Client for the hosted blob HTTP API.
pub struct VercelBlobStore {
    client: reqwest::Client,
    api_url: String,
    token: Option<SecretString>,
}

impl VercelBlobStore {
    /// Create a new client. A missing token is not an error here: it makes
    /// every call fail with [`StorageError::NotConfigured`] at call time.
    #[must_use]
    pub fn new(api_url: &str, token: Option<SecretString>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// The configured write credential, checked before any network call.
    fn token(&self) -> Result<&str, StorageError> {
        self.token
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .ok_or(StorageError::NotConfigured)
    }

    /// Turn a non-success response into a [`StorageError::Api`].
    async fn api_error(response: reqwest::Response) -> StorageError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        tracing::error!(
            status,
            body = %message.chars().take(500).collect::<String>(),
            "Blob API returned non-success status"
        );
        StorageError::Api {
            status,
            message: message.chars().take(200).collect(),
        }
    }
}

/// Response body of a successful `PUT`.
#[derive(Debug, Deserialize)]
struct PutResponse {
    url: String,
}

/// Response body of a `GET /?limit=` listing.
#[derive(Debug, Deserialize)]
struct ListResponse {
    blobs: Vec<ListedBlob>,
}

#[derive(Debug, Deserialize)]
struct ListedBlob {
    pathname: String,
    url: String,
}

#[async_trait]
impl BlobStore for VercelBlobStore {
    #[instrument(skip(self, bytes), fields(name = %name, size = bytes.len()))]
    async fn put(
        &self,
        name: &str,
        bytes: Vec<u8>,
        opts: &PutOptions,
    ) -> Result<String, StorageError> {
        let token = self.token()?;
        validate_name(name)?;

        let response = self
            .client
            .put(format!("{}/{name}", self.api_url))
            .bearer_auth(token)
            .header("x-api-version", API_VERSION)
            .header("x-content-type", &opts.content_type)
            // Names are generated by the caller; the store must not append
            // its own suffix or overwrite-at-name stops working.
            .header("x-add-random-suffix", "0")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let body: PutResponse = response.json().await?;
        Ok(body.url)
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<BlobInfo>, StorageError> {
        let token = self.token()?;

        let response = self
            .client
            .get(format!("{}/?limit=1000", self.api_url))
            .bearer_auth(token)
            .header("x-api-version", API_VERSION)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let body: ListResponse = response.json().await?;
        Ok(body
            .blobs
            .into_iter()
            .map(|b| BlobInfo {
                name: b.pathname,
                url: b.url,
            })
            .collect())
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn get(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        // Stored objects are public; reads need no credential.
        let response = self.client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(url.to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        Ok(response.bytes().await?.to_vec())
    }

    #[instrument(skip(self), fields(name = %name))]
    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let token = self.token()?;
        validate_name(name)?;

        // The delete endpoint accepts pathnames as well as absolute URLs.
        let response = self
            .client
            .post(format!("{}/delete", self.api_url))
            .bearer_auth(token)
            .header("x-api-version", API_VERSION)
            .json(&serde_json::json!({ "urls": [name] }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_fails_before_any_network_call() {
        // Point at an unroutable host: if the adapter tried the network the
        // test would hang or return a transport error instead.
        let store = VercelBlobStore::new("http://192.0.2.1", None);

        let err = store
            .put("x.json", b"{}".to_vec(), &PutOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotConfigured));

        let err = store.list().await.unwrap_err();
        assert!(matches!(err, StorageError::NotConfigured));

        let err = store.delete("x.json").await.unwrap_err();
        assert!(matches!(err, StorageError::NotConfigured));
    }
}

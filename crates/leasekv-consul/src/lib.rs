// # Consul KV Backend
//
// This crate provides a KvStore implementation on top of the Consul agent's
// HTTP KV API.
//
// ## Behavior
//
// - One HTTP request per KvStore call
// - No retry, no backoff, no caching: every error goes straight back to the
//   caller, which treats it as fatal for the current invocation
// - A fresh client per process; nothing is pooled across invocations
// - HTTP timeout configured (10 seconds by default)
//
// ## Error Mapping
//
// | Condition                          | Error              |
// |------------------------------------|--------------------|
// | connect/timeout/transport failure  | `StoreUnavailable` |
// | 5xx (e.g. no cluster leader)       | `StoreUnavailable` |
// | 401/403 (ACL denied)               | `StoreRejected`    |
// | 404 on get                         | `NotFound`         |
// | put answered `false`               | `StoreRejected`    |
// | any other non-success status       | `StoreRejected`    |
//
// ## Security Requirements
//
// - The ACL token NEVER appears in logs or Debug output
//
// ## API Reference
//
// - List keys: GET `/v1/kv/:prefix?keys` (404 when nothing matches)
// - Read value: GET `/v1/kv/:key?raw`
// - Write value: PUT `/v1/kv/:key`
// - Delete key: DELETE `/v1/kv/:key`

use async_trait::async_trait;
use leasekv_core::config::ConsulConfig;
use leasekv_core::traits::KvStore;
use leasekv_core::{Error, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use std::time::Duration;

/// Header carrying the ACL token
const TOKEN_HEADER: &str = "X-Consul-Token";

/// Consul-backed key-value store
///
/// The Debug implementation intentionally does NOT expose the ACL token.
pub struct ConsulKvStore {
    /// Agent HTTP API base, e.g. `http://127.0.0.1:8500`
    base_url: Url,

    /// ACL token
    /// ⚠️ NEVER log this value
    token: Option<String>,

    /// Datacenter query parameter
    datacenter: Option<String>,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl std::fmt::Debug for ConsulKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsulKvStore")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<REDACTED>"))
            .field("datacenter", &self.datacenter)
            .finish()
    }
}

impl ConsulKvStore {
    /// Create a store from validated connection settings
    pub fn new(config: &ConsulConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.base_url())
            .map_err(|e| Error::config(format!("Invalid Consul address {}: {}", config.address, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "Invalid Consul address: {}",
                config.address
            )));
        }

        Ok(Self {
            base_url,
            token: config.token.clone().filter(|t| !t.is_empty()),
            datacenter: config.datacenter.clone(),
            client,
        })
    }

    /// Agent HTTP API base URL
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// `/v1/kv/:key` with every key segment percent-encoded
    fn kv_url(&self, key: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config(format!("Invalid Consul address: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["v1", "kv"])
            .extend(key.trim_start_matches('/').split('/'));
        Ok(url)
    }

    /// Start a request against `/v1/kv/:key` with token and datacenter applied
    fn request(&self, method: Method, key: &str) -> Result<RequestBuilder> {
        let mut builder = self.client.request(method, self.kv_url(key)?);
        if let Some(ref token) = self.token {
            builder = builder.header(TOKEN_HEADER, token);
        }
        if let Some(ref dc) = self.datacenter {
            builder = builder.query(&[("dc", dc)]);
        }
        Ok(builder)
    }

    async fn send(&self, builder: RequestBuilder, key: &str) -> Result<Response> {
        builder.send().await.map_err(|e| {
            Error::store_unavailable(format!("Consul request for {} failed: {}", key, e))
        })
    }

    async fn read_body(response: Response, key: &str) -> Result<Vec<u8>> {
        let bytes = response.bytes().await.map_err(|e| {
            Error::store_unavailable(format!("Failed to read Consul response for {}: {}", key, e))
        })?;
        Ok(bytes.to_vec())
    }
}

/// Map a non-success response to the recorder's error kinds
async fn status_error(response: Response, key: &str) -> Error {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    let error_text = error_text.trim();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::store_rejected(format!(
            "Permission denied for {}: check the ACL token. Status: {}",
            key, status
        )),
        s if s.is_server_error() => Error::store_unavailable(format!(
            "Consul server error (transient) for {}: {} - {}",
            key, status, error_text
        )),
        _ => Error::store_rejected(format!(
            "Consul request for {} failed: {} - {}",
            key, status, error_text
        )),
    }
}

#[async_trait]
impl KvStore for ConsulKvStore {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let builder = self.request(Method::GET, prefix)?.query(&[("keys", "")]);
        let response = self.send(builder, prefix).await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::debug!("No keys under {}", prefix);
                Ok(Vec::new())
            }
            s if s.is_success() => {
                let body = Self::read_body(response, prefix).await?;
                let keys: Vec<String> = serde_json::from_slice(&body).map_err(|e| {
                    Error::decode(format!("Invalid key listing for {}: {}", prefix, e))
                })?;
                tracing::debug!("Listed {} keys under {}", keys.len(), prefix);
                Ok(keys)
            }
            _ => Err(status_error(response, prefix).await),
        }
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let builder = self.request(Method::GET, key)?.query(&[("raw", "")]);
        let response = self.send(builder, key).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::not_found(key)),
            s if s.is_success() => Self::read_body(response, key).await,
            _ => Err(status_error(response, key).await),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let builder = self.request(Method::PUT, key)?.body(value.to_vec());
        let response = self.send(builder, key).await?;

        if !response.status().is_success() {
            return Err(status_error(response, key).await);
        }

        // Consul answers `true`/`false`; `false` only happens for
        // check-and-set or lock writes, which are never issued here
        let body = Self::read_body(response, key).await?;
        if String::from_utf8_lossy(&body).trim() != "true" {
            return Err(Error::store_rejected(format!(
                "Consul refused write to {}",
                key
            )));
        }

        tracing::trace!("Consul PUT {} ({} bytes)", key, value.len());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let builder = self.request(Method::DELETE, key)?;
        let response = self.send(builder, key).await?;

        if !response.status().is_success() {
            return Err(status_error(response, key).await);
        }

        tracing::trace!("Consul DELETE {}", key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "consul"
    }
}

//! Vultr v2 API client
//!
//! [`VultrClient`] wraps a [`Transport`] with the response cache and the
//! retry policy. Endpoint methods are grouped by API area in the submodules.

mod backups;
mod block_storage;
mod databases;
mod domains;
mod firewall;
mod instances;
mod iso;
mod kubernetes;
mod load_balancers;
#[cfg(any(test, feature = "test-util"))]
mod mock;
mod object_storage;
mod os;
mod plans;
mod regions;
mod reserved_ips;
mod snapshots;
mod ssh_keys;
mod startup_scripts;
mod transport;
mod vpcs;

pub use block_storage::*;
pub use databases::*;
pub use domains::*;
pub use firewall::*;
pub use instances::*;
pub use kubernetes::*;
pub use load_balancers::*;
pub use object_storage::*;
pub use reserved_ips::*;
pub use snapshots::*;
pub use ssh_keys::*;
pub use startup_scripts::*;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockTransport;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
pub use vpcs::*;

use crate::cache::{CacheStats, ResponseCache};
use crate::config::Config;
use crate::retry::RetryPolicy;
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Query parameters for a request
pub type Query = Vec<(String, String)>;

/// Vultr API errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Vultr API error {status}: {message}")]
    Auth { status: u16, message: String },

    #[error("Vultr API error 404: Resource not found")]
    NotFound,

    #[error("Vultr API error 429: Rate limit exceeded")]
    RateLimited,

    #[error("Vultr API error {status}: {body}")]
    Validation { status: u16, body: String },

    #[error("Vultr API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Vultr API transport error: {0}")]
    Transport(String),

    #[error("Failed to decode Vultr API response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Map a non-2xx status and its body to an error
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => ApiError::Auth {
                status,
                message: "Invalid API key".to_string(),
            },
            403 => ApiError::Auth {
                status,
                message: "Insufficient permissions".to_string(),
            },
            404 => ApiError::NotFound,
            429 => ApiError::RateLimited,
            400 | 422 => ApiError::Validation { status, body },
            _ => ApiError::Status { status, body },
        }
    }

    /// HTTP status code, when the error came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Auth { status, .. }
            | ApiError::Validation { status, .. }
            | ApiError::Status { status, .. } => Some(*status),
            ApiError::NotFound => Some(404),
            ApiError::RateLimited => Some(429),
            ApiError::Transport(_) | ApiError::Decode(_) => None,
        }
    }

    /// Whether the request may succeed if sent again
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::RateLimited | ApiError::Transport(_) => true,
            ApiError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Build a query from string pairs
pub(crate) fn query<K: ToString, V: ToString>(pairs: &[(K, V)]) -> Query {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Client for the Vultr v2 API
pub struct VultrClient {
    transport: Arc<dyn Transport>,
    cache: Option<Arc<ResponseCache>>,
    retry: RetryPolicy,
    per_page: u32,
}

impl VultrClient {
    /// Create a client over a transport, without cache or retries
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cache: None,
            retry: RetryPolicy::none(),
            per_page: 100,
        }
    }

    /// Create an HTTP client from configuration
    pub fn from_config(config: &Config) -> Result<Self, crate::VultrMcpError> {
        let api_key = config.api_key()?;
        let transport = HttpTransport::new(&config.api, api_key)?;

        let mut client = Self::new(Arc::new(transport))
            .with_retry((&config.retry).into())
            .with_per_page(config.api.per_page);

        if config.cache.enabled {
            client = client.with_cache(Arc::new(ResponseCache::new(&config.cache)));
        }

        info!(
            base_url = %config.api.base_url,
            cache = config.cache.enabled,
            "Vultr API client ready"
        );
        Ok(client)
    }

    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    /// Cache statistics, if caching is enabled
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|c| c.stats())
    }

    /// Drop cached responses (see [`ResponseCache::invalidate`])
    pub fn clear_cache(&self, pattern: Option<&str>) {
        if let Some(cache) = &self.cache {
            cache.invalidate(pattern);
        }
    }

    /// Send a request, consulting the cache for GETs and retrying transient
    /// failures. An empty 2xx body yields `{}`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: Query,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let is_get = method == Method::GET;

        if is_get {
            if let Some(cached) = self
                .cache
                .as_ref()
                .and_then(|c| c.get(method.as_str(), path, &query))
            {
                return Ok(cached);
            }
        }

        let request = transport::ApiRequest {
            method: method.clone(),
            path: path.to_string(),
            query,
            body,
        };
        let operation = format!("{} {}", method, path);

        debug!(method = %method, path = %path, "Vultr API request");

        let value = self
            .retry
            .retry(
                &operation,
                || {
                    let request = request.clone();
                    async move {
                        let response = self.transport.send(request).await?;
                        Self::decode(response)
                    }
                },
                ApiError::is_retryable,
            )
            .await?;

        if let Some(cache) = &self.cache {
            if is_get {
                cache.set(method.as_str(), path, &request.query, value.clone());
            } else {
                cache.invalidate_endpoint(path);
            }
        }

        Ok(value)
    }

    fn decode(response: ApiResponse) -> Result<Value, ApiError> {
        if !(200..300).contains(&response.status) {
            return Err(ApiError::from_status(response.status, response.body));
        }

        if response.status == 204 || response.body.trim().is_empty() {
            return Ok(json!({}));
        }

        serde_json::from_str(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::GET, path, Vec::new(), None).await
    }

    pub async fn get_with_query(&self, path: &str, query: Query) -> Result<Value, ApiError> {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        self.request(Method::POST, path, Vec::new(), Some(to_body(body)?))
            .await
    }

    /// POST without a request body (power actions, key regeneration)
    pub async fn post_empty(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::POST, path, Vec::new(), None).await
    }

    pub async fn put<B: Serialize>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        self.request(Method::PUT, path, Vec::new(), Some(to_body(body)?))
            .await
    }

    pub async fn patch<B: Serialize>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        self.request(Method::PATCH, path, Vec::new(), Some(to_body(body)?))
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::DELETE, path, Vec::new(), None).await
    }

    /// Fetch every page of a list endpoint and concatenate `body[key]`
    pub async fn list_all(&self, path: &str, key: &str) -> Result<Vec<Value>, ApiError> {
        self.list_all_with_query(path, key, Vec::new()).await
    }

    /// [`list_all`](Self::list_all) with extra query parameters
    pub async fn list_all_with_query(
        &self,
        path: &str,
        key: &str,
        base_query: Query,
    ) -> Result<Vec<Value>, ApiError> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = base_query.clone();
            query.push(("per_page".to_string(), self.per_page.to_string()));
            if let Some(cursor) = &cursor {
                query.push(("cursor".to_string(), cursor.clone()));
            }

            let body = self.get_with_query(path, query).await?;
            if let Some(page) = body.get(key).and_then(Value::as_array) {
                items.extend(page.iter().cloned());
            }

            let next = body
                .pointer("/meta/links/next")
                .and_then(Value::as_str)
                .filter(|next| !next.is_empty())
                .map(str::to_string);

            match next {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(items)
    }

    /// GET a single object and unwrap its envelope (`{"instance": {...}}`)
    pub async fn get_object(&self, path: &str, key: &str) -> Result<Value, ApiError> {
        let body = self.get(path).await?;
        Ok(unwrap_envelope(body, key))
    }
}

/// Return `body[key]` when present, otherwise the body itself
pub(crate) fn unwrap_envelope(mut body: Value, key: &str) -> Value {
    match body.get_mut(key) {
        Some(inner) => inner.take(),
        None => body,
    }
}

fn to_body<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))
}

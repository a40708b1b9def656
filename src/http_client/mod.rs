//! Pooled, retry-capable HTTP clients for outbound webhook deliveries.

use std::{collections::HashMap, sync::Arc, time::Duration};

use reqwest::Client as ReqwestClient;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, Jitter, RetryTransientMiddleware};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::{HttpRetryConfig, JitterSetting};

/// Errors that can occur within the `HttpClientPool`.
#[derive(Debug, Error)]
pub enum HttpClientPoolError {
    /// An error occurred while building the underlying `reqwest::Client`.
    #[error("Failed to create HTTP client: {0}")]
    HttpClientBuildError(String),
}

/// Wraps a base client with retry middleware built from the given policy.
pub fn create_retryable_http_client(
    config: &HttpRetryConfig,
    base_client: reqwest::Client,
) -> ClientWithMiddleware {
    let policy_builder = match config.jitter {
        JitterSetting::None => ExponentialBackoff::builder().jitter(Jitter::None),
        JitterSetting::Full => ExponentialBackoff::builder().jitter(Jitter::Full),
    };

    let retry_policy = policy_builder
        .base(config.base_for_backoff)
        .retry_bounds(config.initial_backoff_ms, config.max_backoff_secs)
        .build_with_max_retries(config.max_retries);

    ClientBuilder::new(base_client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}

/// A thread-safe pool of HTTP clients keyed by retry policy.
///
/// One client per distinct `HttpRetryConfig`: channels sharing a policy share
/// a connection pool, channels with different policies stay isolated.
pub struct HttpClientPool {
    clients: Arc<RwLock<HashMap<String, Arc<ClientWithMiddleware>>>>,
}

impl HttpClientPool {
    /// Creates a new, empty pool.
    pub fn new() -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Gets the client for a retry policy, creating it on first use.
    ///
    /// Double-checked locking: the read lock covers the steady state, the
    /// write lock only the first request per policy.
    pub async fn get_or_create(
        &self,
        retry_policy: &HttpRetryConfig,
    ) -> Result<Arc<ClientWithMiddleware>, HttpClientPoolError> {
        let key = format!("{retry_policy:?}");

        if let Some(client) = self.clients.read().await.get(&key) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let base_client = ReqwestClient::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HttpClientPoolError::HttpClientBuildError(e.to_string()))?;

        let new_client = Arc::new(create_retryable_http_client(retry_policy, base_client));
        clients.insert(key, new_client.clone());

        Ok(new_client)
    }

    #[cfg(test)]
    pub(crate) async fn active_client_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

impl Default for HttpClientPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_policy_returns_same_client() {
        let pool = HttpClientPool::new();
        let retry_config = HttpRetryConfig::default();

        let client1 = pool.get_or_create(&retry_config).await.unwrap();
        let client2 = pool.get_or_create(&retry_config).await.unwrap();

        assert!(Arc::ptr_eq(&client1, &client2));
        assert_eq!(pool.active_client_count().await, 1);
    }

    #[tokio::test]
    async fn distinct_policies_get_distinct_clients() {
        let pool = HttpClientPool::new();
        let first = HttpRetryConfig::default();
        let second = HttpRetryConfig {
            max_retries: 7,
            ..Default::default()
        };

        let client1 = pool.get_or_create(&first).await.unwrap();
        let client2 = pool.get_or_create(&second).await.unwrap();

        assert!(!Arc::ptr_eq(&client1, &client2));
        assert_eq!(pool.active_client_count().await, 2);
    }

    #[tokio::test]
    async fn concurrent_access_creates_one_client() {
        let pool = Arc::new(HttpClientPool::new());
        let retry_config = HttpRetryConfig::default();

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let retry_config = retry_config.clone();
                tokio::spawn(async move { pool.get_or_create(&retry_config).await.is_ok() })
            })
            .collect();

        for task in futures::future::join_all(tasks).await {
            assert!(task.unwrap());
        }
        assert_eq!(pool.active_client_count().await, 1);
    }
}

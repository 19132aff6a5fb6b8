//! HTTP Client Module
//!
//! Provides a robust HTTP client with:
//! - Semaphore-based concurrency limiting
//! - Exponential backoff with jitter for retries
//! - Per-source rate limiting

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{
    clock::DefaultClock, middleware::NoOpMiddleware, state::NotKeyed, Quota, RateLimiter,
};
use reqwest::{Client, Response, StatusCode};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{NewsError, Result};

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Maximum concurrent requests across all sources
    pub max_concurrent_requests: usize,
    /// Request timeout
    pub request_timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Maximum retries for failed requests
    pub max_retries: u32,
    /// Initial retry delay
    pub initial_retry_delay: Duration,
    /// Maximum retry delay
    pub max_retry_delay: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 10,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_retries: 3,
            initial_retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(30),
            user_agent: format!("newsgate/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Resilient HTTP client with concurrency limiting and retries
pub struct ResilientHttpClient {
    /// Inner reqwest client
    client: Client,
    /// Global concurrency semaphore
    semaphore: Arc<Semaphore>,
    /// Configuration
    config: HttpClientConfig,
}

impl ResilientHttpClient {
    /// Creates a new resilient HTTP client
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(NewsError::HttpError)?;

        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_requests));

        Ok(Self {
            client,
            semaphore,
            config,
        })
    }

    /// Creates a client with default configuration
    pub fn with_defaults() -> Result<Self> {
        Self::new(HttpClientConfig::default())
    }

    /// Fetches a URL with retry logic (exponential backoff + jitter),
    /// returning the raw body text of a successful response.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        response.text().await.map_err(NewsError::HttpError)
    }

    /// Executes a GET request with retry logic
    pub async fn get(&self, url: &str) -> Result<Response> {
        // Acquire semaphore permit for the whole retry sequence
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| NewsError::ConnectionLost("Semaphore closed".to_string()))?;

        debug!(url, "Executing HTTP request");

        let mut attempt = 0u32;
        let mut delay = self.config.initial_retry_delay;
        let max_retries = self.config.max_retries;

        loop {
            attempt += 1;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        debug!(%status, attempt, "Request succeeded");
                        return Ok(response);
                    } else if Self::is_retryable_status(status) && attempt <= max_retries {
                        warn!(%status, attempt, max_retries, "Retryable error, will retry");
                        delay = self.sleep_with_jitter(delay).await;
                    } else {
                        let body = response.text().await.unwrap_or_default();
                        return Err(NewsError::UpstreamStatus {
                            status: status.as_u16(),
                            message: body,
                        });
                    }
                }
                Err(e) => {
                    if (e.is_timeout() || e.is_connect()) && attempt <= max_retries {
                        warn!(error = %e, attempt, "Transient error, will retry");
                        delay = self.sleep_with_jitter(delay).await;
                    } else {
                        return Err(NewsError::HttpError(e));
                    }
                }
            }
        }
    }

    /// Sleeps for the jittered delay, returning the next backoff delay
    async fn sleep_with_jitter(&self, delay: Duration) -> Duration {
        // Jitter: random factor between 0.5 and 1.5
        let jitter = 0.5 + rand::random::<f64>();
        let jittered = Duration::from_secs_f64(delay.as_secs_f64() * jitter);
        tokio::time::sleep(jittered).await;
        std::cmp::min(delay * 2, self.config.max_retry_delay)
    }

    /// Checks if a status code should trigger a retry
    fn is_retryable_status(status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::TOO_MANY_REQUESTS |     // 429
            StatusCode::SERVICE_UNAVAILABLE |   // 503
            StatusCode::GATEWAY_TIMEOUT |       // 504
            StatusCode::BAD_GATEWAY |           // 502
            StatusCode::REQUEST_TIMEOUT // 408
        )
    }

    /// Gets the number of available permits
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Source-specific HTTP client with rate limiting
pub struct SourceHttpClient {
    /// Resilient base client
    client: Arc<ResilientHttpClient>,
    /// Source-specific rate limiter
    rate_limiter: RateLimiter<NotKeyed, governor::state::InMemoryState, DefaultClock, NoOpMiddleware>,
    /// Source identifier
    source_id: String,
}

impl SourceHttpClient {
    /// Creates a new source-specific client
    pub fn new(client: Arc<ResilientHttpClient>, source_id: &str, rate_limit_rpm: u32) -> Self {
        let quota = Quota::per_minute(
            NonZeroU32::new(rate_limit_rpm).unwrap_or(NonZeroU32::new(60).unwrap()),
        );
        let rate_limiter = RateLimiter::direct(quota);

        Self {
            client,
            rate_limiter,
            source_id: source_id.to_string(),
        }
    }

    /// Fetches a URL's body text after waiting out the source rate limit
    pub async fn get_text(&self, url: &str) -> Result<String> {
        self.rate_limiter.until_ready().await;
        self.client.get_text(url).await
    }

    /// Fetches a URL's raw body bytes after waiting out the source rate limit
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.rate_limiter.until_ready().await;
        let response = self.client.get(url).await?;
        let bytes = response.bytes().await.map_err(NewsError::HttpError)?;
        Ok(bytes.to_vec())
    }

    /// Gets the source ID
    pub fn source_id(&self) -> &str {
        &self.source_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = HttpClientConfig::default();
        assert_eq!(config.max_concurrent_requests, 10);
        assert_eq!(config.max_retries, 3);
    }

    #[tokio::test]
    async fn test_semaphore_limiting() {
        let config = HttpClientConfig {
            max_concurrent_requests: 2,
            ..Default::default()
        };

        let client = ResilientHttpClient::new(config).unwrap();

        assert_eq!(client.available_permits(), 2);
    }

    #[test]
    fn test_retryable_status() {
        assert!(ResilientHttpClient::is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(ResilientHttpClient::is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!ResilientHttpClient::is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!ResilientHttpClient::is_retryable_status(StatusCode::UNAUTHORIZED));
    }
}

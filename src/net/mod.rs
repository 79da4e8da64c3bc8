//! Network utilities: shared HTTP client, rate limiting, and content parsing.
//!
//! This module provides the networking infrastructure adapters build on:
//!
//! - **HTTP client**: one global, connection-pooled client behind a
//!   per-source [`HttpClient`] wrapper
//! - **Rate limiting**: a minimum delay between requests to the same source
//! - **Classification**: HTTP statuses are mapped onto the crate-wide
//!   transient/permanent failure scheme, so the retry policy (not this
//!   layer) decides what gets retried
//! - **Content parsing**: HTML ([`html`]) and JSON ([`json`]) helpers
//!
//! # Examples
//!
//! ```rust
//! use hakken::net::HttpClient;
//!
//! # async fn example() -> hakken::Result<()> {
//! let client = HttpClient::new("hianime")
//!     .with_rate_limit(500) // 500ms between requests
//!     .with_header("Referer", "https://hianime.to/");
//!
//! let page = client.get_text("https://hianime.to/search?keyword=bebop").await?;
//! # Ok(())
//! # }
//! ```

use std::time::{Duration, Instant};

use bytes::Bytes;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use reqwest::{Client, header::HeaderMap};

use crate::error::{Error, Result};

pub mod html;
pub mod json;

/// Global HTTP client with connection pooling and compression.
///
/// Created lazily on first use and shared by every [`HttpClient`]; the
/// per-source wrappers only add headers and rate limiting on top.
static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("hakken/0.2.0")
        .pool_max_idle_per_host(10)
        .gzip(true)
        .brotli(true)
        .build()
        .expect("Failed to build HTTP client")
});

/// Enforces a minimum delay between consecutive requests.
///
/// Each [`HttpClient`] owns one limiter, so the delay is effectively
/// per-source. Cloning produces a limiter with fresh state.
#[derive(Debug)]
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_delay: Duration,
}

impl Clone for RateLimiter {
    fn clone(&self) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_delay: self.min_delay,
        }
    }
}

impl RateLimiter {
    /// Creates a rate limiter with the given minimum delay in milliseconds.
    pub fn new(delay_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_delay: Duration::from_millis(delay_ms),
        }
    }

    /// Sleeps if the previous request was less than the minimum delay ago.
    pub async fn wait(&self) {
        let pause = {
            let last = self.last_request.lock();
            last.map(|instant| {
                let elapsed = instant.elapsed();
                self.min_delay.saturating_sub(elapsed)
            })
        };

        if let Some(pause) = pause
            && !pause.is_zero()
        {
            tokio::time::sleep(pause).await;
        }

        *self.last_request.lock() = Some(Instant::now());
    }
}

/// Per-source HTTP client with rate limiting and failure classification.
///
/// Unlike a general-purpose client, `HttpClient` performs exactly one
/// attempt per call: retrying is the job of the
/// [`RetryPolicy`](crate::retry::RetryPolicy) that wraps the adapter
/// invocation, and stacking a second retry loop underneath it would
/// multiply attempts. What this layer does contribute is classification:
/// every failure comes back as a transient or permanent error the policy
/// can act on:
///
/// | Response            | Error                                          |
/// |---------------------|------------------------------------------------|
/// | 429                 | [`Error::RateLimit`] (transient, `Retry-After`)|
/// | 5xx                 | transient [`Error::Source`]                    |
/// | other non-success   | permanent [`Error::Source`]                    |
/// | transport failure   | [`Error::Network`] (transient unless builder)  |
#[derive(Clone, Debug)]
pub struct HttpClient {
    source: String,
    rate_limiter: RateLimiter,
    headers: HeaderMap,
}

impl HttpClient {
    /// Creates a client for the named source with a 200ms default delay.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            rate_limiter: RateLimiter::new(200),
            headers: HeaderMap::new(),
        }
    }

    /// Sets the minimum delay between requests in milliseconds.
    pub fn with_rate_limit(mut self, delay_ms: u64) -> Self {
        self.rate_limiter = RateLimiter::new(delay_ms);
        self
    }

    /// Adds a header sent with every request. Invalid names/values are
    /// silently skipped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.parse::<reqwest::header::HeaderName>(),
            value.parse::<reqwest::header::HeaderValue>(),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Performs a rate-limited GET request and returns the response body.
    pub async fn get(&self, url: &str) -> Result<Bytes> {
        self.rate_limiter.wait().await;

        let response = CLIENT.get(url).headers(self.headers.clone()).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.bytes().await?);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return Err(Error::rate_limit(retry_after));
        }

        if status.is_server_error() {
            Err(Error::transient(&self.source, format!("HTTP {}", status)))
        } else {
            Err(Error::permanent(&self.source, format!("HTTP {}", status)))
        }
    }

    /// Performs a GET request and returns the body as a UTF-8 string.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let bytes = self.get(url).await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::parse(format!("invalid UTF-8: {}", e)))
    }

    /// Performs a GET request and deserializes the body as JSON.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hakken::net::HttpClient;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct EpisodePayload {
    ///     number: u32,
    ///     title: String,
    /// }
    ///
    /// # async fn example() -> hakken::Result<()> {
    /// let client = HttpClient::new("animetsu");
    /// let data: Vec<EpisodePayload> = client
    ///     .get_json("https://backend.animetsu.to/api/anime/eps/1535")
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_json<T>(&self, url: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let bytes = self.get(url).await?;
        serde_json::from_slice(&bytes).map_err(Into::into)
    }
}

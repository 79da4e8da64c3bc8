//! Source trait: the capability contract every anime source must satisfy.
//!
//! This module defines the core [`Source`] trait that all source adapters
//! implement. An adapter wraps one content site (an HTML catalog, a JSON
//! backend, a mock fixture) behind a uniform capability set: search, episode
//! listing, download-URL resolution, and a health check. The
//! [`SourceRegistry`](crate::registry::SourceRegistry) owns adapter
//! instances and the [`Aggregator`](crate::engine::Aggregator) borrows them
//! for the duration of a single query.
//!
//! # Examples
//!
//! ```rust
//! use async_trait::async_trait;
//! use hakken::prelude::*;
//! use hakken::error::Result;
//!
//! struct MySource {
//!     base_url: String,
//! }
//!
//! #[async_trait]
//! impl Source for MySource {
//!     fn name(&self) -> &str { "mysource" }
//!     fn base_url(&self) -> &str { &self.base_url }
//!
//!     async fn search(&self, params: SearchParams) -> Result<Vec<SearchResult>> {
//!         // Query the site and parse results here.
//!         Ok(vec![])
//!     }
//!
//!     async fn episodes(&self, title_url: &str) -> Result<Vec<Episode>> {
//!         Ok(vec![])
//!     }
//!
//!     async fn resolve(&self, episode: &Episode, quality: Quality) -> Result<String> {
//!         Err(hakken::Error::QualityUnavailable { quality, episode: episode.number })
//!     }
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    error::Result,
    types::{Episode, Quality, SearchParams, SearchResult},
};

/// Trait that all anime sources must implement.
///
/// # Contract
///
/// * Operations must be safe for concurrent invocation: multiple queries may
///   call into the same adapter instance simultaneously. Adapters that need
///   internal synchronization must provide it themselves.
/// * Operations are cancelled by dropping their futures. Implementations
///   must therefore be cancel-safe: keep all slow work behind `.await`
///   points (network I/O, sleeps) and never block the executor, so a
///   dropped future stops within its next suspension point.
/// * Errors must be classified. Use [`Error::transient`](crate::Error::transient)
///   for failures worth retrying and [`Error::permanent`](crate::Error::permanent)
///   for those that are not; unclassified errors are treated as permanent.
/// * Adapters never deduplicate across sources: returning a title another
///   source also has is expected, and resolved by the
///   [merger](crate::merge).
///
/// # Implementation guidelines
///
/// - Use [`net::HttpClient`](crate::net::HttpClient) for HTTP requests; it
///   applies per-source rate limiting and maps HTTP statuses onto the shared
///   failure classification.
/// - Leave the `source` field of returned values empty or best-effort; the
///   engine stamps it with the registered source name.
#[async_trait]
pub trait Source: Send + Sync {
    /// Returns the unique identifier for this source.
    ///
    /// A lowercase, stable string (`"hianime"`, `"animetsu"`) used for
    /// registry lookups, source filters, and result attribution.
    fn name(&self) -> &str;

    /// Returns the base URL of this source, without a trailing slash.
    fn base_url(&self) -> &str;

    /// Searches the source's catalog for titles matching the query.
    ///
    /// A well-formed query that matches nothing returns an empty vector,
    /// not an error. Errors are reserved for network and parse failures.
    async fn search(&self, params: SearchParams) -> Result<Vec<SearchResult>>;

    /// Lists the episodes available for a title.
    ///
    /// `title_url` is the canonical URL a previous search returned for this
    /// source. Fails with a permanent error if the URL is not recognized by
    /// this adapter, and with a transient one if the site is unreachable.
    ///
    /// Episode numbers are returned as the site reports them; callers must
    /// not assume they are contiguous.
    async fn episodes(&self, title_url: &str) -> Result<Vec<Episode>>;

    /// Resolves one episode + quality tier to a fetchable download URL.
    ///
    /// This is deliberately separate from [`episodes`](Source::episodes) so
    /// that listing never eagerly resolves every variant. Fails with
    /// [`Error::QualityUnavailable`](crate::Error::QualityUnavailable) when
    /// the episode does not offer the requested tier.
    async fn resolve(&self, episode: &Episode, quality: Quality) -> Result<String>;

    /// Best-effort connectivity probe.
    ///
    /// Never errors; returns `false` on any uncertainty. The default
    /// implementation issues a short GET against [`base_url`](Source::base_url)
    /// and reports whether it answered with a success status.
    async fn health_check(&self) -> bool {
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
        {
            Ok(client) => client,
            Err(_) => return false,
        };

        match client.get(self.base_url()).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

//! Aggregation engine: concurrent fan-out of one operation across sources.
//!
//! The [`Aggregator`] executes a single logical request (a search or an
//! episode listing) against every enabled source concurrently. Each
//! per-source invocation is wrapped in the
//! [`RetryPolicy`](crate::retry::RetryPolicy) and bounded by the per-source
//! timeout, and every invocation produces exactly one [`Outcome`]: partial
//! failure is the designed steady state, not an edge case, so the engine
//! never short-circuits on the first error and never drops a failed
//! source's envelope.
//!
//! The engine snapshots the registry once per query ([`Snapshot`]), borrows
//! the adapters for the duration of that call, and retains nothing across
//! calls. Outcomes are collected in snapshot order regardless of completion
//! order, which is what makes the downstream [merge](crate::merge)
//! deterministic.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use hakken::prelude::*;
//!
//! # async fn example() -> hakken::Result<()> {
//! let registry = Arc::new(SourceRegistry::new());
//! hakken::sources::register_builtin(&registry);
//! registry.load(vec![SourceEntry::new("sample")]);
//!
//! let engine = Aggregator::new(registry);
//! let output = engine.search_all("cowboy bebop".into(), &QueryOptions::default()).await?;
//!
//! for outcome in &output.outcomes {
//!     match &outcome.result {
//!         Ok(results) => println!("{}: {} results", outcome.source, results.len()),
//!         Err(e) => println!("{}: {}", outcome.source, e),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    registry::{EnabledSource, Snapshot, SourceRegistry},
    retry::RetryPolicy,
    search::SearchBuilder,
    source::Source,
    types::{Episode, Quality, SearchParams, SearchResult},
};

/// Per-source result envelope.
///
/// One `Outcome` is produced for every source a query fanned out to,
/// success or not: callers need per-source diagnostics either way.
#[derive(Debug)]
pub struct Outcome<T> {
    /// Name of the source this outcome belongs to
    pub source: String,
    /// Wall-clock time the source spent, retries included
    pub elapsed: Duration,
    /// The payload, or the classified failure
    pub result: Result<T>,
}

impl<T> Outcome<T> {
    /// Returns `true` if the source produced a payload.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Returns `true` if the source exceeded its per-source timeout.
    ///
    /// Timeouts are distinct from source errors so callers can tell a slow
    /// source from a broken one.
    pub fn is_timeout(&self) -> bool {
        matches!(&self.result, Err(e) if e.is_timeout())
    }

    /// The payload, if this outcome is a success.
    pub fn payload(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }
}

/// Everything a query produced: one outcome per source, plus total elapsed.
///
/// Outcomes appear in snapshot (priority) order, not completion order. The
/// three presentation states (empty, partial failure, total failure) are
/// distinguishable through [`is_empty`](Self::is_empty),
/// [`is_partial`](Self::is_partial), and [`all_failed`](Self::all_failed).
#[derive(Debug)]
pub struct QueryOutput<T> {
    pub outcomes: Vec<Outcome<T>>,
    pub elapsed: Duration,
}

impl<T> QueryOutput<T> {
    /// Iterates the successful payloads in snapshot order.
    pub fn successes(&self) -> impl Iterator<Item = &T> {
        self.outcomes.iter().filter_map(|o| o.payload())
    }

    /// Consumes the output, returning successful payloads in snapshot order.
    pub fn into_payloads(self) -> Vec<T> {
        self.outcomes
            .into_iter()
            .filter_map(|o| o.result.ok())
            .collect()
    }

    /// Names of the sources that succeeded.
    pub fn succeeded(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.source.as_str())
            .collect()
    }

    /// Names of the sources that failed or timed out.
    pub fn failed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.source.as_str())
            .collect()
    }

    /// Returns `true` when the query fanned out to zero sources.
    ///
    /// This happens when nothing is enabled, or when a source filter names
    /// a source that is not in the enabled set; both are empty outputs,
    /// not errors.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Returns `true` when at least one source was queried and none succeeded.
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|o| !o.is_success())
    }

    /// Returns `true` when some sources succeeded and others failed.
    pub fn is_partial(&self) -> bool {
        self.outcomes.iter().any(|o| o.is_success())
            && self.outcomes.iter().any(|o| !o.is_success())
    }
}

/// Options for one query: source filter, timeout override, cancellation.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Narrow the fan-out to this single source name
    pub source: Option<String>,
    /// Override the engine's per-source timeout for this query
    pub timeout: Option<Duration>,
    /// Token that cancels the whole query when triggered
    pub cancel: Option<CancellationToken>,
}

impl QueryOptions {
    /// Creates default options: all sources, engine timeout, no cancellation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the query to one named source.
    pub fn source(mut self, name: impl Into<String>) -> Self {
        self.source = Some(name.into());
        self
    }

    /// Overrides the per-source timeout for this query.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attaches a cancellation token.
    ///
    /// Triggering the token aborts the whole query: every outstanding
    /// per-source task is dropped (stopping mid-attempt or mid-backoff) and
    /// the query returns [`Error::Cancelled`] with no partial results.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// The aggregation engine.
///
/// Constructed with its registry dependency injected explicitly; there is
/// no ambient global configuration. The engine is cheap to share behind an
/// `Arc` and safe to use from concurrent tasks; it holds no per-query
/// state.
pub struct Aggregator {
    registry: Arc<SourceRegistry>,
    retry: RetryPolicy,
    per_source_timeout: Duration,
}

impl Aggregator {
    /// Creates an engine over the given registry.
    ///
    /// Defaults: 10s per-source timeout, default [`RetryPolicy`].
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self {
            registry,
            retry: RetryPolicy::default(),
            per_source_timeout: Duration::from_secs(10),
        }
    }

    /// Sets the default per-source timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.per_source_timeout = timeout;
        self
    }

    /// Replaces the retry policy wrapping every adapter invocation.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// The registry this engine queries.
    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    /// Starts a fluent search across the enabled sources.
    ///
    /// See [`SearchBuilder`] for the chainable parameters and the
    /// `outcomes()` / `merged()` execution strategies.
    pub fn search(&self, query: impl Into<String>) -> SearchBuilder<'_> {
        SearchBuilder::new(self, query)
    }

    /// Searches every enabled source concurrently.
    ///
    /// Returns one outcome per source; a filter naming a disabled or
    /// unknown source yields an empty output.
    pub async fn search_all(
        &self,
        params: SearchParams,
        opts: &QueryOptions,
    ) -> Result<QueryOutput<Vec<SearchResult>>> {
        let snapshot = self.registry.snapshot();
        self.search_snapshot(&snapshot, params, opts).await
    }

    /// Lists episodes for a title URL across the enabled sources.
    ///
    /// Typically used with a [`QueryOptions::source`] filter, since only
    /// the owning source recognizes the URL; an adapter that does not
    /// recognize it contributes a permanent-failure outcome without
    /// blocking the others.
    pub async fn episodes(
        &self,
        title_url: &str,
        opts: &QueryOptions,
    ) -> Result<QueryOutput<Vec<Episode>>> {
        let snapshot = self.registry.snapshot();
        let url = title_url.to_string();

        self.fan_out(&snapshot, opts, move |source: Arc<dyn Source>| {
            let url = url.clone();
            async move {
                let name = source.name().to_string();
                let mut episodes = source.episodes(&url).await?;
                for episode in &mut episodes {
                    episode.source = name.clone();
                }
                Ok(episodes)
            }
        })
        .await
    }

    /// Resolves one episode + quality to a download URL on a named source.
    ///
    /// This is a targeted single-source operation, but it goes through the
    /// same retry policy and per-source timeout as a fan-out. Fails with
    /// `NotFound` when the source is not currently enabled.
    pub async fn resolve(
        &self,
        source_name: &str,
        episode: &Episode,
        quality: Quality,
        opts: &QueryOptions,
    ) -> Result<String> {
        let snapshot = self.registry.snapshot();
        let Some(enabled) = snapshot.get(source_name) else {
            return Err(Error::not_found(format!("source: {}", source_name)));
        };

        let timeout = opts.timeout.unwrap_or(self.per_source_timeout);
        let source = enabled.source().clone();

        let result = self
            .retry
            .run(timeout, || {
                let source = source.clone();
                async move { source.resolve(episode, quality).await }
            })
            .await;

        match &result {
            Ok(_) => self.registry.mark_ok(source_name),
            Err(e) => self.registry.mark_error(source_name, &e.to_string()),
        }

        result
    }

    pub(crate) async fn search_snapshot(
        &self,
        snapshot: &Snapshot,
        params: SearchParams,
        opts: &QueryOptions,
    ) -> Result<QueryOutput<Vec<SearchResult>>> {
        // A source filter may arrive either as a plain query option or as
        // part of the search parameters (the CLI boundary hands it over as
        // a plain value); the explicit option wins.
        let mut opts = opts.clone();
        if opts.source.is_none() {
            opts.source = params.source.clone();
        }
        let opts = &opts;

        self.fan_out(snapshot, opts, move |source: Arc<dyn Source>| {
            let params = params.clone();
            async move {
                let name = source.name().to_string();
                let mut results = source.search(params).await?;
                for result in &mut results {
                    result.source = name.clone();
                }
                Ok(results)
            }
        })
        .await
    }

    /// Core fan-out: one concurrent task per snapshot source.
    ///
    /// All tasks are awaited to completion (success, failure, or timeout)
    /// unless the cancellation token fires first, in which case every task
    /// is dropped and the query returns `Cancelled` as a whole unit.
    async fn fan_out<T, F, Fut>(
        &self,
        snapshot: &Snapshot,
        opts: &QueryOptions,
        op: F,
    ) -> Result<QueryOutput<T>>
    where
        T: Send,
        F: Fn(Arc<dyn Source>) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T>> + Send,
    {
        let started = Instant::now();
        let timeout = opts.timeout.unwrap_or(self.per_source_timeout);
        let cancel = opts.cancel.clone().unwrap_or_default();

        let selected: Vec<&EnabledSource> = snapshot
            .iter()
            .filter(|s| opts.source.as_deref().is_none_or(|f| s.name() == f))
            .collect();

        if selected.is_empty() {
            return Ok(QueryOutput {
                outcomes: Vec::new(),
                elapsed: started.elapsed(),
            });
        }

        let op = &op;
        let tasks = selected.into_iter().map(|enabled| async move {
            let begun = Instant::now();
            let source = enabled.source().clone();
            let result = self.retry.run(timeout, || op(source.clone())).await;

            Outcome {
                source: enabled.name().to_string(),
                elapsed: begun.elapsed(),
                result,
            }
        });

        // join_all preserves the input (snapshot) order in its output, no
        // matter which task finishes first.
        let joined = future::join_all(tasks);

        let outcomes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            outcomes = joined => outcomes,
        };

        for outcome in &outcomes {
            match &outcome.result {
                Ok(_) => self.registry.mark_ok(&outcome.source),
                Err(e) => self.registry.mark_error(&outcome.source, &e.to_string()),
            }
        }

        Ok(QueryOutput {
            outcomes,
            elapsed: started.elapsed(),
        })
    }
}

//! Fluent search builder over the aggregation engine.
//!
//! [`SearchBuilder`] chains search parameters and merge options, then
//! executes with one of two strategies:
//!
//! - [`outcomes()`](SearchBuilder::outcomes) - the full per-source envelope,
//!   for callers that want diagnostics (which sources failed, how long each
//!   took)
//! - [`merged()`](SearchBuilder::merged) - one deduplicated, filtered,
//!   sorted, limited list, for callers that just want results
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use hakken::prelude::*;
//!
//! # async fn example() -> hakken::Result<()> {
//! # let registry = Arc::new(SourceRegistry::new());
//! # let engine = Aggregator::new(registry);
//! let results = engine
//!     .search("one piece")
//!     .limit(20)
//!     .sort_by(SortKey::Rating)
//!     .merged()
//!     .await?;
//!
//! let diagnostics = engine
//!     .search("one piece")
//!     .from_source("hianime")
//!     .outcomes()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{
    engine::{Aggregator, QueryOptions, QueryOutput},
    error::Result,
    merge::{self, MergeOptions},
    types::{SearchParams, SearchResult, SortKey},
};

/// A fluent builder for multi-source searches.
///
/// Created by [`Aggregator::search`]; holds a borrow of the engine and
/// accumulates [`SearchParams`], [`QueryOptions`], and [`MergeOptions`] as
/// methods are chained.
pub struct SearchBuilder<'a> {
    engine: &'a Aggregator,
    params: SearchParams,
    opts: QueryOptions,
}

impl<'a> SearchBuilder<'a> {
    pub(crate) fn new(engine: &'a Aggregator, query: impl Into<String>) -> Self {
        Self {
            engine,
            params: SearchParams {
                query: query.into(),
                ..Default::default()
            },
            opts: QueryOptions::default(),
        }
    }

    /// Caps the number of merged results.
    ///
    /// The cap applies after deduplication and sorting, so a noisy source
    /// cannot crowd out better results from the others. It does not limit
    /// what individual sources return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.params.limit = Some(limit);
        self
    }

    /// Sets the sort key for merged results.
    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.params.sort_by = Some(key);
        self
    }

    /// Drops merged results rated below `min` (unrated ones included).
    pub fn min_rating(mut self, min: f32) -> Self {
        self.params.min_rating = Some(min);
        self
    }

    /// Keeps only merged results from the given release year.
    pub fn year(mut self, year: u16) -> Self {
        self.params.year = Some(year);
        self
    }

    /// Narrows the search to a single named source.
    ///
    /// If the name is not in the enabled set, the query completes with an
    /// empty outcome set rather than an error.
    pub fn from_source(mut self, name: impl Into<String>) -> Self {
        self.params.source = Some(name.into());
        self
    }

    /// Overrides the per-source timeout for this search.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = Some(timeout);
        self
    }

    /// Attaches a cancellation token; triggering it aborts the whole search.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.opts.cancel = Some(token);
        self
    }

    /// Executes the search and returns the full per-source envelope.
    ///
    /// Every fanned-out source contributes exactly one outcome, failures
    /// included. Merge options (`limit`, `sort_by`, filters) are not
    /// applied; the payloads are the sources' raw results.
    pub async fn outcomes(self) -> Result<QueryOutput<Vec<SearchResult>>> {
        self.engine.search_all(self.params, &self.opts).await
    }

    /// Executes the search and returns one merged result list.
    ///
    /// Successful payloads are flattened in snapshot order, deduplicated by
    /// normalized title (lowest source priority value wins), filtered,
    /// stably sorted, and truncated, in that order. Failed sources simply
    /// contribute nothing.
    pub async fn merged(self) -> Result<Vec<SearchResult>> {
        // One snapshot serves both the fan-out and the priority table, so a
        // concurrent priority change cannot skew the tie-break.
        let snapshot = self.engine.registry().snapshot();
        let merge_opts = MergeOptions {
            sort: self.params.sort_by,
            limit: self.params.limit,
            min_rating: self.params.min_rating,
            year: self.params.year,
        };

        let output = self
            .engine
            .search_snapshot(&snapshot, self.params, &self.opts)
            .await?;

        let flattened: Vec<SearchResult> = output
            .into_payloads()
            .into_iter()
            .flatten()
            .collect();

        Ok(merge::merge(flattened, &snapshot.priorities(), &merge_opts))
    }

    /// Returns the accumulated search parameters without executing.
    pub fn build(self) -> SearchParams {
        self.params
    }
}

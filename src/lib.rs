//! # Hakken - Unified anime source aggregation library
//!
//! Hakken discovers anime titles, episodes, and download links across a
//! configurable set of independent content sources, each with its own site
//! layout, behind one capability interface. A single logical operation
//! (search, episode listing, link resolution) fans out to every enabled
//! source concurrently; per-source failures are isolated into data instead
//! of errors, and the combined results are merged, deduplicated, and
//! ordered deterministically.
//!
//! ## Features
//!
//! - **One trait, many sites**: every source implements the [`Source`]
//!   capability contract; HTML scrapers and JSON APIs look the same to
//!   callers
//! - **Concurrent fan-out**: one task per enabled source, joined as a unit;
//!   a broken or slow source never blocks the others
//! - **Partial failure as data**: every source contributes exactly one
//!   [`Outcome`](engine::Outcome), success or classified failure, so
//!   callers can render "3 of 4 sources answered"
//! - **Deterministic merging**: duplicates collapse by normalized title
//!   with priority tie-breaks; sorting is stable; limits apply last
//! - **Snapshot isolation**: registry mutations never race in-flight
//!   queries; each query works against the enabled set captured at its
//!   start
//! - **Bounded retries**: transient failures back off exponentially under a
//!   hard per-source deadline; permanent failures fail fast
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use hakken::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> hakken::Result<()> {
//!     // Wire up the registry: built-in factories + configuration entries.
//!     let registry = Arc::new(SourceRegistry::new());
//!     hakken::sources::register_builtin(&registry);
//!     registry.load(vec![
//!         SourceEntry::new("sample").with_priority(1),
//!     ]);
//!
//!     // Fan a search out to every enabled source and merge the results.
//!     let engine = Aggregator::new(registry);
//!     let results = engine
//!         .search("one piece")
//!         .limit(20)
//!         .sort_by(SortKey::Rating)
//!         .merged()
//!         .await?;
//!
//!     println!("{} unique titles", results.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Per-source diagnostics
//!
//! ```rust
//! # use std::sync::Arc;
//! # use hakken::prelude::*;
//! # async fn example() -> hakken::Result<()> {
//! # let registry = Arc::new(SourceRegistry::new());
//! # let engine = Aggregator::new(registry);
//! let output = engine.search("naruto").outcomes().await?;
//!
//! for outcome in &output.outcomes {
//!     match &outcome.result {
//!         Ok(results) => println!("{}: {} results in {:?}",
//!             outcome.source, results.len(), outcome.elapsed),
//!         Err(e) => println!("{}: {}", outcome.source, e),
//!     }
//! }
//!
//! // Empty, partial, and total failure are three distinct states.
//! if output.is_partial() {
//!     println!("sources down: {:?}", output.failed());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized leaf-first:
//!
//! - [`types`]: core data structures for titles, episodes, and qualities
//! - [`error`]: error taxonomy and transient/permanent classification
//! - [`source`]: the capability contract every adapter satisfies
//! - [`registry`]: factories, configuration, and snapshot management
//! - [`retry`]: bounded retry with exponential backoff under a deadline
//! - [`engine`]: concurrent fan-out and per-source outcome collection
//! - [`merge`]: pure dedup/sort/limit over aggregated results
//! - [`search`]: fluent builder tying the engine and merger together
//! - [`net`]: HTTP client, rate limiting, HTML/JSON parsing helpers
//! - [`download`]: resumable transfers reusing the failure classification
//! - [`sources`]: built-in adapters (sample, hianime, animetsu)

pub mod download;
pub mod engine;
pub mod error;
pub mod merge;
pub mod net;
pub mod registry;
pub mod retry;
pub mod search;
pub mod source;
pub mod sources;
pub mod types;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use hakken::prelude::*;
///
/// // Now you have access to:
/// // - Source, SourceRegistry, SourceEntry, Snapshot
/// // - Aggregator, QueryOptions, QueryOutput, Outcome
/// // - SearchBuilder, RetryPolicy, MergeOptions
/// // - SearchResult, Episode, Quality, SearchParams, SortKey
/// ```
pub mod prelude {
    pub use crate::{
        engine::{Aggregator, Outcome, QueryOptions, QueryOutput},
        error::{Error, FailureKind, Result},
        merge::MergeOptions,
        registry::{
            ConfigMap, HealthReport, Snapshot, SourceDescriptor, SourceEntry, SourceRegistry,
        },
        retry::RetryPolicy,
        search::SearchBuilder,
        source::Source,
        types::{Episode, Quality, SearchParams, SearchResult, SortKey},
    };
}

// Re-export main types at crate root for direct access
pub use engine::{Aggregator, Outcome, QueryOptions, QueryOutput};
pub use error::{Error, FailureKind, Result};
pub use merge::MergeOptions;
pub use registry::{ConfigMap, SourceEntry, SourceRegistry};
pub use retry::RetryPolicy;
pub use search::SearchBuilder;
pub use source::Source;
pub use types::{Episode, Quality, SearchParams, SearchResult, SortKey};

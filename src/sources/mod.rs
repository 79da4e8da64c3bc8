//! Anime source implementations with conditional compilation support.
//!
//! Each network-backed source sits behind its own feature flag so builds
//! can include only the adapters they need:
//!
//! - `source-hianime` - HTML-scraping adapter for hianime.to
//! - `source-animetsu` - JSON API adapter for animetsu.to
//! - `all-sources` - every adapter (default)
//!
//! The offline [`SampleSource`] is always available.
//!
//! ```bash
//! cargo build --no-default-features --features source-hianime
//! ```
//!
//! # Registration
//!
//! Sources reach the engine through factories on the
//! [`SourceRegistry`](crate::registry::SourceRegistry); [`register_builtin`]
//! installs a factory for every compiled-in adapter, keyed by source name.
//! Factories validate their configuration and surface failures as
//! registration errors rather than panics.

use std::sync::Arc;

use crate::registry::SourceRegistry;
use crate::source::Source;

// Always include the offline sample catalog
pub mod sample;

// Individual sources behind feature flags
#[cfg(feature = "source-hianime")]
pub mod hianime;

#[cfg(feature = "source-animetsu")]
pub mod animetsu;

pub use sample::SampleSource;

#[cfg(feature = "source-hianime")]
pub use hianime::HiAnimeSource;

#[cfg(feature = "source-animetsu")]
pub use animetsu::AnimetsuSource;

/// Registers a factory for every compiled-in source.
///
/// # Examples
///
/// ```rust
/// use hakken::prelude::*;
///
/// let registry = SourceRegistry::new();
/// hakken::sources::register_builtin(&registry);
/// registry.load(vec![
///     SourceEntry::new("sample").with_priority(1),
/// ]);
/// assert_eq!(registry.snapshot().names(), vec!["sample"]);
/// ```
pub fn register_builtin(registry: &SourceRegistry) {
    registry.register("sample", |config| {
        Ok(Arc::new(SampleSource::from_config(config)) as Arc<dyn Source>)
    });

    #[cfg(feature = "source-hianime")]
    registry.register("hianime", |config| {
        HiAnimeSource::from_config(config).map(|source| Arc::new(source) as Arc<dyn Source>)
    });

    #[cfg(feature = "source-animetsu")]
    registry.register("animetsu", |config| {
        AnimetsuSource::from_config(config).map(|source| Arc::new(source) as Arc<dyn Source>)
    });
}

//! Core data types for anime titles, episodes, qualities, and search parameters.
//!
//! This module defines the fundamental data structures used throughout Hakken:
//!
//! - [`SearchResult`] - One discovered anime title with metadata
//! - [`Episode`] - A single episode with its available quality tiers
//! - [`Quality`] - Symbolic resolution tier, ordered by pixel height
//! - [`SearchParams`] - Parameters for searching across sources
//! - [`SortKey`] - Sorting options applied by the result merger
//!
//! # Examples
//!
//! ```rust
//! use hakken::types::*;
//!
//! let result = SearchResult {
//!     title: "Cowboy Bebop".to_string(),
//!     url: "https://example.com/anime/cowboy-bebop".to_string(),
//!     source: "sample".to_string(),
//!     episode_count: Some(26),
//!     description: Some("Jazz, bounties, and a corgi".to_string()),
//!     thumbnail: None,
//!     year: Some(1998),
//!     genres: vec!["Action".to_string(), "Sci-Fi".to_string()],
//!     rating: Some(8.9),
//! };
//!
//! assert_eq!(result.title, "Cowboy Bebop");
//! ```

use chrono::NaiveDate;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Video quality tiers for anime episodes.
///
/// A quality is a symbolic resolution tag with a numeric height used purely
/// for ordering and comparison; it is not a stream URL. Resolving a tier to
/// a fetchable URL is a separate, on-demand operation
/// ([`Source::resolve`](crate::source::Source::resolve)), so a listing of N
/// episodes never eagerly resolves N×M variants.
///
/// Variants are declared in ascending height order, so the derived `Ord`
/// ranks tiers by resolution:
///
/// ```rust
/// use hakken::types::Quality;
///
/// assert!(Quality::Q1080 > Quality::Q720);
/// assert_eq!(Quality::Q720.height(), 720);
/// assert_eq!(Quality::from_height(900), Quality::Q1080);
/// assert_eq!(Quality::Q480.to_string(), "480p");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "480p")]
    Q480,
    #[serde(rename = "720p")]
    Q720,
    #[serde(rename = "1080p")]
    Q1080,
    #[serde(rename = "1440p")]
    Q1440,
    #[serde(rename = "2160p")]
    Q2160,
}

impl Quality {
    /// All tiers, lowest to highest.
    pub const ALL: [Quality; 5] = [
        Quality::Q480,
        Quality::Q720,
        Quality::Q1080,
        Quality::Q1440,
        Quality::Q2160,
    ];

    /// Returns the height in pixels for this tier.
    pub fn height(self) -> u32 {
        match self {
            Quality::Q480 => 480,
            Quality::Q720 => 720,
            Quality::Q1080 => 1080,
            Quality::Q1440 => 1440,
            Quality::Q2160 => 2160,
        }
    }

    /// Maps a pixel height to the nearest tier at or above it.
    ///
    /// Heights beyond 1440 map to [`Quality::Q2160`].
    pub fn from_height(height: u32) -> Quality {
        match height {
            0..=480 => Quality::Q480,
            481..=720 => Quality::Q720,
            721..=1080 => Quality::Q1080,
            1081..=1440 => Quality::Q1440,
            _ => Quality::Q2160,
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}p", self.height())
    }
}

impl std::str::FromStr for Quality {
    type Err = crate::Error;

    /// Parses strings like `"1080p"` or `"1080"`.
    fn from_str(s: &str) -> crate::Result<Self> {
        let digits = s.trim().trim_end_matches(['p', 'P']);
        let height: u32 = digits
            .parse()
            .map_err(|_| crate::Error::parse(format!("invalid quality: {}", s)))?;
        Ok(Quality::from_height(height))
    }
}

/// One discovered anime title from a source.
///
/// The `url` is the canonical source-specific page for the title and is
/// opaque to the aggregation engine; only the owning adapter can interpret
/// it. The `(title, source)` pair is not globally unique: duplicates across
/// sources are expected and resolved by the
/// [result merger](crate::merge), never by the adapter.
///
/// The engine overwrites `source` with the adapter's registered name when
/// collecting outcomes, so adapters do not need to fill it carefully.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Display title
    pub title: String,

    /// Canonical URL of the title page on the owning source
    pub url: String,

    /// Name of the source this result came from
    pub source: String,

    /// Total episode count, when the source reports it
    pub episode_count: Option<u32>,

    /// Synopsis/summary
    pub description: Option<String>,

    /// Thumbnail image URL
    pub thumbnail: Option<String>,

    /// Release year
    pub year: Option<u16>,

    /// Genre tags
    #[serde(default)]
    pub genres: Vec<String>,

    /// User rating on a 0.0–10.0 scale
    pub rating: Option<f32>,
}

/// A single episode of an anime title.
///
/// Episode numbers are adapter-supplied and unique within one title+source,
/// but not guaranteed contiguous: recap specials and region-split cours
/// leave holes, so nothing in the engine assumes density.
///
/// # Examples
///
/// ```rust
/// use hakken::types::{Episode, Quality};
///
/// let episode = Episode {
///     number: 5,
///     title: "Ballad of Fallen Angels".to_string(),
///     url: "https://example.com/watch/cowboy-bebop?ep=5".to_string(),
///     source: "sample".to_string(),
///     qualities: vec![Quality::Q480, Quality::Q1080],
///     duration: Some("24:09".to_string()),
///     thumbnail: None,
///     air_date: None,
///     filler: false,
/// };
///
/// assert_eq!(episode.best_quality(), Some(Quality::Q1080));
/// assert_eq!(episode.duration_seconds(), Some(1449));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// Episode number (positive, unique within one title+source)
    pub number: u32,

    /// Episode title
    pub title: String,

    /// URL of the episode page on the owning source
    pub url: String,

    /// Name of the source this episode came from
    pub source: String,

    /// Quality tiers available for this episode
    #[serde(default)]
    pub qualities: Vec<Quality>,

    /// Duration in `MM:SS` or `HH:MM:SS` format
    pub duration: Option<String>,

    /// Episode thumbnail URL
    pub thumbnail: Option<String>,

    /// Original air date
    pub air_date: Option<NaiveDate>,

    /// Whether the episode is filler rather than canon
    #[serde(default)]
    pub filler: bool,
}

impl Episode {
    /// Returns the highest available quality tier, if any are listed.
    pub fn best_quality(&self) -> Option<Quality> {
        self.qualities.iter().copied().max()
    }

    /// Returns `true` if the given quality tier is available.
    pub fn has_quality(&self, quality: Quality) -> bool {
        self.qualities.contains(&quality)
    }

    /// Converts the `duration` field to total seconds.
    ///
    /// Accepts `MM:SS` and `HH:MM:SS`; returns `None` when the field is
    /// missing or malformed.
    pub fn duration_seconds(&self) -> Option<u32> {
        let duration = self.duration.as_deref()?;
        let parts: Vec<u32> = duration
            .split(':')
            .map(|p| p.parse().ok())
            .collect::<Option<Vec<_>>>()?;

        match parts.as_slice() {
            [minutes, seconds] => Some(minutes * 60 + seconds),
            [hours, minutes, seconds] => Some(hours * 3600 + minutes * 60 + seconds),
            _ => None,
        }
    }
}

/// Search parameters for querying anime across sources.
///
/// Uses the builder pattern (via `derive_builder`) for fluent construction:
///
/// ```rust
/// use hakken::types::{SearchParamsBuilder, SortKey};
///
/// let params = SearchParamsBuilder::default()
///     .query("one piece".to_string())
///     .limit(Some(20))
///     .sort_by(Some(SortKey::Rating))
///     .build()
///     .unwrap();
///
/// assert_eq!(params.query, "one piece");
/// ```
///
/// `limit`, `sort_by`, `min_rating`, and `year` are applied by the
/// [result merger](crate::merge) after aggregation; `source` narrows the
/// query to a single named source before fan-out.
#[derive(Debug, Clone, Default, Builder)]
#[builder(setter(into))]
pub struct SearchParams {
    pub query: String,
    #[builder(default)]
    pub limit: Option<usize>,
    #[builder(default)]
    pub source: Option<String>,
    #[builder(default)]
    pub sort_by: Option<SortKey>,
    #[builder(default)]
    pub min_rating: Option<f32>,
    #[builder(default)]
    pub year: Option<u16>,
}

impl From<String> for SearchParams {
    fn from(query: String) -> Self {
        SearchParams {
            query,
            ..Default::default()
        }
    }
}

impl From<&str> for SearchParams {
    /// Creates search parameters with just a query and defaults elsewhere.
    ///
    /// ```rust
    /// use hakken::types::SearchParams;
    ///
    /// let params: SearchParams = "trigun".into();
    /// assert_eq!(params.query, "trigun");
    /// assert!(params.limit.is_none());
    /// ```
    fn from(query: &str) -> Self {
        SearchParams {
            query: query.to_string(),
            ..Default::default()
        }
    }
}

/// Sort keys for merged search results.
///
/// Sorting is stable, so results with equal keys keep the relative order
/// the deduplication pass left them in.
///
/// # Variants
///
/// * `Title` - Lexicographic, case-insensitive
/// * `Year` - Newest first; titles without a year sort last
/// * `Rating` - Highest first; titles without a rating sort last
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Title,
    Year,
    Rating,
}

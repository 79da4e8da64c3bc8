//! Offline sample source with a fixed catalog.
//!
//! Useful for tests, documentation examples, and trying out the aggregation
//! pipeline without touching the network. The catalog is small and static;
//! searching matches case-insensitively against titles, and episode listings
//! are generated deterministically per title.

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    error::{Error, Result},
    registry::ConfigMap,
    source::Source,
    types::{Episode, Quality, SearchParams, SearchResult},
};

const QUALITIES: [Quality; 3] = [Quality::Q480, Quality::Q720, Quality::Q1080];

struct CatalogEntry {
    title: &'static str,
    slug: &'static str,
    episodes: u32,
    description: &'static str,
    year: u16,
    genres: &'static [&'static str],
    rating: f32,
}

const CATALOG: [CatalogEntry; 5] = [
    CatalogEntry {
        title: "Attack on Titan",
        slug: "attack-on-titan",
        episodes: 25,
        description: "Humanity fights for survival against giant titans",
        year: 2013,
        genres: &["Action", "Drama", "Fantasy"],
        rating: 9.0,
    },
    CatalogEntry {
        title: "One Piece",
        slug: "one-piece",
        episodes: 50,
        description: "A young pirate's adventure to find the legendary treasure",
        year: 1999,
        genres: &["Adventure", "Comedy", "Shounen"],
        rating: 8.8,
    },
    CatalogEntry {
        title: "Demon Slayer",
        slug: "demon-slayer",
        episodes: 26,
        description: "A young boy becomes a demon slayer to save his sister",
        year: 2019,
        genres: &["Action", "Supernatural", "Historical"],
        rating: 8.7,
    },
    CatalogEntry {
        title: "My Hero Academia",
        slug: "my-hero-academia",
        episodes: 25,
        description: "In a world of superheroes, a quirkless boy dreams of becoming one",
        year: 2016,
        genres: &["Action", "School", "Superhero"],
        rating: 8.5,
    },
    CatalogEntry {
        title: "Naruto",
        slug: "naruto",
        episodes: 30,
        description: "A young ninja's journey to become the strongest in his village",
        year: 2002,
        genres: &["Action", "Martial Arts", "Shounen"],
        rating: 8.3,
    },
];

/// A source backed by an in-memory catalog instead of a website.
///
/// Configuration keys:
///
/// * `latency_ms` (number) - artificial delay before every operation, for
///   exercising timeouts and progress display
///
/// # Examples
///
/// ```rust
/// use hakken::prelude::*;
/// use hakken::sources::SampleSource;
///
/// # async fn example() -> hakken::Result<()> {
/// let source = SampleSource::new();
/// let results = source.search("titan".into()).await?;
/// assert_eq!(results[0].title, "Attack on Titan");
/// # Ok(())
/// # }
/// ```
pub struct SampleSource {
    latency: Duration,
}

impl SampleSource {
    /// Creates a sample source with no artificial latency.
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
        }
    }

    /// Creates a sample source from a registry config map.
    pub fn from_config(config: &ConfigMap) -> Self {
        let latency_ms = config
            .get("latency_ms")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        Self {
            latency: Duration::from_millis(latency_ms),
        }
    }

    fn title_url(&self, slug: &str) -> String {
        format!("{}/anime/{}", self.base_url(), slug)
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for SampleSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for SampleSource {
    fn name(&self) -> &str {
        "sample"
    }

    fn base_url(&self) -> &str {
        "https://sample.example"
    }

    async fn search(&self, params: SearchParams) -> Result<Vec<SearchResult>> {
        self.simulate_latency().await;

        let needle = params.query.to_lowercase();
        let results = CATALOG
            .iter()
            .filter(|entry| entry.title.to_lowercase().contains(&needle))
            .map(|entry| SearchResult {
                title: entry.title.to_string(),
                url: self.title_url(entry.slug),
                source: self.name().to_string(),
                episode_count: Some(entry.episodes),
                description: Some(entry.description.to_string()),
                thumbnail: None,
                year: Some(entry.year),
                genres: entry.genres.iter().map(|g| g.to_string()).collect(),
                rating: Some(entry.rating),
            })
            .collect();

        Ok(results)
    }

    async fn episodes(&self, title_url: &str) -> Result<Vec<Episode>> {
        self.simulate_latency().await;

        let slug = title_url
            .strip_prefix(&self.title_url(""))
            .unwrap_or_default();
        let entry = CATALOG
            .iter()
            .find(|entry| entry.slug == slug)
            .ok_or_else(|| {
                Error::permanent(self.name(), format!("unrecognized title URL: {}", title_url))
            })?;

        let episodes = (1..=entry.episodes)
            .map(|number| Episode {
                number,
                title: format!("{} - Episode {}", entry.title, number),
                url: format!("{}/watch/{}?ep={}", self.base_url(), entry.slug, number),
                source: self.name().to_string(),
                qualities: QUALITIES.to_vec(),
                duration: Some("24:00".to_string()),
                thumbnail: None,
                air_date: None,
                filler: number % 13 == 0,
            })
            .collect();

        Ok(episodes)
    }

    async fn resolve(&self, episode: &Episode, quality: Quality) -> Result<String> {
        self.simulate_latency().await;

        if !episode.has_quality(quality) {
            return Err(Error::QualityUnavailable {
                quality,
                episode: episode.number,
            });
        }

        Ok(format!("{}&quality={}", episode.url, quality))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

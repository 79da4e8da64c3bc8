//! Common test utilities
//!
//! Mock sources and registry fixtures shared across the test modules.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use hakken::prelude::*;

/// A scriptable in-memory source for exercising the aggregation pipeline.
///
/// Behavior knobs: canned search results and episodes, an artificial delay,
/// a fixed failure kind, or a number of transient failures to throw before
/// succeeding. Every `search` invocation is counted so retry behavior can
/// be asserted.
pub struct MockSource {
    name: String,
    delay: Duration,
    results: Vec<SearchResult>,
    episodes: Vec<Episode>,
    fail: Option<FailureKind>,
    flaky_failures: u32,
    calls: AtomicU32,
    healthy: bool,
}

#[allow(dead_code)]
impl MockSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            delay: Duration::ZERO,
            results: Vec::new(),
            episodes: Vec::new(),
            fail: None,
            flaky_failures: 0,
            calls: AtomicU32::new(0),
            healthy: true,
        }
    }

    /// Returns canned results with the given titles.
    pub fn with_titles(mut self, titles: &[&str]) -> Self {
        self.results = titles.iter().map(|t| result(t, &self.name)).collect();
        self
    }

    pub fn with_results(mut self, results: Vec<SearchResult>) -> Self {
        self.results = results;
        self
    }

    pub fn with_episodes(mut self, episodes: Vec<Episode>) -> Self {
        self.episodes = episodes;
        self
    }

    /// Sleeps this long before answering any operation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fails every operation with the given classification.
    pub fn failing(mut self, kind: FailureKind) -> Self {
        self.fail = Some(kind);
        self
    }

    /// Fails transiently this many times, then succeeds.
    pub fn flaky(mut self, failures: u32) -> Self {
        self.flaky_failures = failures;
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Number of `search` invocations so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self, attempt: u32) -> Result<()> {
        match self.fail {
            Some(FailureKind::Transient) => Err(Error::transient(&self.name, "mock transient")),
            Some(FailureKind::Permanent) => Err(Error::permanent(&self.name, "mock permanent")),
            None if attempt < self.flaky_failures => {
                Err(Error::transient(&self.name, "mock flake"))
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Source for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn base_url(&self) -> &str {
        "https://mock.example"
    }

    async fn search(&self, _params: SearchParams) -> Result<Vec<SearchResult>> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.check_failure(attempt)?;
        Ok(self.results.clone())
    }

    async fn episodes(&self, _title_url: &str) -> Result<Vec<Episode>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.check_failure(u32::MAX)?;
        Ok(self.episodes.clone())
    }

    async fn resolve(&self, episode: &Episode, quality: Quality) -> Result<String> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.check_failure(u32::MAX)?;
        if !episode.has_quality(quality) {
            return Err(Error::QualityUnavailable {
                quality,
                episode: episode.number,
            });
        }
        Ok(format!("{}&quality={}", episode.url, quality))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }
}

/// Builds a search result owned by `source`.
#[allow(dead_code)]
pub fn result(title: &str, source: &str) -> SearchResult {
    SearchResult {
        title: title.to_string(),
        url: format!(
            "https://{}.example/anime/{}",
            source,
            title.to_lowercase().replace(' ', "-")
        ),
        source: source.to_string(),
        episode_count: None,
        description: None,
        thumbnail: None,
        year: None,
        genres: vec![],
        rating: None,
    }
}

/// Builds an episode owned by `source`.
#[allow(dead_code)]
pub fn episode(number: u32, source: &str) -> Episode {
    Episode {
        number,
        title: format!("Episode {}", number),
        url: format!("https://{}.example/watch/show?ep={}", source, number),
        source: source.to_string(),
        qualities: vec![Quality::Q480, Quality::Q720, Quality::Q1080],
        duration: Some("24:00".to_string()),
        thumbnail: None,
        air_date: None,
        filler: false,
    }
}

/// Builds a registry from `(mock, priority)` pairs, all enabled.
///
/// Each factory hands out the same shared instance, so per-mock state
/// (call counters) survives reloads and is observable from the test.
#[allow(dead_code)]
pub fn registry_with(mocks: Vec<(MockSource, u32)>) -> (Arc<SourceRegistry>, Vec<Arc<MockSource>>) {
    let registry = SourceRegistry::new();
    let mut entries = Vec::new();
    let mut shared = Vec::new();

    for (mock, priority) in mocks {
        let name = mock.name().to_string();
        let instance = Arc::new(mock);
        shared.push(instance.clone());

        let for_factory = instance.clone();
        registry.register(name.clone(), move |_| {
            Ok(for_factory.clone() as Arc<dyn Source>)
        });
        entries.push(SourceEntry::new(name).with_priority(priority));
    }

    registry.load(entries);
    (Arc::new(registry), shared)
}

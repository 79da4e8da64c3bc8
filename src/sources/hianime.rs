//! HiAnime source: CSS-selector scraping over the hianime.to layout.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::{
    error::{Error, Result},
    net::{self, HttpClient, html},
    registry::ConfigMap,
    source::Source,
    types::{Episode, Quality, SearchParams, SearchResult},
};

const DEFAULT_BASE_URL: &str = "https://hianime.to";

/// Qualities the site serves for every episode; the concrete stream for a
/// tier is only known after resolving.
const SUPPORTED_QUALITIES: [Quality; 3] = [Quality::Q480, Quality::Q720, Quality::Q1080];

static ANIME_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"anime_id["']?\s*[:=]\s*["']?(\d+)["']?"#).unwrap());
static FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").unwrap());

/// Source adapter for hianime.to.
///
/// Configuration keys:
///
/// * `base_url` (string) - mirror domain override; must be a valid URL
/// * `rate_limit_ms` (number) - minimum delay between requests
pub struct HiAnimeSource {
    base_url: String,
    client: HttpClient,
}

impl HiAnimeSource {
    /// Creates the adapter against the default domain.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, 1000)
    }

    /// Creates the adapter from a registry config map.
    ///
    /// Fails with a registration error when `base_url` does not parse as a
    /// URL; the registry excludes the source and keeps going.
    pub fn from_config(config: &ConfigMap) -> Result<Self> {
        let base_url = match config.get("base_url").and_then(|v| v.as_str()) {
            Some(raw) => {
                let parsed = Url::parse(raw)
                    .map_err(|e| Error::registration("hianime", format!("invalid base_url: {}", e)))?;
                parsed.as_str().trim_end_matches('/').to_string()
            }
            None => DEFAULT_BASE_URL.to_string(),
        };

        let rate_limit = config
            .get("rate_limit_ms")
            .and_then(|v| v.as_u64())
            .unwrap_or(1000);

        Ok(Self::with_base_url(&base_url, rate_limit))
    }

    fn with_base_url(base_url: &str, rate_limit_ms: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: HttpClient::new("hianime").with_rate_limit(rate_limit_ms),
        }
    }

    fn full_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// Pulls the numeric anime id out of a title page.
    ///
    /// The id shows up either in an inline script or as a `data-id`
    /// attribute on the watch container.
    fn extract_anime_id(&self, page: &str) -> Option<String> {
        if let Some(captures) = ANIME_ID.captures(page) {
            return Some(captures[1].to_string());
        }

        let document = html::parse(page);
        html::select_attr(&document, "#wrapper[data-id], .anis-watch[data-id]", "data-id")
    }
}

impl Default for HiAnimeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for HiAnimeSource {
    fn name(&self) -> &str {
        "hianime"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn search(&self, params: SearchParams) -> Result<Vec<SearchResult>> {
        let url = format!(
            "{}/search?keyword={}",
            self.base_url,
            urlencoding::encode(&params.query)
        );

        let page = self.client.get_text(&url).await?;
        let document = html::parse(&page);

        let results = html::parse_items(&document, ".flw-item", |item| {
            let fragment = html::parse(&item.html());
            let title = html::select_text(&fragment, ".film-name a")?;
            let href = html::select_attr(&fragment, ".film-name a", "href")?;
            if title.is_empty() || href.is_empty() {
                return None;
            }

            let episode_count = html::select_text(&fragment, ".tick-item.tick-eps")
                .and_then(|text| FIRST_NUMBER.captures(text.as_str()).map(|c| c[1].to_string()))
                .and_then(|digits| digits.parse().ok());

            let thumbnail = html::select_attr(&fragment, "img.film-poster-img", "data-src")
                .map(|src| self.full_url(&src));

            Some(SearchResult {
                title,
                url: self.full_url(&href),
                source: self.name().to_string(),
                episode_count,
                description: None,
                thumbnail,
                year: None,
                genres: vec![],
                rating: None,
            })
        });

        Ok(results)
    }

    async fn episodes(&self, title_url: &str) -> Result<Vec<Episode>> {
        if !title_url.starts_with(&self.base_url) {
            return Err(Error::permanent(
                self.name(),
                format!("unrecognized title URL: {}", title_url),
            ));
        }

        let page = self.client.get_text(title_url).await?;
        let anime_id = self
            .extract_anime_id(&page)
            .ok_or_else(|| Error::parse("could not extract anime id from title page"))?;

        let ajax_url = format!("{}/ajax/v2/episode/list/{}", self.base_url, anime_id);
        let response: serde_json::Value = self.client.get_json(&ajax_url).await?;

        let episodes_html = net::json::extract_str(&response, "html")
            .ok_or_else(|| Error::parse("episode list response carried no html"))?;

        let document = html::parse(&episodes_html);
        let episodes = html::parse_items(&document, "a.ssl-item.ep-item", |item| {
            let fragment = html::parse(&item.html());
            let anchor = "a.ssl-item.ep-item";
            let number: u32 = html::select_attr(&fragment, anchor, "data-number")?
                .trim()
                .parse()
                .ok()?;
            let title = html::select_attr(&fragment, anchor, "title")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| format!("Episode {}", number));
            let href = html::select_attr(&fragment, anchor, "href")?;

            Some(Episode {
                number,
                title,
                url: self.full_url(&href),
                source: self.name().to_string(),
                qualities: SUPPORTED_QUALITIES.to_vec(),
                duration: None,
                thumbnail: None,
                air_date: None,
                filler: false,
            })
        });

        Ok(episodes)
    }

    async fn resolve(&self, episode: &Episode, quality: Quality) -> Result<String> {
        if !episode.has_quality(quality) {
            return Err(Error::QualityUnavailable {
                quality,
                episode: episode.number,
            });
        }

        let episode_id = episode
            .url
            .split("ep=")
            .nth(1)
            .map(|id| id.split('&').next().unwrap_or(id))
            .ok_or_else(|| {
                Error::permanent(self.name(), format!("no episode id in URL: {}", episode.url))
            })?;

        let sources_url = format!("{}/ajax/v2/episode/sources?id={}", self.base_url, episode_id);
        let response: serde_json::Value = self.client.get_json(&sources_url).await?;

        for entry in net::json::extract_array(&response, "sources") {
            let Some(file) = entry.get("file").and_then(|v| v.as_str()) else {
                continue;
            };
            let matches = entry
                .get("quality")
                .and_then(|v| v.as_str())
                .and_then(|label| label.parse::<Quality>().ok())
                .is_some_and(|tier| tier == quality);

            if matches {
                return Ok(file.to_string());
            }
        }

        Err(Error::QualityUnavailable {
            quality,
            episode: episode.number,
        })
    }
}

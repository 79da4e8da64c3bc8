//! Animetsu source: typed JSON API client for backend.animetsu.to.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use url::Url;

use crate::{
    error::{Error, Result},
    net::HttpClient,
    registry::ConfigMap,
    source::Source,
    types::{Episode, Quality, SearchParams, SearchResult},
};

const DEFAULT_API_URL: &str = "https://backend.animetsu.to/api";
const DEFAULT_SITE_URL: &str = "https://animetsu.to";

/// Search response envelope; the backend has shipped both `results` and
/// `data` as the list key.
#[derive(Debug, Deserialize)]
struct AnimetsuSearchResponse {
    #[serde(default, alias = "data")]
    results: Vec<AnimetsuAnime>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct AnimetsuAnime {
    id: serde_json::Value,
    title: Option<AnimetsuTitle>,
    #[serde(alias = "totalEpisodes")]
    episodes: Option<u32>,
    description: Option<String>,
    #[serde(default)]
    genres: Vec<AnimetsuGenre>,
    #[serde(alias = "averageScore")]
    average_score: Option<f32>,
    #[serde(alias = "coverImage")]
    cover_image: Option<AnimetsuCover>,
    #[serde(alias = "releaseDate")]
    release_date: Option<u16>,
    #[serde(alias = "startDate")]
    start_date: Option<AnimetsuDate>,
    status: Option<String>,
}

/// Titles arrive either as a plain string or split by script.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnimetsuTitle {
    Text(String),
    Parts {
        english: Option<String>,
        romaji: Option<String>,
        native: Option<String>,
    },
}

impl AnimetsuTitle {
    fn preferred(&self) -> Option<String> {
        match self {
            AnimetsuTitle::Text(text) => Some(text.clone()),
            AnimetsuTitle::Parts {
                english,
                romaji,
                native,
            } => english
                .clone()
                .or_else(|| romaji.clone())
                .or_else(|| native.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnimetsuGenre {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnimetsuCover {
    Url(String),
    Sizes {
        large: Option<String>,
        medium: Option<String>,
        small: Option<String>,
    },
}

impl AnimetsuCover {
    fn preferred(&self) -> Option<String> {
        match self {
            AnimetsuCover::Url(url) => Some(url.clone()),
            AnimetsuCover::Sizes {
                large,
                medium,
                small,
            } => large
                .clone()
                .or_else(|| medium.clone())
                .or_else(|| small.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnimetsuDate {
    year: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct AnimetsuEpisode {
    #[serde(alias = "episode", alias = "episodeNumber")]
    number: Option<serde_json::Value>,
    #[serde(alias = "name")]
    title: Option<String>,
    duration: Option<serde_json::Value>,
    #[serde(alias = "airDate", alias = "airedAt")]
    air_date: Option<String>,
    #[serde(default, alias = "isFiller")]
    filler: bool,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnimetsuStreamResponse {
    #[serde(default)]
    sources: Vec<AnimetsuStream>,
}

#[derive(Debug, Deserialize)]
struct AnimetsuStream {
    url: String,
    quality: Option<String>,
}

/// Source adapter for the Animetsu JSON backend.
///
/// Configuration keys:
///
/// * `api_url` (string) - backend override; must be a valid URL
/// * `site_url` (string) - site override, used for title/episode page URLs
/// * `rate_limit_ms` (number) - minimum delay between requests
/// * `server` (string) - stream server to resolve against (default `pahe`)
/// * `sub_type` (string) - `sub` or `dub` (default `sub`)
pub struct AnimetsuSource {
    api_url: String,
    site_url: String,
    server: String,
    sub_type: String,
    client: HttpClient,
}

impl AnimetsuSource {
    /// Creates the adapter against the default backend.
    pub fn new() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            server: "pahe".to_string(),
            sub_type: "sub".to_string(),
            client: Self::build_client(DEFAULT_SITE_URL, 1000),
        }
    }

    /// Creates the adapter from a registry config map.
    pub fn from_config(config: &ConfigMap) -> Result<Self> {
        let api_url = Self::url_from_config(config, "api_url", DEFAULT_API_URL)?;
        let site_url = Self::url_from_config(config, "site_url", DEFAULT_SITE_URL)?;
        let rate_limit = config
            .get("rate_limit_ms")
            .and_then(|v| v.as_u64())
            .unwrap_or(1000);
        let server = config
            .get("server")
            .and_then(|v| v.as_str())
            .unwrap_or("pahe")
            .to_string();
        let sub_type = config
            .get("sub_type")
            .and_then(|v| v.as_str())
            .unwrap_or("sub")
            .to_string();

        Ok(Self {
            client: Self::build_client(&site_url, rate_limit),
            api_url,
            site_url,
            server,
            sub_type,
        })
    }

    fn url_from_config(config: &ConfigMap, key: &str, default: &str) -> Result<String> {
        match config.get(key).and_then(|v| v.as_str()) {
            Some(raw) => {
                let parsed = Url::parse(raw).map_err(|e| {
                    Error::registration("animetsu", format!("invalid {}: {}", key, e))
                })?;
                Ok(parsed.as_str().trim_end_matches('/').to_string())
            }
            None => Ok(default.to_string()),
        }
    }

    /// The backend rejects requests without browser-shaped origin headers.
    fn build_client(site_url: &str, rate_limit_ms: u64) -> HttpClient {
        HttpClient::new("animetsu")
            .with_rate_limit(rate_limit_ms)
            .with_header("Accept", "application/json, text/plain, */*")
            .with_header("Origin", site_url)
            .with_header("Referer", &format!("{}/", site_url))
    }

    fn id_string(id: &serde_json::Value) -> String {
        match id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Splits `{site}/anime/{id}` or `{site}/watch/{id}/{num}` into its id.
    fn anime_id_from_url(&self, url: &str) -> Result<String> {
        let path = url
            .strip_prefix(&self.site_url)
            .ok_or_else(|| Error::permanent(self.name(), format!("unrecognized URL: {}", url)))?;

        path.split('/')
            .filter(|segment| !segment.is_empty())
            .nth(1)
            .map(String::from)
            .ok_or_else(|| Error::permanent(self.name(), format!("no anime id in URL: {}", url)))
    }

    fn parse_air_date(raw: Option<&str>) -> Option<NaiveDate> {
        let raw = raw?;
        let date_part = raw.get(..10)?;
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }

    fn parse_number(value: Option<&serde_json::Value>) -> Option<u32> {
        match value? {
            serde_json::Value::Number(n) => n.as_u64().map(|n| n as u32),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn parse_duration(value: Option<&serde_json::Value>) -> Option<String> {
        match value? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => n.as_u64().map(|minutes| format!("{}:00", minutes)),
            _ => None,
        }
    }
}

impl Default for AnimetsuSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Source for AnimetsuSource {
    fn name(&self) -> &str {
        "animetsu"
    }

    fn base_url(&self) -> &str {
        &self.site_url
    }

    async fn search(&self, params: SearchParams) -> Result<Vec<SearchResult>> {
        let url = format!(
            "{}/anime/search?query={}&page=1&perPage=35&sort=POPULARITY_DESC",
            self.api_url,
            urlencoding::encode(&params.query)
        );

        let response: AnimetsuSearchResponse = self.client.get_json(&url).await?;

        let results = response
            .results
            .into_iter()
            .filter_map(|anime| {
                let title = anime.title.as_ref()?.preferred()?;
                let id = Self::id_string(&anime.id);
                if id.is_empty() {
                    return None;
                }

                Some(SearchResult {
                    title,
                    url: format!("{}/anime/{}", self.site_url, id),
                    source: self.name().to_string(),
                    episode_count: anime.episodes,
                    description: anime.description.clone(),
                    thumbnail: anime.cover_image.as_ref().and_then(|c| c.preferred()),
                    year: anime
                        .release_date
                        .or_else(|| anime.start_date.as_ref().and_then(|d| d.year)),
                    genres: anime.genres.into_iter().map(|g| g.name).collect(),
                    // The backend scores on a 0–100 scale
                    rating: anime.average_score.map(|score| score / 10.0),
                })
            })
            .collect();

        Ok(results)
    }

    async fn episodes(&self, title_url: &str) -> Result<Vec<Episode>> {
        let anime_id = self.anime_id_from_url(title_url)?;
        let url = format!("{}/anime/eps/{}", self.api_url, anime_id);

        let payload: Vec<AnimetsuEpisode> = self.client.get_json(&url).await?;

        let episodes = payload
            .into_iter()
            .filter_map(|episode| {
                let number = Self::parse_number(episode.number.as_ref())?;
                if number == 0 {
                    return None;
                }
                let title = episode
                    .title
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .unwrap_or_else(|| format!("Episode {}", number));

                Some(Episode {
                    number,
                    title,
                    url: format!("{}/watch/{}/{}", self.site_url, anime_id, number),
                    source: self.name().to_string(),
                    qualities: vec![Quality::Q480, Quality::Q720, Quality::Q1080],
                    duration: Self::parse_duration(episode.duration.as_ref()),
                    thumbnail: episode.image,
                    air_date: Self::parse_air_date(episode.air_date.as_deref()),
                    filler: episode.filler,
                })
            })
            .collect();

        Ok(episodes)
    }

    async fn resolve(&self, episode: &Episode, quality: Quality) -> Result<String> {
        if !episode.has_quality(quality) {
            return Err(Error::QualityUnavailable {
                quality,
                episode: episode.number,
            });
        }

        let anime_id = self.anime_id_from_url(&episode.url)?;
        let url = format!(
            "{}/anime/tiddies?server={}&id={}&num={}&subType={}",
            self.api_url, self.server, anime_id, episode.number, self.sub_type
        );

        let response: AnimetsuStreamResponse = self.client.get_json(&url).await?;

        for stream in &response.sources {
            let matches = stream
                .quality
                .as_deref()
                .and_then(|label| label.parse::<Quality>().ok())
                .is_some_and(|tier| tier == quality);
            if matches {
                return Ok(stream.url.clone());
            }
        }

        // Single unlabeled stream: the server picked the quality for us.
        if let [only] = response.sources.as_slice()
            && only.quality.is_none()
        {
            return Ok(only.url.clone());
        }

        Err(Error::QualityUnavailable {
            quality,
            episode: episode.number,
        })
    }
}

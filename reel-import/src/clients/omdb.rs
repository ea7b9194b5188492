//! OMDb API client (rating enrichment)

use super::http::ensure_success;
use crate::error::ClientError;
use crate::types::Enricher;
use reel_common::config::OmdbConfig;
use reel_common::models::Enrichment;
use reel_common::{ListItem, Ratings};
use serde::Deserialize;
use tracing::debug;

const IMDB_SOURCE: &str = "Internet Movie Database";
const METACRITIC_SOURCE: &str = "Metacritic";
const ROTTEN_TOMATOES_SOURCE: &str = "Rotten Tomatoes";

/// OMDb title response (only the fields enrichment reads)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OmdbMovie {
    pub title: String,
    pub year: String,
    pub runtime: String,
    pub genre: String,
    pub language: String,
    pub ratings: Vec<OmdbRating>,
    #[serde(rename = "imdbVotes")]
    pub imdb_votes: String,
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    pub response: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OmdbRating {
    pub source: String,
    pub value: String,
}

impl OmdbMovie {
    pub fn to_enrichment(&self) -> Enrichment {
        let mut ratings = Ratings::default();
        for rating in &self.ratings {
            match rating.source.as_str() {
                IMDB_SOURCE => ratings.imdb = parse_score(&rating.value, "/10").unwrap_or(0.0),
                METACRITIC_SOURCE => {
                    ratings.metacritic = parse_score(&rating.value, "/100").unwrap_or(0.0) as i64
                }
                ROTTEN_TOMATOES_SOURCE => {
                    ratings.rotten_tomatoes = parse_score(&rating.value, "%").unwrap_or(0.0) as i64
                }
                _ => {}
            }
        }

        Enrichment {
            imdb: Some(self.imdb_id.clone()).filter(|id| !id.is_empty() && id != "N/A"),
            imdb_votes: parse_votes(&self.imdb_votes),
            genre: parse_list(&self.genre),
            language: parse_list(&self.language),
            runtime: parse_runtime(&self.runtime),
            ratings,
            count_ratings: self.ratings.len() as i64,
        }
    }
}

/// OMDb API client
pub struct OmdbClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl OmdbClient {
    pub fn new(http: reqwest::Client, config: &OmdbConfig) -> Result<Self, ClientError> {
        if config.api_key.trim().is_empty() {
            return Err(ClientError::Config("Missing omdb apiKey configuration".to_string()));
        }
        Ok(Self {
            http,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub async fn movie_by_id(&self, imdb_id: &str) -> Result<OmdbMovie, ClientError> {
        self.fetch(&[("i", imdb_id.to_string())]).await
    }

    pub async fn movie_by_title(&self, title: &str, year: u32) -> Result<OmdbMovie, ClientError> {
        let mut query = vec![("t", title.to_string())];
        if year > 0 {
            query.push(("y", year.to_string()));
        }
        self.fetch(&query).await
    }

    async fn fetch(&self, query: &[(&str, String)]) -> Result<OmdbMovie, ClientError> {
        let response = self
            .http
            .get(&self.url)
            .query(query)
            .query(&[("type", "movie"), ("apikey", self.api_key.as_str())])
            .send()
            .await?;
        let movie: OmdbMovie = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        if movie.response.eq_ignore_ascii_case("false") {
            return Err(ClientError::NotFound(movie.error));
        }
        Ok(movie)
    }
}

#[async_trait::async_trait]
impl Enricher for OmdbClient {
    async fn enrich(&self, item: &ListItem) -> Result<Enrichment, ClientError> {
        let movie = if !item.imdb.is_empty() {
            self.movie_by_id(&item.imdb).await?
        } else {
            self.movie_by_title(&item.title, item.year).await?
        };
        debug!(
            item = %item.label(),
            imdb = %movie.imdb_id,
            ratings = movie.ratings.len(),
            "Fetched OMDb ratings"
        );
        Ok(movie.to_enrichment())
    }
}

/// `"1,234,567"` → 1234567, `N/A` → 0
pub fn parse_votes(value: &str) -> i64 {
    value.replace(',', "").trim().parse().unwrap_or(0)
}

/// `"123 min"` → 123
pub fn parse_runtime(value: &str) -> i64 {
    value
        .trim()
        .trim_end_matches("min")
        .trim()
        .parse()
        .unwrap_or(0)
}

/// `"Drama, Sci-Fi"` → ["Drama", "Sci-Fi"]
pub fn parse_list(value: &str) -> Vec<String> {
    if value.trim() == "N/A" {
        return Vec::new();
    }
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `"7.5/10"`, `"85/100"`, `"91%"` → the leading number
pub fn parse_score(value: &str, suffix: &str) -> Option<f64> {
    value.trim().trim_end_matches(suffix).trim().parse().ok()
}

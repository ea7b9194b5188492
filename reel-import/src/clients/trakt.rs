//! Trakt API client
//!
//! Fetches paged movie lists. Most endpoints return `[{ "movie": {...} }]`; the
//! popular and recommended endpoints return bare movie objects.

use super::http::{ensure_success, join_url};
use crate::error::ClientError;
use reel_common::config::TraktConfig;
use serde::Deserialize;
use tracing::{debug, warn};

pub const PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TraktIds {
    #[serde(default)]
    pub imdb: Option<String>,
    #[serde(default)]
    pub tmdb: Option<u64>,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TraktMovie {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub ids: TraktIds,
}

/// Either list item shape
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TraktEntry {
    Wrapped { movie: TraktMovie },
    Bare(TraktMovie),
}

impl TraktEntry {
    fn into_movie(self) -> TraktMovie {
        match self {
            TraktEntry::Wrapped { movie } | TraktEntry::Bare(movie) => movie,
        }
    }
}

/// Trakt API client
pub struct TraktClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl TraktClient {
    pub fn new(http: reqwest::Client, config: &TraktConfig) -> Result<Self, ClientError> {
        if config.api_key.trim().is_empty() {
            return Err(ClientError::Config("Missing trakt apiKey configuration".to_string()));
        }
        Ok(Self {
            http,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// API base URL
    pub fn base_url(&self) -> &str {
        &self.url
    }

    /// Endpoint URL relative to the API base
    pub fn endpoint(&self, path: &str) -> String {
        join_url(&self.url, path)
    }

    async fn fetch_page(&self, url: &str, page: usize, limit: usize) -> Result<Vec<TraktMovie>, ClientError> {
        debug!(url = %url, page, limit, "Fetching trakt page");
        let response = self
            .http
            .get(url)
            .header("Content-Type", "application/json")
            .header("trakt-api-version", "2")
            .header("trakt-api-key", &self.api_key)
            .query(&[("page", page.to_string()), ("limit", limit.to_string())])
            .send()
            .await?;
        let entries: Vec<TraktEntry> = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        Ok(entries.into_iter().map(TraktEntry::into_movie).collect())
    }

    /// Fetch up to `limit` movies, page by page
    ///
    /// Stops at the limit or at the first short page. A failure on the first page
    /// is returned; a failure on a later page ends the list with what was fetched.
    pub async fn fetch_list(&self, url: &str, limit: usize) -> Result<Vec<TraktMovie>, ClientError> {
        let page_limit = PAGE_LIMIT.min(limit.max(1));
        let mut movies = Vec::new();
        let mut page = 1;

        while movies.len() < limit {
            let batch = match self.fetch_page(url, page, page_limit).await {
                Ok(batch) => batch,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    warn!(url = %url, page, error = %e, "Trakt page failed, list truncated");
                    break;
                }
            };
            let short = batch.len() < page_limit;
            movies.extend(batch);
            if short {
                break;
            }
            page += 1;
        }

        movies.truncate(limit);
        Ok(movies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_entry_shapes_parse() {
        let wrapped = r#"[{"rank": 1, "movie": {"title": "Heat", "year": 1995,
            "ids": {"trakt": 1, "slug": "heat-1995", "imdb": "tt0113277", "tmdb": 949}}}]"#;
        let bare = r#"[{"title": "Heat", "year": 1995, "ids": {"imdb": "tt0113277", "tmdb": 949}}]"#;

        for json in [wrapped, bare] {
            let entries: Vec<TraktEntry> = serde_json::from_str(json).unwrap();
            let movie = entries.into_iter().next().unwrap().into_movie();
            assert_eq!(movie.title, "Heat");
            assert_eq!(movie.year, Some(1995));
            assert_eq!(movie.ids.tmdb, Some(949));
        }
    }

    #[test]
    fn test_null_ids_are_tolerated() {
        let json = r#"[{"movie": {"title": "Unreleased", "year": null, "ids": {"imdb": null, "tmdb": null}}}]"#;
        let entries: Vec<TraktEntry> = serde_json::from_str(json).unwrap();
        let movie = entries.into_iter().next().unwrap().into_movie();
        assert_eq!(movie.year, None);
        assert!(movie.ids.imdb.is_none());
    }
}

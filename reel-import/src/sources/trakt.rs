//! Trakt list source
//!
//! Accepted list URLs:
//! - `trakt://movies/trending` (path relative to the API base)
//! - `https://trakt.tv/users/<user>/lists/<list>` (public list page)
//! - a full API URL

use crate::clients::TraktClient;
use crate::error::ClientError;
use crate::types::ListSource;
use reel_common::config::ListConfig;
use reel_common::ListItem;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};

const TRAKT_PROTOCOL: &str = "trakt://";
const TRAKT_USERS_PREFIX: &str = "https://trakt.tv/users/";

pub struct TraktSource {
    client: Arc<TraktClient>,
    user_list: Regex,
}

impl TraktSource {
    pub fn new(client: Arc<TraktClient>) -> Result<Self, ClientError> {
        let user_list = Regex::new(r"/users/([^/]+)/lists/([^/?#]+)")
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(Self { client, user_list })
    }

    /// Rewrite a configured list URL into an API URL
    pub fn api_url(&self, url: &str) -> String {
        if let Some(path) = url.strip_prefix(TRAKT_PROTOCOL) {
            return self.client.endpoint(path);
        }
        if url.starts_with(TRAKT_USERS_PREFIX) {
            if let Some(caps) = self.user_list.captures(url) {
                let api = self.client.endpoint(&format!(
                    "users/{}/lists/{}/items/movies",
                    &caps[1], &caps[2]
                ));
                debug!(url = %url, api = %api, "Resolved trakt user list");
                return api;
            }
        }
        url.to_string()
    }
}

#[async_trait::async_trait]
impl ListSource for TraktSource {
    fn name(&self) -> &'static str {
        "trakt"
    }

    async fn fetch(&self, config: &ListConfig) -> Result<Vec<ListItem>, ClientError> {
        let url = self.api_url(&config.url);
        let movies = self.client.fetch_list(&url, config.limit()).await?;

        let items: Vec<ListItem> = movies
            .into_iter()
            .filter(|movie| !movie.title.is_empty())
            .map(|movie| {
                ListItem::new(movie.title, movie.year.unwrap_or(0))
                    .with_imdb(movie.ids.imdb.unwrap_or_default())
                    .with_tmdb(movie.ids.tmdb.unwrap_or(0))
            })
            .collect();

        info!(url = %url, count = items.len(), "Fetched trakt list");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_common::config::TraktConfig;

    fn source() -> TraktSource {
        let config = TraktConfig {
            api_key: "key".to_string(),
            url: "https://api.trakt.tv/".to_string(),
        };
        let client = TraktClient::new(reqwest::Client::new(), &config).unwrap();
        TraktSource::new(Arc::new(client)).unwrap()
    }

    #[test]
    fn test_protocol_url() {
        assert_eq!(
            source().api_url("trakt://movies/popular"),
            "https://api.trakt.tv/movies/popular"
        );
    }

    #[test]
    fn test_user_list_url() {
        assert_eq!(
            source().api_url("https://trakt.tv/users/alice/lists/sci-fi-classics?sort=rank,asc"),
            "https://api.trakt.tv/users/alice/lists/sci-fi-classics/items/movies"
        );
    }

    #[test]
    fn test_api_url_passes_through() {
        let url = "https://api.trakt.tv/movies/anticipated";
        assert_eq!(source().api_url(url), url);
    }
}

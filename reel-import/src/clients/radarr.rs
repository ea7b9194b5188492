//! Radarr API client (movie sink)
//!
//! Talks to the v3 API with an `X-Api-Key` header. `connect` validates the
//! configuration, checks the key against `system/status` and resolves the configured
//! quality profile name to its id once.

use super::http::{ensure_success, join_url};
use crate::error::ClientError;
use crate::types::MovieSink;
use reel_common::config::RadarrConfig;
use reel_common::models::{title_key, tmdb_key};
use reel_common::{ListItem, MovieCandidate};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct SystemStatus {
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QualityProfile {
    id: i64,
    name: String,
}

/// Library entry, only the ids are used
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryMovie {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub tmdb_id: u64,
}

/// Import-exclusion list entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedMovie {
    #[serde(default)]
    pub movie_title: String,
    #[serde(default)]
    pub movie_year: u32,
    #[serde(default)]
    pub tmdb_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidationFailure {
    #[serde(default)]
    error_message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddOptions {
    search_for_movie: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddMovieRequest<'a> {
    #[serde(flatten)]
    movie: &'a MovieCandidate,
    quality_profile_id: i64,
    root_folder_path: &'a str,
    monitored: bool,
    minimum_availability: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    add_options: Option<AddOptions>,
}

/// Radarr API client
pub struct RadarrClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
    root_folder: String,
    quality_profile_id: i64,
    minimum_availability: String,
    monitored: bool,
    search_for_movie: bool,
}

impl RadarrClient {
    /// Validate configuration, check the API key and resolve the quality profile
    pub async fn connect(http: reqwest::Client, config: &RadarrConfig) -> Result<Self, ClientError> {
        for (key, value) in [
            ("url", &config.url),
            ("apiKey", &config.api_key),
            ("rootFolder", &config.root_folder),
            ("quality", &config.quality),
            ("minimumAvailability", &config.minimum_availability),
        ] {
            if value.trim().is_empty() {
                return Err(ClientError::Config(format!("Missing radarr {} configuration", key)));
            }
        }
        reqwest::Url::parse(&config.url)
            .map_err(|e| ClientError::Config(format!("Invalid radarr url {}: {}", config.url, e)))?;

        let mut client = Self {
            http,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            root_folder: config.root_folder.clone(),
            quality_profile_id: 0,
            minimum_availability: config.minimum_availability.clone(),
            monitored: config.monitored,
            search_for_movie: config.search_for_movie,
        };

        let version = client.system_version().await?;
        client.quality_profile_id = client.find_quality_profile(&config.quality).await?;
        info!(
            version = %version,
            quality = %config.quality,
            quality_profile_id = client.quality_profile_id,
            "Connected to Radarr"
        );
        Ok(client)
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.http
            .request(method, join_url(&self.url, endpoint))
            .header("X-Api-Key", &self.api_key)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        let response = self.request(Method::GET, endpoint).send().await?;
        let response = ensure_success(response).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    async fn system_version(&self) -> Result<String, ClientError> {
        let status: SystemStatus = self.get_json("api/v3/system/status").await?;
        status.version.ok_or_else(|| {
            ClientError::Config("Can't access radarr system status, check the API key".to_string())
        })
    }

    async fn find_quality_profile(&self, name: &str) -> Result<i64, ClientError> {
        let profiles: Vec<QualityProfile> = self.get_json("api/v3/qualityprofile").await?;
        let profile = profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ClientError::Config(format!("Quality profile {:?} not found", name)))?;
        debug!(quality = %name, id = profile.id, "Found quality profile");
        Ok(profile.id)
    }

    pub fn quality_profile_id(&self) -> i64 {
        self.quality_profile_id
    }

    /// Every movie in the library
    pub async fn movies(&self) -> Result<Vec<LibraryMovie>, ClientError> {
        self.get_json("api/v3/movie").await
    }

    /// The import-exclusion list
    pub async fn exclusions(&self) -> Result<Vec<ExcludedMovie>, ClientError> {
        self.get_json("api/v3/exclusions").await
    }

    pub async fn lookup_by_tmdb(&self, tmdb_id: u64) -> Result<MovieCandidate, ClientError> {
        self.lookup_movie("api/v3/movie/lookup/tmdb", "tmdbId", tmdb_id.to_string())
            .await
    }

    pub async fn lookup_by_imdb(&self, imdb_id: &str) -> Result<MovieCandidate, ClientError> {
        self.lookup_movie("api/v3/movie/lookup/imdb", "imdbId", imdb_id.to_string())
            .await
    }

    async fn lookup_movie(
        &self,
        endpoint: &str,
        key: &str,
        id: String,
    ) -> Result<MovieCandidate, ClientError> {
        let response = self
            .request(Method::GET, endpoint)
            .query(&[(key, id.as_str())])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(format!("{}={}", key, id)));
        }
        let movie: MovieCandidate = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        debug!(title = %movie.title, year = movie.year, "Radarr lookup");
        Ok(movie)
    }

    /// Add a movie with the configured profile, root folder and availability
    pub async fn add_movie(&self, movie: &MovieCandidate) -> Result<(), ClientError> {
        let body = AddMovieRequest {
            movie,
            quality_profile_id: self.quality_profile_id,
            root_folder_path: &self.root_folder,
            monitored: self.monitored,
            minimum_availability: &self.minimum_availability,
            add_options: self.search_for_movie.then_some(AddOptions {
                search_for_movie: true,
            }),
        };

        let response = self
            .request(Method::POST, "api/v3/movie")
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected(validation_message(&text)));
        }
        ensure_success(response).await?;
        Ok(())
    }
}

/// Joined `errorMessage`s of a 400 response, or the raw body
fn validation_message(body: &str) -> String {
    match serde_json::from_str::<Vec<ValidationFailure>>(body) {
        Ok(failures) if !failures.is_empty() => failures
            .into_iter()
            .map(|f| f.error_message)
            .filter(|m| !m.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.to_string(),
    }
}

#[async_trait::async_trait]
impl MovieSink for RadarrClient {
    async fn list_existing(&self) -> Result<Vec<String>, ClientError> {
        let movies = self.movies().await?;
        let mut keys = Vec::with_capacity(movies.len() * 2);
        for movie in movies {
            if let Some(imdb) = movie.imdb_id.filter(|id| !id.is_empty()) {
                keys.push(imdb);
            }
            if movie.tmdb_id > 0 {
                keys.push(tmdb_key(movie.tmdb_id));
            }
        }
        Ok(keys)
    }

    async fn list_excluded(&self) -> Result<Vec<String>, ClientError> {
        let excluded = self.exclusions().await?;
        let mut keys = Vec::with_capacity(excluded.len() * 2);
        for movie in excluded {
            if !movie.movie_title.is_empty() {
                keys.push(title_key(&movie.movie_title));
            }
            if movie.tmdb_id > 0 {
                keys.push(tmdb_key(movie.tmdb_id));
            }
        }
        Ok(keys)
    }

    async fn lookup(&self, item: &ListItem) -> Result<MovieCandidate, ClientError> {
        if item.tmdb > 0 {
            self.lookup_by_tmdb(item.tmdb).await
        } else if !item.imdb.is_empty() {
            self.lookup_by_imdb(&item.imdb).await
        } else {
            Err(ClientError::NotFound(format!(
                "{} has no catalog id",
                item.label()
            )))
        }
    }

    async fn add(&self, movie: &MovieCandidate) -> Result<(), ClientError> {
        self.add_movie(movie).await
    }
}

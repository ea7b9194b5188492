//! GuessIt client
//!
//! Turns release names such as `Arrival.2016.1080p.BluRay.x264-SPARKS` into a title,
//! year and media type, either through the GuessIt web service or by running the
//! local `guessit` executable.

use super::http::ensure_success;
use crate::error::ClientError;
use reel_common::config::{GuessItConfig, GuessItMode};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GuessResult {
    pub title: String,
    pub year: Option<u32>,
    #[serde(rename = "type")]
    pub media_type: String,
}

impl GuessResult {
    pub fn is_movie(&self) -> bool {
        self.media_type == "movie"
    }
}

enum Backend {
    WebService { http: reqwest::Client, url: String },
    Command { path: String },
}

pub struct GuessItClient {
    backend: Backend,
}

impl GuessItClient {
    pub fn new(http: reqwest::Client, config: &GuessItConfig) -> Result<Self, ClientError> {
        let backend = match config.mode {
            GuessItMode::Webservice => {
                reqwest::Url::parse(&config.url).map_err(|e| {
                    ClientError::Config(format!("Invalid guessit url {:?}: {}", config.url, e))
                })?;
                Backend::WebService {
                    http,
                    url: config.url.clone(),
                }
            }
            GuessItMode::Command => {
                if config.path.trim().is_empty() {
                    return Err(ClientError::Config("Missing guessit path".to_string()));
                }
                Backend::Command {
                    path: config.path.clone(),
                }
            }
        };
        Ok(Self { backend })
    }

    pub fn mode(&self) -> GuessItMode {
        match self.backend {
            Backend::WebService { .. } => GuessItMode::Webservice,
            Backend::Command { .. } => GuessItMode::Command,
        }
    }

    pub async fn guess(&self, release: &str) -> Result<GuessResult, ClientError> {
        match &self.backend {
            Backend::WebService { http, url } => {
                let response = http.get(url).query(&[("filename", release)]).send().await?;
                ensure_success(response)
                    .await?
                    .json()
                    .await
                    .map_err(|e| ClientError::Parse(e.to_string()))
            }
            Backend::Command { path } => guess_with_command(path, release).await,
        }
    }
}

/// Run `<path> <release> --json` and parse its stdout
async fn guess_with_command(path: &str, release: &str) -> Result<GuessResult, ClientError> {
    let output = Command::new(path)
        .arg(release)
        .arg("--json")
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ClientError::Command(format!("Failed to run {}: {}", path, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ClientError::Command(format!(
            "{} exited with {}: {}",
            path,
            output.status,
            stderr.trim()
        )));
    }

    debug!(release = %release, bytes = output.stdout.len(), "guessit command finished");
    serde_json::from_slice(&output.stdout).map_err(|e| ClientError::Parse(e.to_string()))
}

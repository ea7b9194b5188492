//! Configuration schema, loading and config file resolution
//!
//! The configuration is a single TOML file. Keys are camelCase:
//!
//! ```toml
//! cron = "0 0 */6 * * *"
//!
//! [importer]
//! revision = true
//!
//! [importer.filter]
//! exclude = ["Year < 2000"]
//!
//! [importer.lists.trending]
//! url = "trakt://movies/trending"
//! type = "trakt"
//!
//! [importer.lists.trending.filter]
//! limit = 50
//! exclude = ["Ratings.Imdb < 6.5"]
//! ```
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `REEL_CONFIG`
//! 3. User config directory (`~/.config/reel/config.toml` on Linux)
//! 4. System config (`/etc/reel/config.toml`)

use crate::events::EventType;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "REEL_CONFIG";

/// Result cap applied when neither the list nor the global filter sets one
pub const DEFAULT_LIST_LIMIT: usize = 1000;

const DEFAULT_OMDB_URL: &str = "http://www.omdbapi.com/";
const DEFAULT_TRAKT_URL: &str = "https://api.trakt.tv/";

/// Complete configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TomlConfig {
    /// Cron schedule for `reel-import cron` (seconds field first)
    #[serde(default)]
    pub cron: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub importer: ImporterConfig,

    #[serde(default)]
    pub services: ServicesConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

// ============================================================================
// Importer configuration
// ============================================================================

/// Importer section: global filter, revision mode and the configured lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImporterConfig {
    /// Flag rejected items for manual review
    #[serde(default)]
    pub revision: bool,

    /// Rules applied to every list
    #[serde(default)]
    pub filter: FilterConfig,

    /// Lists by name, enumerated in name order
    #[serde(default)]
    pub lists: BTreeMap<String, ListConfig>,
}

impl ImporterConfig {
    /// All lists with the global filter merged into each list's filter
    pub fn resolved_lists(&self) -> Vec<(String, ListConfig)> {
        self.lists
            .iter()
            .map(|(name, list)| (name.clone(), self.resolve(list)))
            .collect()
    }

    /// One list by case-insensitive name, with the global filter merged in
    pub fn find_list(&self, name: &str) -> Option<(String, ListConfig)> {
        self.lists
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(candidate, list)| (candidate.clone(), self.resolve(list)))
    }

    fn resolve(&self, list: &ListConfig) -> ListConfig {
        let mut resolved = list.clone();
        resolved.filter = self.filter.merged_with(&list.filter);
        debug!(
            url = %resolved.url,
            list_type = %resolved.list_type,
            exclude = resolved.filter.exclude.len(),
            revision = resolved.filter.revision.len(),
            "Resolved list configuration"
        );
        resolved
    }
}

/// Rule lists and result cap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    #[serde(default)]
    pub limit: Option<usize>,

    /// Exclusion rules: any match rejects the item
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Revision rules: any match keeps a rejected item out of review
    #[serde(default)]
    pub revision: Vec<String>,
}

impl FilterConfig {
    /// Union of both rule lists (self first), list-local limit wins
    pub fn merged_with(&self, local: &FilterConfig) -> FilterConfig {
        FilterConfig {
            limit: local.limit.or(self.limit),
            exclude: self.exclude.iter().chain(&local.exclude).cloned().collect(),
            revision: self.revision.iter().chain(&local.revision).cloned().collect(),
        }
    }
}

/// List source type tag
///
/// Kept open so an unsupported tag fails only the list that uses it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ListType(String);

impl ListType {
    pub const RSS: &'static str = "rss";
    pub const IMDB: &'static str = "imdb";
    pub const TRAKT: &'static str = "trakt";

    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(tag.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ListType {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}

impl From<ListType> for String {
    fn from(list_type: ListType) -> Self {
        list_type.0
    }
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-list configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListConfig {
    pub url: String,

    #[serde(rename = "type")]
    pub list_type: ListType,

    /// Run list titles through the title guesser (RSS lists)
    #[serde(default, alias = "guessIt")]
    pub use_guessing: bool,

    #[serde(default)]
    pub filter: FilterConfig,
}

impl ListConfig {
    pub fn new(url: impl Into<String>, list_type: impl AsRef<str>) -> Self {
        Self {
            url: url.into(),
            list_type: ListType::new(list_type),
            use_guessing: false,
            filter: FilterConfig::default(),
        }
    }

    /// Result cap, 1000 when unset
    pub fn limit(&self) -> usize {
        self.filter.limit.unwrap_or(DEFAULT_LIST_LIMIT)
    }
}

// ============================================================================
// External services
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicesConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub radarr: Option<RadarrConfig>,
    #[serde(default)]
    pub omdb: Option<OmdbConfig>,
    #[serde(default)]
    pub trakt: Option<TraktConfig>,
    #[serde(default)]
    pub guessit: Option<GuessItConfig>,
}

/// Shared HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_user_agent() -> String {
    format!("reel/{}", env!("CARGO_PKG_VERSION"))
}

/// Movie sink (Radarr) settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarrConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub root_folder: String,
    /// Quality profile name
    #[serde(default)]
    pub quality: String,
    #[serde(default)]
    pub minimum_availability: String,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default)]
    pub search_for_movie: bool,
}

/// Rating service (OMDb) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OmdbConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_omdb_url")]
    pub url: String,
}

fn default_omdb_url() -> String {
    DEFAULT_OMDB_URL.to_string()
}

/// Trakt API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraktConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_trakt_url")]
    pub url: String,
}

fn default_trakt_url() -> String {
    DEFAULT_TRAKT_URL.to_string()
}

/// How the title guesser is reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuessItMode {
    /// `GET <url>?filename=<release>`
    #[default]
    Webservice,
    /// `<path> <release> --json`
    Command,
}

/// Title guesser settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessItConfig {
    #[serde(rename = "type", default)]
    pub mode: GuessItMode,
    /// Web service endpoint (webservice mode)
    #[serde(default)]
    pub url: String,
    /// Executable (command mode)
    #[serde(default = "default_guessit_path")]
    pub path: String,
}

impl GuessItConfig {
    pub fn webservice(url: impl Into<String>) -> Self {
        Self {
            mode: GuessItMode::Webservice,
            url: url.into(),
            path: default_guessit_path(),
        }
    }

    pub fn command(path: impl Into<String>) -> Self {
        Self {
            mode: GuessItMode::Command,
            url: String::new(),
            path: path.into(),
        }
    }
}

fn default_guessit_path() -> String {
    "guessit".to_string()
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsConfig {
    #[serde(default)]
    pub gotify: Option<WebhookConfig>,
    #[serde(default)]
    pub slack: Option<WebhookConfig>,
}

/// Webhook notification agent settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    pub webhook: String,
    /// Subscribed event types, empty = all
    #[serde(default)]
    pub events: Vec<EventType>,
}

// ============================================================================
// Config file resolution
// ============================================================================

/// Resolve the configuration file path
///
/// Returns the first candidate that applies: CLI argument, `REEL_CONFIG`, then the
/// first existing file among the user and system config locations.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    default_config_paths()
        .into_iter()
        .find(|path| path.exists())
        .ok_or_else(|| Error::Config("No config file found".to_string()))
}

/// Platform config file locations in priority order
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("reel").join("config.toml"));
    }
    if cfg!(unix) {
        paths.push(PathBuf::from("/etc/reel/config.toml"));
    }
    paths
}

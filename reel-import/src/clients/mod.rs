//! HTTP clients for the external services

pub mod guessit;
pub mod http;
pub mod omdb;
pub mod radarr;
pub mod trakt;

pub use guessit::GuessItClient;
pub use omdb::OmdbClient;
pub use radarr::RadarrClient;
pub use trakt::TraktClient;

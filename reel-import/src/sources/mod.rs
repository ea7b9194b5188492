//! List sources

pub mod imdb;
pub mod rss;
pub mod trakt;

pub use imdb::ImdbSource;
pub use rss::RssSource;
pub use trakt::TraktSource;

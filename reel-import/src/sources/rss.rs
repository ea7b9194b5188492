//! RSS / Atom feed source
//!
//! Feed entries carry release names rather than clean titles, so lists with
//! `useGuessing = true` pass each title through GuessIt and keep only entries it
//! recognizes as movies.

use crate::clients::http::ensure_success;
use crate::clients::GuessItClient;
use crate::error::ClientError;
use crate::types::ListSource;
use reel_common::config::ListConfig;
use reel_common::ListItem;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct RssSource {
    http: reqwest::Client,
    guessit: Option<Arc<GuessItClient>>,
}

impl RssSource {
    pub fn new(http: reqwest::Client, guessit: Option<Arc<GuessItClient>>) -> Self {
        Self { http, guessit }
    }

    async fn guess_items(&self, guessit: &GuessItClient, titles: Vec<String>) -> Vec<ListItem> {
        let mut items = Vec::with_capacity(titles.len());
        for title in titles {
            match guessit.guess(&title).await {
                Ok(guess) if guess.is_movie() && !guess.title.is_empty() => {
                    debug!(release = %title, title = %guess.title, year = ?guess.year, "Guessed feed entry");
                    items.push(ListItem::new(guess.title, guess.year.unwrap_or(0)));
                }
                Ok(guess) => {
                    debug!(release = %title, media_type = %guess.media_type, "Skipping non-movie feed entry");
                }
                Err(e) => {
                    warn!(release = %title, error = %e, "Title guessing failed");
                }
            }
        }
        items
    }
}

#[async_trait::async_trait]
impl ListSource for RssSource {
    fn name(&self) -> &'static str {
        "rss"
    }

    async fn fetch(&self, config: &ListConfig) -> Result<Vec<ListItem>, ClientError> {
        let response = self.http.get(&config.url).send().await?;
        let body = ensure_success(response).await?.bytes().await?;

        let mut titles = parse_titles(&body)?;
        info!(url = %config.url, count = titles.len(), "Found feed items");
        titles.truncate(config.limit());

        let items = match (&self.guessit, config.use_guessing) {
            (Some(guessit), true) => self.guess_items(guessit, titles).await,
            (None, true) => {
                warn!(url = %config.url, "useGuessing is set but no guessit service is configured");
                titles.into_iter().map(|t| ListItem::new(t, 0)).collect()
            }
            (_, false) => titles.into_iter().map(|t| ListItem::new(t, 0)).collect(),
        };
        Ok(items)
    }
}

/// Entry titles in feed order (RSS 0.9x/1.0/2.0, Atom and JSON Feed)
///
/// Entries without a title are skipped; whitespace is collapsed.
pub fn parse_titles(feed: &[u8]) -> Result<Vec<String>, ClientError> {
    let feed = feed_rs::parser::parse(feed)
        .map_err(|e| ClientError::Parse(format!("Invalid feed: {}", e)))?;
    Ok(feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry.title?.content;
            let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
            (!title.is_empty()).then_some(title)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Releases</title>
  <item><title>Arrival.2016.1080p.BluRay.x264-SPARKS</title><link>x</link></item>
  <item>
    <title><![CDATA[ Fast & Furious 9 (2021) ]]></title>
  </item>
  <item><title>Tom &amp; Jerry &#8211; The Movie</title></item>
  <item><title><![CDATA[Tom &amp; Jerry]]></title></item>
  <item><description>no title</description></item>
</channel></rss>"#;

    #[test]
    fn test_parse_titles_skips_channel_title() {
        let titles = parse_titles(FEED.as_bytes()).unwrap();
        assert_eq!(
            titles,
            vec![
                "Arrival.2016.1080p.BluRay.x264-SPARKS",
                "Fast & Furious 9 (2021)",
                "Tom & Jerry \u{2013} The Movie",
                "Tom &amp; Jerry",
            ]
        );
    }

    #[test]
    fn test_atom_entries() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Watchlist</title>
  <id>urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6</id>
  <updated>2024-03-15T12:00:00Z</updated>
  <entry>
    <title type="text">Dune</title>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
    <updated>2024-03-15T12:00:00Z</updated>
  </entry>
</feed>"#;
        assert_eq!(parse_titles(atom.as_bytes()).unwrap(), vec!["Dune"]);
    }

    #[test]
    fn test_prefixed_elements() {
        let feed = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/">
  <channel rdf:about="https://example.com/"><title>Releases</title></channel>
  <item rdf:about="https://example.com/1"><title>Heat 1995</title></item>
</rdf:RDF>"#;
        assert_eq!(parse_titles(feed.as_bytes()).unwrap(), vec!["Heat 1995"]);
    }

    #[test]
    fn test_invalid_feed_is_parse_error() {
        assert!(matches!(
            parse_titles(b"<html><body>not a feed</body></html>"),
            Err(ClientError::Parse(_))
        ));
    }
}

//! IMDb list page source
//!
//! Scrapes a public list page (`https://www.imdb.com/list/ls.../`). Each
//! `div.lister-list .lister-item` yields the header link text as the title, the
//! `tt` id from the link and the year from `.lister-item-year`.

use crate::clients::http::ensure_success;
use crate::error::ClientError;
use crate::types::ListSource;
use reel_common::config::ListConfig;
use reel_common::ListItem;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

pub struct ImdbSource {
    http: reqwest::Client,
    item: Selector,
    link: Selector,
    year: Selector,
    imdb_id: Regex,
    digits: Regex,
}

fn selector(css: &str) -> Result<Selector, ClientError> {
    Selector::parse(css).map_err(|e| ClientError::Config(format!("Invalid selector {:?}: {:?}", css, e)))
}

impl ImdbSource {
    pub fn new(http: reqwest::Client) -> Result<Self, ClientError> {
        Ok(Self {
            http,
            item: selector("div.lister-list .lister-item")?,
            link: selector(".lister-item-header a")?,
            year: selector(".lister-item-header .lister-item-year")?,
            imdb_id: Regex::new(r"tt\d+").map_err(|e| ClientError::Config(e.to_string()))?,
            digits: Regex::new(r"\d+").map_err(|e| ClientError::Config(e.to_string()))?,
        })
    }

    /// List entries in page order, at most `limit`
    pub fn parse_page(&self, html: &str, limit: usize) -> Vec<ListItem> {
        let document = Html::parse_document(html);
        document
            .select(&self.item)
            .take(limit)
            .filter_map(|entry| self.parse_entry(entry))
            .collect()
    }

    fn parse_entry(&self, entry: ElementRef<'_>) -> Option<ListItem> {
        let link = entry.select(&self.link).next()?;
        let title = link.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            return None;
        }

        let imdb = link
            .value()
            .attr("href")
            .and_then(|href| self.imdb_id.find(href))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let year = entry
            .select(&self.year)
            .next()
            .map(|y| y.text().collect::<String>())
            .and_then(|text| self.digits.find(&text).and_then(|m| m.as_str().parse().ok()))
            .unwrap_or(0);

        debug!(title = %title, imdb = %imdb, year, "Processing imdb list item");
        Some(ListItem::new(title, year).with_imdb(imdb))
    }
}

#[async_trait::async_trait]
impl ListSource for ImdbSource {
    fn name(&self) -> &'static str {
        "imdb"
    }

    async fn fetch(&self, config: &ListConfig) -> Result<Vec<ListItem>, ClientError> {
        let response = self.http.get(&config.url).send().await?;
        let body = ensure_success(response).await?.text().await?;

        let items = self.parse_page(&body, config.limit());
        info!(url = %config.url, count = items.len(), "Found imdb list items");
        Ok(items)
    }
}

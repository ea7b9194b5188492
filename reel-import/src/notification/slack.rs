//! Slack incoming-webhook notifications (block kit)

use super::gotify::display_title;
use super::webhook::WebhookAgent;
use crate::error::ClientError;
use crate::types::NotificationSink;
use reel_common::events::{EventType, ImportEvent};
use reel_common::{ListItem, MovieCandidate};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackMessage {
    pub blocks: Vec<SlackBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<SlackText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackText {
    #[serde(rename = "type")]
    pub text_type: String,
    pub text: String,
}

impl SlackBlock {
    fn section(text: impl Into<String>) -> Self {
        Self {
            block_type: "section".to_string(),
            text: Some(SlackText {
                text_type: "mrkdwn".to_string(),
                text: text.into(),
            }),
            image_url: None,
            alt_text: None,
        }
    }

    fn image(url: &str, alt: &str) -> Self {
        Self {
            block_type: "image".to_string(),
            text: None,
            image_url: Some(url.to_string()),
            alt_text: Some(alt.to_string()),
        }
    }
}

pub struct SlackAgent {
    webhook: WebhookAgent,
}

impl SlackAgent {
    pub fn new(webhook: WebhookAgent) -> Self {
        Self { webhook }
    }

    pub fn message(event: &ImportEvent) -> SlackMessage {
        let blocks = match event {
            ImportEvent::StartFeed { list, .. } => {
                vec![SlackBlock::section(format!("Start processing feed {}", list))]
            }
            ImportEvent::FinishFeed { list, added, .. } => vec![SlackBlock::section(format!(
                "Finish processing feed {}, added {} movies",
                list, added
            ))],
            ImportEvent::FinishAllFeeds { added, .. } => vec![SlackBlock::section(format!(
                "Finish processing all feeds, added {} movies",
                added
            ))],
            ImportEvent::AddedMovie {
                list, item, movie, ..
            } => {
                let mut blocks = vec![
                    SlackBlock::section(format!("Added new movie found in feed *{}*.", list)),
                    SlackBlock::section(movie_details(item, movie)),
                ];
                blocks.extend(poster(movie));
                blocks
            }
            ImportEvent::RevisionMovie {
                list, item, movie, ..
            } => {
                let mut blocks = vec![SlackBlock::section(format!(
                    "Movie *{}* from feed *{}* needs revision.",
                    display_title(item, movie.as_ref()),
                    list
                ))];
                if let Some(movie) = movie {
                    blocks.push(SlackBlock::section(movie_details(item, movie)));
                    blocks.extend(poster(movie));
                }
                blocks
            }
        };
        SlackMessage { blocks }
    }
}

fn movie_details(item: &ListItem, movie: &MovieCandidate) -> String {
    let url = format!(
        "https://www.themoviedb.org/movie/{}-{}",
        movie.tmdb_id, movie.title_slug
    );
    format!(
        "<{}|{} ({})>\n{}\n\n IMDB: *{:.1}*/10 | METACRITIC: *{}*/100 | ROTTEN TOMATOES: *{}%*",
        url,
        movie.title,
        movie.year,
        movie.overview,
        item.ratings.imdb,
        item.ratings.metacritic,
        item.ratings.rotten_tomatoes
    )
}

fn poster(movie: &MovieCandidate) -> Option<SlackBlock> {
    movie
        .images
        .first()
        .map(|image| SlackBlock::image(&image.url, &movie.title))
}

#[async_trait::async_trait]
impl NotificationSink for SlackAgent {
    fn name(&self) -> &str {
        "slack"
    }

    fn subscriptions(&self) -> &[EventType] {
        self.webhook.events()
    }

    async fn publish(&self, event: &ImportEvent) -> Result<(), ClientError> {
        self.webhook.send(&Self::message(event)).await
    }
}

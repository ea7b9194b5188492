//! Gotify push notifications

use super::webhook::WebhookAgent;
use crate::error::ClientError;
use crate::types::NotificationSink;
use reel_common::events::{EventType, ImportEvent};
use reel_common::{ListItem, MovieCandidate};
use serde::Serialize;

const APP_TITLE: &str = "Reel";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GotifyMessage {
    pub title: String,
    pub message: String,
}

pub struct GotifyAgent {
    webhook: WebhookAgent,
}

impl GotifyAgent {
    pub fn new(webhook: WebhookAgent) -> Self {
        Self { webhook }
    }

    pub fn message(event: &ImportEvent) -> GotifyMessage {
        match event {
            ImportEvent::StartFeed { list, .. } => GotifyMessage {
                title: format!("{}: {}", APP_TITLE, list),
                message: format!("Start processing feed {}", list),
            },
            ImportEvent::FinishFeed { list, added, .. } => GotifyMessage {
                title: format!("{}: {}", APP_TITLE, list),
                message: format!("Finish processing feed {}, added {} movies", list, added),
            },
            ImportEvent::FinishAllFeeds { added, .. } => GotifyMessage {
                title: APP_TITLE.to_string(),
                message: format!("Finish processing all feeds, added {} movies", added),
            },
            ImportEvent::AddedMovie {
                list, item, movie, ..
            } => GotifyMessage {
                title: format!("{}: {}", APP_TITLE, list),
                message: format!(
                    "Added new movie '{} ({})', {}",
                    movie.title,
                    movie.year,
                    ratings_line(item)
                ),
            },
            ImportEvent::RevisionMovie {
                list, item, movie, ..
            } => GotifyMessage {
                title: format!("{}: {}", APP_TITLE, list),
                message: format!(
                    "Movie '{}' needs revision, {}",
                    display_title(item, movie.as_ref()),
                    ratings_line(item)
                ),
            },
        }
    }
}

/// Sink title when resolved, else the list's own label
pub(crate) fn display_title(item: &ListItem, movie: Option<&MovieCandidate>) -> String {
    match movie {
        Some(movie) => format!("{} ({})", movie.title, movie.year),
        None => item.label(),
    }
}

fn ratings_line(item: &ListItem) -> String {
    format!(
        "ratings: imdb {:.1}, metacritic {}/100, rotten tomatoes {}%",
        item.ratings.imdb, item.ratings.metacritic, item.ratings.rotten_tomatoes
    )
}

#[async_trait::async_trait]
impl NotificationSink for GotifyAgent {
    fn name(&self) -> &str {
        "gotify"
    }

    fn subscriptions(&self) -> &[EventType] {
        self.webhook.events()
    }

    async fn publish(&self, event: &ImportEvent) -> Result<(), ClientError> {
        self.webhook.send(&Self::message(event)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reel_common::Ratings;
    use uuid::Uuid;

    #[test]
    fn test_added_movie_message() {
        let mut item = ListItem::new("Arrival", 2016);
        item.ratings = Ratings {
            imdb: 7.9,
            metacritic: 81,
            rotten_tomatoes: 94,
        };
        let event = ImportEvent::AddedMovie {
            run_id: Uuid::new_v4(),
            list: "popular".to_string(),
            item,
            movie: MovieCandidate {
                title: "Arrival".to_string(),
                year: 2016,
                ..Default::default()
            },
            timestamp: Utc::now(),
        };

        let message = GotifyAgent::message(&event);
        assert_eq!(message.title, "Reel: popular");
        assert_eq!(
            message.message,
            "Added new movie 'Arrival (2016)', ratings: imdb 7.9, metacritic 81/100, rotten tomatoes 94%"
        );
    }

    #[test]
    fn test_finish_all_feeds_message() {
        let event = ImportEvent::FinishAllFeeds {
            run_id: Uuid::new_v4(),
            approved: 4,
            added: 3,
            timestamp: Utc::now(),
        };
        let message = GotifyAgent::message(&event);
        assert_eq!(message.title, "Reel");
        assert_eq!(message.message, "Finish processing all feeds, added 3 movies");
    }

    #[test]
    fn test_revision_without_candidate_uses_item_label() {
        let event = ImportEvent::RevisionMovie {
            run_id: Uuid::new_v4(),
            list: "releases".to_string(),
            item: ListItem::new("Obscure Film", 2020),
            movie: None,
            timestamp: Utc::now(),
        };
        assert!(GotifyAgent::message(&event)
            .message
            .starts_with("Movie 'Obscure Film (2020)' needs revision"));
    }
}

//! Collaborator traits
//!
//! The import pipeline only talks to the outside world through these traits. Concrete
//! implementations live in `clients`, `sources` and `notification`; tests supply fakes.

use crate::error::ClientError;
use reel_common::config::ListConfig;
use reel_common::events::{EventType, ImportEvent};
use reel_common::models::Enrichment;
use reel_common::{ListItem, MovieCandidate};

/// Fetches the raw items of one configured list
#[async_trait::async_trait]
pub trait ListSource: Send + Sync {
    /// Source name for logging
    fn name(&self) -> &'static str;

    /// Fetch up to `config.limit()` items
    async fn fetch(&self, config: &ListConfig) -> Result<Vec<ListItem>, ClientError>;
}

/// Rating and metadata lookup
#[async_trait::async_trait]
pub trait Enricher: Send + Sync {
    /// Look the item up by primary id, else title and year
    ///
    /// `ClientError::NotFound` means the service has no record; the item keeps its
    /// zero-valued fields.
    async fn enrich(&self, item: &ListItem) -> Result<Enrichment, ClientError>;
}

/// Downstream media manager that persists accepted items
#[async_trait::async_trait]
pub trait MovieSink: Send + Sync {
    /// Identity keys of everything already in the library
    async fn list_existing(&self) -> Result<Vec<String>, ClientError>;

    /// Identity keys the operator has blacklisted
    async fn list_excluded(&self) -> Result<Vec<String>, ClientError>;

    /// Resolve an item to a concrete addable candidate
    async fn lookup(&self, item: &ListItem) -> Result<MovieCandidate, ClientError>;

    async fn add(&self, movie: &MovieCandidate) -> Result<(), ClientError>;
}

/// Destination for lifecycle events
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    /// Subscribed event types; empty means every type
    fn subscriptions(&self) -> &[EventType];

    fn is_subscribed(&self, event_type: EventType) -> bool {
        let subscriptions = self.subscriptions();
        subscriptions.is_empty() || subscriptions.contains(&event_type)
    }

    async fn publish(&self, event: &ImportEvent) -> Result<(), ClientError>;
}

/// Enricher used when no rating service is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnricher;

#[async_trait::async_trait]
impl Enricher for NoopEnricher {
    async fn enrich(&self, item: &ListItem) -> Result<Enrichment, ClientError> {
        Err(ClientError::NotFound(item.label()))
    }
}

//! Event types for the reel import lifecycle
//!
//! Provides the shared event definitions and an EventBus for in-process observers.
//! Notification agents subscribe to events by `EventType`.

use crate::models::{ListItem, MovieCandidate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Event type tag used for subscription filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    StartFeed,
    FinishFeed,
    FinishAllFeeds,
    AddedMovie,
    RevisionMovie,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            EventType::StartFeed => "START_FEED",
            EventType::FinishFeed => "FINISH_FEED",
            EventType::FinishAllFeeds => "FINISH_ALL_FEEDS",
            EventType::AddedMovie => "ADDED_MOVIE",
            EventType::RevisionMovie => "REVISION_MOVIE",
        };
        f.write_str(tag)
    }
}

/// Import lifecycle events
///
/// Events are immutable once constructed and broadcast at most once.
/// Every event carries the id of the run that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportEvent {
    /// Processing of a list started
    StartFeed {
        run_id: Uuid,
        list: String,
        timestamp: DateTime<Utc>,
    },

    /// Processing of a list finished
    FinishFeed {
        run_id: Uuid,
        list: String,
        /// Items that passed the exclusion rules
        approved: usize,
        /// Items persisted to the sink
        added: usize,
        timestamp: DateTime<Utc>,
    },

    /// Every configured list was processed
    FinishAllFeeds {
        run_id: Uuid,
        approved: usize,
        added: usize,
        timestamp: DateTime<Utc>,
    },

    /// An item was added to the sink
    AddedMovie {
        run_id: Uuid,
        list: String,
        item: ListItem,
        movie: MovieCandidate,
        timestamp: DateTime<Utc>,
    },

    /// A rejected item was flagged for manual review
    RevisionMovie {
        run_id: Uuid,
        list: String,
        item: ListItem,
        /// Sink candidate, if the best-effort lookup found one
        movie: Option<MovieCandidate>,
        timestamp: DateTime<Utc>,
    },
}

impl ImportEvent {
    /// Subscription tag of this event
    pub fn event_type(&self) -> EventType {
        match self {
            ImportEvent::StartFeed { .. } => EventType::StartFeed,
            ImportEvent::FinishFeed { .. } => EventType::FinishFeed,
            ImportEvent::FinishAllFeeds { .. } => EventType::FinishAllFeeds,
            ImportEvent::AddedMovie { .. } => EventType::AddedMovie,
            ImportEvent::RevisionMovie { .. } => EventType::RevisionMovie,
        }
    }

    /// List the event belongs to (None for run-level events)
    pub fn list(&self) -> Option<&str> {
        match self {
            ImportEvent::StartFeed { list, .. }
            | ImportEvent::FinishFeed { list, .. }
            | ImportEvent::AddedMovie { list, .. }
            | ImportEvent::RevisionMovie { list, .. } => Some(list),
            ImportEvent::FinishAllFeeds { .. } => None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        match self {
            ImportEvent::StartFeed { run_id, .. }
            | ImportEvent::FinishFeed { run_id, .. }
            | ImportEvent::FinishAllFeeds { run_id, .. }
            | ImportEvent::AddedMovie { run_id, .. }
            | ImportEvent::RevisionMovie { run_id, .. } => *run_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ImportEvent::StartFeed { timestamp, .. }
            | ImportEvent::FinishFeed { timestamp, .. }
            | ImportEvent::FinishAllFeeds { timestamp, .. }
            | ImportEvent::AddedMovie { timestamp, .. }
            | ImportEvent::RevisionMovie { timestamp, .. } => *timestamp,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for in-process observers
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block the importer)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use reel_common::events::{EventBus, ImportEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(ImportEvent::StartFeed {
///     run_id: uuid::Uuid::new_v4(),
///     list: "trending".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ImportEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before the oldest are dropped
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ImportEvent,
    ) -> Result<usize, broadcast::error::SendError<ImportEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ImportEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Channel capacity this bus was created with
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_feed(list: &str) -> ImportEvent {
        ImportEvent::StartFeed {
            run_id: Uuid::new_v4(),
            list: list.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_event_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&EventType::FinishAllFeeds).unwrap();
        assert_eq!(json, "\"FINISH_ALL_FEEDS\"");

        let parsed: EventType = serde_json::from_str("\"ADDED_MOVIE\"").unwrap();
        assert_eq!(parsed, EventType::AddedMovie);
        assert_eq!(EventType::RevisionMovie.to_string(), "REVISION_MOVIE");
    }

    #[test]
    fn test_event_is_tagged_by_type() {
        let value = serde_json::to_value(start_feed("popular")).unwrap();
        assert_eq!(value["type"], "START_FEED");
        assert_eq!(value["list"], "popular");
    }

    #[test]
    fn test_event_accessors() {
        let run_id = Uuid::new_v4();
        let event = ImportEvent::FinishAllFeeds {
            run_id,
            approved: 3,
            added: 2,
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type(), EventType::FinishAllFeeds);
        assert_eq!(event.list(), None);
        assert_eq!(event.run_id(), run_id);
        assert_eq!(start_feed("a").list(), Some("a"));
    }

    #[test]
    fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(10);
        assert!(bus.emit(start_feed("a")).is_err());
        assert_eq!(bus.capacity(), 10);
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit(start_feed("first")).unwrap();
        bus.emit(start_feed("second")).unwrap();

        assert_eq!(rx.recv().await.unwrap().list(), Some("first"));
        assert_eq!(rx.recv().await.unwrap().list(), Some("second"));
    }
}

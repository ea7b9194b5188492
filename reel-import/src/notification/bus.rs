//! Forwards lifecycle events to the in-process `EventBus`, and the log consumer
//! that turns them into structured log lines

use crate::error::ClientError;
use crate::types::NotificationSink;
use reel_common::events::{EventBus, EventType, ImportEvent};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub struct EventBusAgent {
    bus: EventBus,
}

impl EventBusAgent {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

#[async_trait::async_trait]
impl NotificationSink for EventBusAgent {
    fn name(&self) -> &str {
        "event-bus"
    }

    fn subscriptions(&self) -> &[EventType] {
        &[]
    }

    async fn publish(&self, event: &ImportEvent) -> Result<(), ClientError> {
        self.bus.emit_lossy(event.clone());
        Ok(())
    }
}

/// Log every event received from the bus until all senders are dropped
///
/// Returns the number of events logged.
pub async fn run_event_log(mut rx: broadcast::Receiver<ImportEvent>) -> usize {
    debug!("Event log started");
    let mut logged = 0;
    loop {
        match rx.recv().await {
            Ok(event) => {
                log_event(&event);
                logged += 1;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event log lagged, events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!(logged, "Event log stopped");
    logged
}

fn log_event(event: &ImportEvent) {
    let run_id = event.run_id();
    match event {
        ImportEvent::StartFeed { list, .. } => {
            info!(%run_id, list = %list, "Start processing list");
        }
        ImportEvent::FinishFeed {
            list,
            approved,
            added,
            ..
        } => {
            info!(%run_id, list = %list, approved, added, "Finish processing list");
        }
        ImportEvent::FinishAllFeeds {
            approved, added, ..
        } => {
            info!(%run_id, approved, added, "Finish processing all lists");
        }
        ImportEvent::AddedMovie { list, item, .. } => {
            info!(%run_id, list = %list, title = %item.title, year = item.year, imdb = %item.imdb, "Added movie");
        }
        ImportEvent::RevisionMovie { list, item, .. } => {
            info!(%run_id, list = %list, title = %item.title, year = item.year, "Movie needs revision");
        }
    }
}

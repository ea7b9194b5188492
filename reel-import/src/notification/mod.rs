//! Event dispatcher and notification agents
//!
//! The dispatcher fans each lifecycle event out to every registered sink whose
//! subscription list includes the event type. Delivery is sequential and
//! best-effort: a failing sink is logged and the next one still receives the event.

pub mod bus;
pub mod gotify;
pub mod slack;
pub mod webhook;

pub use bus::{run_event_log, EventBusAgent};
pub use gotify::GotifyAgent;
pub use slack::SlackAgent;
pub use webhook::WebhookAgent;

use crate::types::NotificationSink;
use reel_common::events::ImportEvent;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Default, Clone)]
pub struct Dispatcher {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sink: Arc<dyn NotificationSink>) {
        info!(agent = %sink.name(), subscriptions = ?sink.subscriptions(), "Registered notification agent");
        self.sinks.push(sink);
    }

    /// Deliver an event to every subscribed sink, returns the number of successful deliveries
    pub async fn publish(&self, event: &ImportEvent) -> usize {
        let event_type = event.event_type();
        debug!(event = %event_type, agents = self.sinks.len(), "Broadcast event");

        let mut delivered = 0;
        for sink in &self.sinks {
            if !sink.is_subscribed(event_type) {
                continue;
            }
            match sink.publish(event).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(agent = %sink.name(), event = %event_type, error = %e, "Notification delivery failed");
                }
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

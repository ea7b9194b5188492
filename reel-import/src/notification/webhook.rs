//! JSON webhook transport shared by the chat agents

use crate::clients::http::ensure_success;
use crate::error::ClientError;
use reel_common::config::WebhookConfig;
use reel_common::events::EventType;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct WebhookAgent {
    http: reqwest::Client,
    url: String,
    events: Vec<EventType>,
}

impl WebhookAgent {
    pub fn new(http: reqwest::Client, url: impl Into<String>, events: Vec<EventType>) -> Self {
        Self {
            http,
            url: url.into(),
            events,
        }
    }

    /// Validate the webhook URL from configuration
    pub fn from_config(http: reqwest::Client, config: &WebhookConfig) -> Result<Self, ClientError> {
        reqwest::Url::parse(&config.webhook).map_err(|e| {
            ClientError::Config(format!("Invalid webhook url {:?}: {}", config.webhook, e))
        })?;
        Ok(Self::new(http, config.webhook.clone(), config.events.clone()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn events(&self) -> &[EventType] {
        &self.events
    }

    /// POST a JSON body; non-2xx responses become `ClientError::Api`
    pub async fn send<T: Serialize + ?Sized>(&self, body: &T) -> Result<(), ClientError> {
        let response = self.http.post(&self.url).json(body).send().await?;
        ensure_success(response).await?;
        debug!(url = %self.url, "Webhook delivered");
        Ok(())
    }
}

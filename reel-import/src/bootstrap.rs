//! Process wiring: configuration → collaborators → `Importer`

use crate::clients::http::build_client;
use crate::clients::{GuessItClient, OmdbClient, RadarrClient, TraktClient};
use crate::dedup::DedupCache;
use crate::importer::Importer;
use crate::notification::{Dispatcher, EventBusAgent, GotifyAgent, SlackAgent, WebhookAgent};
use crate::registry::SourceRegistry;
use crate::rules::RuleValidator;
use crate::sources::{ImdbSource, RssSource, TraktSource};
use crate::types::{Enricher, MovieSink, NoopEnricher};
use anyhow::{Context, Result};
use reel_common::config::{ListType, NotificationsConfig, ServicesConfig, TomlConfig};
use reel_common::events::EventBus;
use std::sync::Arc;
use tracing::{info, warn};

/// Connect every configured service and build the importer
///
/// The movie sink is required; everything else is optional.
pub async fn build_importer(config: &TomlConfig, bus: EventBus) -> Result<Importer> {
    let http = build_client(&config.services.http).context("Failed to build HTTP client")?;

    let radarr_config = config
        .services
        .radarr
        .as_ref()
        .context("services.radarr is not configured")?;
    let radarr = RadarrClient::connect(http.clone(), radarr_config)
        .await
        .context("Failed to connect to Radarr")?;
    let sink: Arc<dyn MovieSink> = Arc::new(radarr);

    let enricher = build_enricher(http.clone(), &config.services)?;
    let registry = build_registry(http.clone(), &config.services)?;
    let dispatcher = build_dispatcher(http, &config.notifications, bus)?;

    let cache = DedupCache::warm(sink.as_ref()).await;

    info!(
        lists = config.importer.lists.len(),
        sources = ?registry.tags(),
        agents = dispatcher.len(),
        revision = config.importer.revision,
        "Importer ready"
    );

    Ok(Importer::new(
        config.importer.clone(),
        registry,
        enricher,
        sink,
        dispatcher,
        cache,
    ))
}

fn build_enricher(http: reqwest::Client, services: &ServicesConfig) -> Result<Arc<dyn Enricher>> {
    match &services.omdb {
        Some(omdb) => {
            let client = OmdbClient::new(http, omdb).context("Invalid OMDb configuration")?;
            info!("OMDb enrichment enabled");
            Ok(Arc::new(client))
        }
        None => {
            warn!("OMDb not configured, items will not be enriched");
            Ok(Arc::new(NoopEnricher))
        }
    }
}

/// Register a source for every list type that can be served
pub fn build_registry(http: reqwest::Client, services: &ServicesConfig) -> Result<SourceRegistry> {
    let mut registry = SourceRegistry::new();

    let guessit = match &services.guessit {
        Some(config) => {
            let client = GuessItClient::new(http.clone(), config)
                .context("Invalid GuessIt configuration")?;
            info!(mode = ?client.mode(), "Title guessing enabled");
            Some(Arc::new(client))
        }
        None => None,
    };
    registry.register(ListType::RSS, Arc::new(RssSource::new(http.clone(), guessit)));

    let imdb = ImdbSource::new(http.clone()).context("Failed to build IMDb source")?;
    registry.register(ListType::IMDB, Arc::new(imdb));

    match &services.trakt {
        Some(trakt) => {
            let client = TraktClient::new(http, trakt).context("Invalid Trakt configuration")?;
            let source =
                TraktSource::new(Arc::new(client)).context("Failed to build Trakt source")?;
            registry.register(ListType::TRAKT, Arc::new(source));
        }
        None => warn!("Trakt not configured, trakt lists will be skipped"),
    }

    Ok(registry)
}

/// Webhook agents from configuration plus the in-process bus agent
pub fn build_dispatcher(
    http: reqwest::Client,
    notifications: &NotificationsConfig,
    bus: EventBus,
) -> Result<Dispatcher> {
    let mut dispatcher = Dispatcher::new();

    if let Some(gotify) = &notifications.gotify {
        let webhook = WebhookAgent::from_config(http.clone(), gotify)
            .context("Invalid Gotify configuration")?;
        dispatcher.register(Arc::new(GotifyAgent::new(webhook)));
    }
    if let Some(slack) = &notifications.slack {
        let webhook =
            WebhookAgent::from_config(http, slack).context("Invalid Slack configuration")?;
        dispatcher.register(Arc::new(SlackAgent::new(webhook)));
    }
    dispatcher.register(Arc::new(EventBusAgent::new(bus)));

    Ok(dispatcher)
}

/// Offline validation result for one list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCheck {
    pub list: String,
    pub error: Option<String>,
}

/// Compile every list's merged rule sets and check that its type has a source
///
/// Sources are built from the service configuration exactly as an import would,
/// without contacting any service.
pub fn check_lists(config: &TomlConfig) -> Result<Vec<ListCheck>> {
    let http = build_client(&config.services.http).context("Failed to build HTTP client")?;
    let registry = build_registry(http, &config.services)?;

    Ok(config
        .importer
        .resolved_lists()
        .into_iter()
        .map(|(name, list)| {
            let error = if !registry.contains(&list.list_type) {
                Some(missing_source(&list.list_type))
            } else {
                RuleValidator::from_filter(&list.filter)
                    .err()
                    .map(|e| e.to_string())
            };
            ListCheck { list: name, error }
        })
        .collect())
}

fn missing_source(list_type: &ListType) -> String {
    match list_type.as_str() {
        ListType::TRAKT => "trakt lists need [services.trakt] to be configured".to_string(),
        other => format!("unsupported list type {:?}", other),
    }
}

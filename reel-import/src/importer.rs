//! Import pipeline
//!
//! Per item:
//! new → dedup check → {already processed | already added | excluded | candidate}
//! candidate → enrich → exclusion rules → {approved | rejected}
//! approved → sink lookup → add → {added | lookup failed | add failed}
//! rejected → revision rules (revision mode only) → {flagged for revision | rejected}
//!
//! Lists run sequentially in name order. Every list gets a START_FEED and a FINISH_FEED
//! event, even when it fails before its first item.

use crate::dedup::{DedupCache, DedupStatus};
use crate::error::{ClientError, ImportError};
use crate::notification::Dispatcher;
use crate::registry::SourceRegistry;
use crate::rules::RuleValidator;
use crate::types::{Enricher, MovieSink};
use chrono::{DateTime, Utc};
use reel_common::config::{ImporterConfig, ListConfig};
use reel_common::events::ImportEvent;
use reel_common::models::tmdb_key;
use reel_common::ListItem;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Terminal state of one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemOutcome {
    AlreadyProcessed,
    AlreadyAdded,
    Excluded,
    Rejected,
    FlaggedForRevision,
    Added,
    LookupFailed,
    AddFailed,
}

impl ItemOutcome {
    /// Outcomes reached only after every exclusion rule evaluated false
    pub fn is_approved(self) -> bool {
        matches!(
            self,
            ItemOutcome::Added | ItemOutcome::LookupFailed | ItemOutcome::AddFailed
        )
    }
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemOutcome::AlreadyProcessed => "already_processed",
            ItemOutcome::AlreadyAdded => "already_added",
            ItemOutcome::Excluded => "excluded",
            ItemOutcome::Rejected => "rejected",
            ItemOutcome::FlaggedForRevision => "flagged_for_revision",
            ItemOutcome::Added => "added",
            ItemOutcome::LookupFailed => "lookup_failed",
            ItemOutcome::AddFailed => "add_failed",
        };
        f.write_str(name)
    }
}

/// Result of processing one list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListSummary {
    pub list: String,
    /// Items that passed the exclusion rules
    pub approved: usize,
    /// Items persisted to the sink
    pub added: usize,
    pub outcomes: BTreeMap<ItemOutcome, usize>,
    /// Set when the list was aborted (unknown source, invalid rule, fetch failure)
    pub failure: Option<String>,
}

impl ListSummary {
    fn new(list: &str) -> Self {
        Self {
            list: list.to_string(),
            ..Default::default()
        }
    }

    fn record(&mut self, outcome: ItemOutcome) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        if outcome.is_approved() {
            self.approved += 1;
        }
        if outcome == ItemOutcome::Added {
            self.added += 1;
        }
    }

    pub fn count(&self, outcome: ItemOutcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Number of items that reached a terminal state
    pub fn processed(&self) -> usize {
        self.outcomes.values().sum()
    }
}

/// Result of one invocation over every configured list
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub approved: usize,
    pub added: usize,
    pub lists: Vec<ListSummary>,
}

impl RunSummary {
    pub fn failed_lists(&self) -> impl Iterator<Item = &ListSummary> {
        self.lists.iter().filter(|list| list.failure.is_some())
    }
}

/// Source of the current instant passed to `Now()` in rules
pub type Clock = fn() -> DateTime<Utc>;

/// Import pipeline
///
/// Owns the dedup cache; `added` and `excluded` persist across runs, `processed` is
/// reset at the start of each run.
pub struct Importer {
    config: ImporterConfig,
    registry: SourceRegistry,
    enricher: Arc<dyn Enricher>,
    sink: Arc<dyn MovieSink>,
    dispatcher: Dispatcher,
    cache: DedupCache,
    clock: Clock,
}

impl Importer {
    pub fn new(
        config: ImporterConfig,
        registry: SourceRegistry,
        enricher: Arc<dyn Enricher>,
        sink: Arc<dyn MovieSink>,
        dispatcher: Dispatcher,
        cache: DedupCache,
    ) -> Self {
        Self {
            config,
            registry,
            enricher,
            sink,
            dispatcher,
            cache,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    pub fn cache(&self) -> &DedupCache {
        &self.cache
    }

    /// Process every configured list, then emit FINISH_ALL_FEEDS
    pub async fn process_lists(&mut self) -> RunSummary {
        let run_id = Uuid::new_v4();
        self.cache.reset_processed();

        let lists = self.config.resolved_lists();
        info!(run_id = %run_id, lists = lists.len(), "Starting import run");

        let mut summaries = Vec::with_capacity(lists.len());
        for (name, list) in &lists {
            summaries.push(self.run_list(run_id, name, list).await);
        }

        let approved = summaries.iter().map(|s| s.approved).sum();
        let added = summaries.iter().map(|s| s.added).sum();

        self.dispatcher
            .publish(&ImportEvent::FinishAllFeeds {
                run_id,
                approved,
                added,
                timestamp: Utc::now(),
            })
            .await;

        info!(run_id = %run_id, approved, added, "Import run finished");
        RunSummary {
            run_id,
            approved,
            added,
            lists: summaries,
        }
    }

    /// Process a single list by case-insensitive name
    pub async fn process_list(&mut self, name: &str) -> Result<ListSummary, ImportError> {
        let (name, list) = self
            .config
            .find_list(name)
            .ok_or_else(|| ImportError::UnknownList(name.to_string()))?;

        let run_id = Uuid::new_v4();
        self.cache.reset_processed();
        Ok(self.run_list(run_id, &name, &list).await)
    }

    async fn run_list(&mut self, run_id: Uuid, name: &str, list: &ListConfig) -> ListSummary {
        self.dispatcher
            .publish(&ImportEvent::StartFeed {
                run_id,
                list: name.to_string(),
                timestamp: Utc::now(),
            })
            .await;

        let mut summary = ListSummary::new(name);
        if let Err(e) = self.import_items(run_id, name, list, &mut summary).await {
            error!(list = %name, error = %e, "List processing aborted");
            summary.failure = Some(e.to_string());
        }

        info!(
            list = %name,
            approved = summary.approved,
            added = summary.added,
            processed = summary.processed(),
            "Finished processing list"
        );

        self.dispatcher
            .publish(&ImportEvent::FinishFeed {
                run_id,
                list: name.to_string(),
                approved: summary.approved,
                added: summary.added,
                timestamp: Utc::now(),
            })
            .await;

        summary
    }

    async fn import_items(
        &mut self,
        run_id: Uuid,
        name: &str,
        list: &ListConfig,
        summary: &mut ListSummary,
    ) -> Result<(), ImportError> {
        let source = self
            .registry
            .get(&list.list_type)
            .ok_or_else(|| ImportError::UnknownSource(list.list_type.to_string()))?;

        // Every rule must compile before any item is looked at
        let validator = RuleValidator::from_filter(&list.filter)?;

        info!(list = %name, source = source.name(), url = %list.url, "Fetching list");
        let mut items = source.fetch(list).await.map_err(ImportError::Fetch)?;

        let limit = list.limit();
        if items.len() > limit {
            debug!(list = %name, fetched = items.len(), limit, "Truncating list to limit");
            items.truncate(limit);
        }

        let now = (self.clock)();
        for item in items {
            let outcome = self.process_item(run_id, name, item, &validator, now).await;
            summary.record(outcome);
        }
        Ok(())
    }

    async fn process_item(
        &mut self,
        run_id: Uuid,
        name: &str,
        mut item: ListItem,
        validator: &RuleValidator,
        now: DateTime<Utc>,
    ) -> ItemOutcome {
        match self.cache.classify(&item) {
            DedupStatus::AlreadyProcessed => {
                debug!(list = %name, item = %item.label(), "Already processed in this run");
                return ItemOutcome::AlreadyProcessed;
            }
            DedupStatus::AlreadyAdded => {
                debug!(list = %name, item = %item.label(), "Already in library");
                return ItemOutcome::AlreadyAdded;
            }
            DedupStatus::Excluded => {
                debug!(list = %name, item = %item.label(), "Excluded by sink");
                return ItemOutcome::Excluded;
            }
            DedupStatus::Fresh => {}
        }
        self.cache.mark_processed(&item);

        let had_imdb = !item.imdb.is_empty();
        match self.enricher.enrich(&item).await {
            Ok(enrichment) => item.apply_enrichment(enrichment),
            Err(ClientError::NotFound(message)) => {
                debug!(list = %name, item = %item.label(), reason = %message, "No enrichment found");
            }
            Err(e) => {
                warn!(list = %name, item = %item.label(), error = %e, "Enrichment failed");
            }
        }

        if !had_imdb && !item.imdb.is_empty() {
            match self.cache.key_status(&item.imdb) {
                DedupStatus::AlreadyProcessed => {
                    debug!(list = %name, imdb = %item.imdb, "Already processed in this run");
                    return ItemOutcome::AlreadyProcessed;
                }
                DedupStatus::AlreadyAdded => {
                    debug!(list = %name, imdb = %item.imdb, "Already in library");
                    return ItemOutcome::AlreadyAdded;
                }
                _ => self.cache.mark_processed(&item),
            }
        }

        if validator.is_approved(&item, now) {
            self.add_item(run_id, name, item).await
        } else if self.config.revision && validator.is_for_revision(&item, now) {
            let movie = match self.sink.lookup(&item).await {
                Ok(movie) => Some(movie),
                Err(e) => {
                    debug!(list = %name, item = %item.label(), error = %e, "Revision lookup failed");
                    None
                }
            };
            info!(list = %name, item = %item.label(), "Flagged for revision");
            self.dispatcher
                .publish(&ImportEvent::RevisionMovie {
                    run_id,
                    list: name.to_string(),
                    item,
                    movie,
                    timestamp: Utc::now(),
                })
                .await;
            ItemOutcome::FlaggedForRevision
        } else {
            debug!(list = %name, item = %item.label(), "Rejected by exclusion rules");
            ItemOutcome::Rejected
        }
    }

    async fn add_item(&mut self, run_id: Uuid, name: &str, item: ListItem) -> ItemOutcome {
        let movie = match self.sink.lookup(&item).await {
            Ok(movie) => movie,
            Err(e) => {
                warn!(list = %name, item = %item.label(), error = %e, "Movie lookup failed");
                return ItemOutcome::LookupFailed;
            }
        };

        if let Err(e) = self.sink.add(&movie).await {
            warn!(list = %name, item = %item.label(), error = %e, "Adding movie failed");
            return ItemOutcome::AddFailed;
        }

        self.cache.mark_added(&item);
        if !movie.imdb_id.is_empty() {
            self.cache.insert_added(movie.imdb_id.clone());
        }
        if movie.tmdb_id > 0 {
            self.cache.insert_added(tmdb_key(movie.tmdb_id));
        }

        info!(list = %name, title = %movie.title, year = movie.year, "Added movie");
        self.dispatcher
            .publish(&ImportEvent::AddedMovie {
                run_id,
                list: name.to_string(),
                item,
                movie,
                timestamp: Utc::now(),
            })
            .await;
        ItemOutcome::Added
    }
}

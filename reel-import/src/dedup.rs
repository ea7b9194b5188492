//! Dedup cache
//!
//! Three membership sets keyed by identity strings:
//! - `added`: in the sink's library (warmed from the sink, appended on every add)
//! - `excluded`: blacklisted by the sink operator (`title:` and `tmdb:` keys)
//! - `processed`: seen during the current run, reset at the start of every run
//!
//! The cache only grows for the lifetime of the process.

use crate::types::MovieSink;
use reel_common::models::{title_key, tmdb_key};
use reel_common::ListItem;
use std::collections::HashSet;
use tracing::{info, warn};

/// Dedup decision for one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupStatus {
    Fresh,
    AlreadyProcessed,
    AlreadyAdded,
    Excluded,
}

#[derive(Debug, Default)]
pub struct DedupCache {
    added: HashSet<String>,
    excluded: HashSet<String>,
    processed: HashSet<String>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache pre-populated with known library and blacklist keys
    pub fn with_known(
        added: impl IntoIterator<Item = String>,
        excluded: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            added: added.into_iter().collect(),
            excluded: excluded.into_iter().collect(),
            processed: HashSet::new(),
        }
    }

    /// Build the cache from the sink's inventory and blacklist
    ///
    /// A failed query leaves that set empty; startup continues.
    pub async fn warm(sink: &dyn MovieSink) -> Self {
        let added = match sink.list_existing().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Could not load existing movies, starting with empty cache");
                Vec::new()
            }
        };
        let excluded = match sink.list_excluded().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Could not load exclusions, starting with empty cache");
                Vec::new()
            }
        };

        let cache = Self::with_known(added, excluded);
        info!(
            added = cache.added.len(),
            excluded = cache.excluded.len(),
            "Dedup cache warmed"
        );
        cache
    }

    /// Classify an item: processed, then added, then excluded
    pub fn classify(&self, item: &ListItem) -> DedupStatus {
        let keys = lookup_keys(item);
        if keys.iter().any(|key| self.processed.contains(key)) {
            DedupStatus::AlreadyProcessed
        } else if keys.iter().any(|key| self.added.contains(key)) {
            DedupStatus::AlreadyAdded
        } else if self.is_excluded(item) {
            DedupStatus::Excluded
        } else {
            DedupStatus::Fresh
        }
    }

    /// Duplicate check for a single identity key (excluded keys are not consulted)
    pub fn key_status(&self, key: &str) -> DedupStatus {
        if self.processed.contains(key) {
            DedupStatus::AlreadyProcessed
        } else if self.added.contains(key) {
            DedupStatus::AlreadyAdded
        } else {
            DedupStatus::Fresh
        }
    }

    fn is_excluded(&self, item: &ListItem) -> bool {
        if item.tmdb > 0 && self.excluded.contains(&tmdb_key(item.tmdb)) {
            return true;
        }
        !item.title.is_empty() && self.excluded.contains(&title_key(&item.title))
    }

    /// Record every identity of the item as seen in this run
    pub fn mark_processed(&mut self, item: &ListItem) {
        self.processed.extend(lookup_keys(item));
    }

    /// Record every identity of the item as present in the sink
    pub fn mark_added(&mut self, item: &ListItem) {
        self.added.extend(lookup_keys(item));
    }

    pub fn insert_added(&mut self, key: impl Into<String>) {
        self.added.insert(key.into());
    }

    /// Start of a new run
    pub fn reset_processed(&mut self) {
        self.processed.clear();
    }

    pub fn added_len(&self) -> usize {
        self.added.len()
    }

    pub fn excluded_len(&self) -> usize {
        self.excluded.len()
    }

    pub fn processed_len(&self) -> usize {
        self.processed.len()
    }
}

/// Identity key plus whichever catalog ids the item carries
fn lookup_keys(item: &ListItem) -> Vec<String> {
    let mut keys = vec![item.identity_key()];
    if !item.imdb.is_empty() && keys[0] != item.imdb {
        keys.push(item.imdb.clone());
    }
    if item.tmdb > 0 {
        let key = tmdb_key(item.tmdb);
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use reel_common::MovieCandidate;

    struct FailingSink;

    #[async_trait::async_trait]
    impl MovieSink for FailingSink {
        async fn list_existing(&self) -> Result<Vec<String>, ClientError> {
            Err(ClientError::Network("connection refused".to_string()))
        }
        async fn list_excluded(&self) -> Result<Vec<String>, ClientError> {
            Ok(vec!["title:cats".to_string()])
        }
        async fn lookup(&self, item: &ListItem) -> Result<MovieCandidate, ClientError> {
            Err(ClientError::NotFound(item.label()))
        }
        async fn add(&self, _movie: &MovieCandidate) -> Result<(), ClientError> {
            Ok(())
        }
    }

    #[test]
    fn test_fresh_item() {
        let cache = DedupCache::new();
        assert_eq!(
            cache.classify(&ListItem::new("Arrival", 2016)),
            DedupStatus::Fresh
        );
    }

    #[test]
    fn test_added_by_primary_or_secondary_id() {
        let cache = DedupCache::with_known(
            vec!["tt2543164".to_string(), "tmdb:438631".to_string()],
            Vec::new(),
        );
        let by_imdb = ListItem::new("Arrival", 2016).with_imdb("tt2543164");
        let by_tmdb = ListItem::new("Dune", 2021).with_tmdb(438631);
        let both = ListItem::new("Dune", 2021)
            .with_imdb("tt1160419")
            .with_tmdb(438631);

        assert_eq!(cache.classify(&by_imdb), DedupStatus::AlreadyAdded);
        assert_eq!(cache.classify(&by_tmdb), DedupStatus::AlreadyAdded);
        assert_eq!(cache.classify(&both), DedupStatus::AlreadyAdded);
    }

    #[test]
    fn test_excluded_by_title_or_tmdb() {
        let cache = DedupCache::with_known(
            Vec::new(),
            vec!["title:cats".to_string(), "tmdb:536869".to_string()],
        );
        assert_eq!(
            cache.classify(&ListItem::new("Cats", 2019)),
            DedupStatus::Excluded
        );
        assert_eq!(
            cache.classify(&ListItem::new("Cats (Remastered)", 2019).with_tmdb(536869)),
            DedupStatus::Excluded
        );
    }

    #[test]
    fn test_processed_takes_priority() {
        let mut cache = DedupCache::with_known(vec!["tt2543164".to_string()], Vec::new());
        let item = ListItem::new("Arrival", 2016).with_imdb("tt2543164");

        assert_eq!(cache.classify(&item), DedupStatus::AlreadyAdded);
        cache.mark_processed(&item);
        assert_eq!(cache.classify(&item), DedupStatus::AlreadyProcessed);

        cache.reset_processed();
        assert_eq!(cache.processed_len(), 0);
        assert_eq!(cache.classify(&item), DedupStatus::AlreadyAdded);
    }

    #[test]
    fn test_added_survives_reset() {
        let mut cache = DedupCache::new();
        let item = ListItem::new("Heat", 1995).with_tmdb(949);
        cache.mark_added(&item);
        cache.reset_processed();
        assert_eq!(cache.classify(&item), DedupStatus::AlreadyAdded);
        assert_eq!(cache.added_len(), 1);
    }

    #[test]
    fn test_key_status() {
        let mut cache = DedupCache::with_known(vec!["tt2543164".to_string()], Vec::new());
        cache.mark_processed(&ListItem::new("Heat", 1995).with_imdb("tt0113277"));

        assert_eq!(cache.key_status("tt2543164"), DedupStatus::AlreadyAdded);
        assert_eq!(cache.key_status("tt0113277"), DedupStatus::AlreadyProcessed);
        assert_eq!(cache.key_status("tt1160419"), DedupStatus::Fresh);
    }

    #[tokio::test]
    async fn test_warm_is_best_effort() {
        let cache = DedupCache::warm(&FailingSink).await;
        assert_eq!(cache.added_len(), 0);
        assert_eq!(cache.excluded_len(), 1);
    }
}

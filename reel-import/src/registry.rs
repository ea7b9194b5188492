//! Source registry: list type tag → `ListSource`

use crate::types::ListSource;
use reel_common::config::ListType;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Lookup table populated at startup and read-only afterwards
#[derive(Default, Clone)]
pub struct SourceRegistry {
    sources: HashMap<ListType, Arc<dyn ListSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source for a tag, replacing any previous registration
    pub fn register(&mut self, tag: impl AsRef<str>, source: Arc<dyn ListSource>) {
        let tag = ListType::new(tag);
        debug!(list_type = %tag, source = source.name(), "Registered list source");
        self.sources.insert(tag, source);
    }

    pub fn get(&self, tag: &ListType) -> Option<Arc<dyn ListSource>> {
        self.sources.get(tag).cloned()
    }

    pub fn contains(&self, tag: &ListType) -> bool {
        self.sources.contains_key(tag)
    }

    /// Registered tags in sorted order
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.sources.keys().map(|t| t.as_str().to_string()).collect();
        tags.sort();
        tags
    }
}

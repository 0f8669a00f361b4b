use std::sync::{Arc, OnceLock};
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::topic::Topic;

/// Name → topic mapping with atomic get-or-create.
///
/// The registry owns its topics; agents only ever hold them through `Arc`.
/// Enumeration follows creation order so snapshots and graph renderings stay
/// stable across calls.
pub struct TopicRegistry {
    topics: DashMap<String, Arc<Topic>>,
    order: RwLock<Vec<String>>,
    last_clear: RwLock<Option<Instant>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self {
            topics: DashMap::new(),
            order: RwLock::new(Vec::new()),
            last_clear: RwLock::new(None),
        }
    }

    /// Return the topic with this name, creating it on first lookup.
    /// Concurrent callers racing on the same name get the same instance.
    pub async fn get(&self, name: &str) -> Arc<Topic> {
        if let Some(existing) = self.topics.get(name) {
            return Arc::clone(existing.value());
        }

        let mut order = self.order.write().await;
        // Re-check: another task may have created it while we waited.
        if let Some(existing) = self.topics.get(name) {
            return Arc::clone(existing.value());
        }
        let topic = Arc::new(Topic::new(name));
        self.topics.insert(name.to_string(), Arc::clone(&topic));
        order.push(name.to_string());
        debug!(topic = %name, "created topic");
        topic
    }

    /// Non-creating lookup, used by external publish paths.
    pub fn lookup(&self, name: &str) -> Option<Arc<Topic>> {
        self.topics.get(name).map(|t| Arc::clone(t.value()))
    }

    /// Snapshot of every topic in creation order.
    pub async fn topics(&self) -> Vec<Arc<Topic>> {
        let order = self.order.read().await;
        order.iter().filter_map(|name| self.lookup(name)).collect()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Clear every topic's subscriber/publisher sets and last message, then
    /// drop all topics. Back-references from topics to agents are gone once
    /// this returns; publishes racing the clear may be silently dropped.
    pub async fn clear(&self) {
        let mut order = self.order.write().await;
        let snapshot: Vec<Arc<Topic>> = self
            .topics
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for topic in &snapshot {
            topic.clear_all().await;
        }
        self.topics.clear();
        order.clear();
        *self.last_clear.write().await = Some(Instant::now());
        info!(topics = snapshot.len(), "registry cleared");
    }

    /// Monotonic instant of the most recent clear, if any.
    pub async fn last_clear_time(&self) -> Option<Instant> {
        *self.last_clear.read().await
    }
}

impl Default for TopicRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide default registry for call sites that must stay implicit.
/// Explicitly-constructed registries remain the norm for tests and embedding.
pub fn default_registry() -> Arc<TopicRegistry> {
    static DEFAULT: OnceLock<Arc<TopicRegistry>> = OnceLock::new();
    Arc::clone(DEFAULT.get_or_init(|| Arc::new(TopicRegistry::new())))
}

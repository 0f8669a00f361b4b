use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::agent::{Agent, AgentRef};
use crate::message::Message;

/// Per-topic traffic counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TopicStats {
    pub published: u64,
    pub delivered: u64,
}

/// Named channel between publishing and subscribing agents.
///
/// The topic does not own its agents: subscriber and publisher entries are
/// weak back-references, dropped wholesale by a registry clear. Publishing
/// snapshots the subscriber list before iterating, so a subscribe that races
/// a publish is observed by the next publish, not the current one.
pub struct Topic {
    name: String,
    subs: RwLock<Vec<Weak<dyn Agent>>>,
    pubs: RwLock<Vec<Weak<dyn Agent>>>,
    last: RwLock<Option<Message>>,
    published: AtomicU64,
    delivered: AtomicU64,
}

impl Topic {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subs: RwLock::new(Vec::new()),
            pubs: RwLock::new(Vec::new()),
            last: RwLock::new(None),
            published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add-if-absent by agent identity. Duplicate subscribes are no-ops.
    pub async fn subscribe(&self, agent: &AgentRef) {
        add_if_absent(&self.subs, agent).await;
        debug!(topic = %self.name, agent = %agent.name(), "subscribed");
    }

    pub async fn unsubscribe(&self, agent: &AgentRef) {
        remove(&self.subs, agent).await;
    }

    pub async fn add_publisher(&self, agent: &AgentRef) {
        add_if_absent(&self.pubs, agent).await;
        debug!(topic = %self.name, agent = %agent.name(), "registered publisher");
    }

    pub async fn remove_publisher(&self, agent: &AgentRef) {
        remove(&self.pubs, agent).await;
    }

    /// Record the message as the topic's last value, then deliver it to
    /// every current subscriber. Delivery order is the subscription order of
    /// the snapshot taken at the start of the call.
    pub async fn publish(&self, msg: Message) {
        *self.last.write().await = Some(msg.clone());
        self.published.fetch_add(1, Ordering::Relaxed);

        let subs = self.subs.read().await.clone();
        debug!(topic = %self.name, subscribers = subs.len(), value = %msg.text(), "publish");
        for entry in &subs {
            if let Some(agent) = entry.upgrade() {
                agent.on_message(&self.name, msg.clone()).await;
                self.delivered.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub async fn last_message(&self) -> Option<Message> {
        self.last.read().await.clone()
    }

    /// Text of the last value, or `"N/A"` when nothing was published yet.
    pub async fn last_value_text(&self) -> String {
        match self.last.read().await.as_ref() {
            Some(msg) => msg.text().to_string(),
            None => "N/A".to_string(),
        }
    }

    pub async fn subscriber_names(&self) -> Vec<String> {
        live_names(&self.subs).await
    }

    pub async fn publisher_names(&self) -> Vec<String> {
        live_names(&self.pubs).await
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subs
            .read()
            .await
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    pub async fn publisher_count(&self) -> usize {
        self.pubs
            .read()
            .await
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    pub async fn has_subscribers(&self) -> bool {
        self.subscriber_count().await > 0
    }

    pub async fn has_publishers(&self) -> bool {
        self.publisher_count().await > 0
    }

    pub fn stats(&self) -> TopicStats {
        TopicStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
        }
    }

    /// Drop subscribers, publishers, and the last message.
    pub async fn clear_all(&self) {
        self.subs.write().await.clear();
        self.pubs.write().await.clear();
        *self.last.write().await = None;
    }
}

async fn add_if_absent(list: &RwLock<Vec<Weak<dyn Agent>>>, agent: &AgentRef) {
    let candidate = Arc::downgrade(agent);
    let mut entries = list.write().await;
    entries.retain(|w| w.strong_count() > 0);
    if !entries.iter().any(|w| Weak::ptr_eq(w, &candidate)) {
        entries.push(candidate);
    }
}

async fn remove(list: &RwLock<Vec<Weak<dyn Agent>>>, agent: &AgentRef) {
    let candidate = Arc::downgrade(agent);
    list.write()
        .await
        .retain(|w| w.strong_count() > 0 && !Weak::ptr_eq(w, &candidate));
}

async fn live_names(list: &RwLock<Vec<Weak<dyn Agent>>>) -> Vec<String> {
    list.read()
        .await
        .iter()
        .filter_map(|w| w.upgrade())
        .map(|a| a.name().to_string())
        .collect()
}

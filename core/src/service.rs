use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::PipelineLoader;
use crate::graph::Graph;
use crate::message::Message;
use crate::registry::TopicRegistry;
use crate::topic::TopicStats;
use crate::{CascadeError, Result};

/// Where uploaded pipeline definitions are kept between loads.
const CONFIG_DIR: &str = "config_files";

/// How a topic sits in the graph, seen from outside the fabric.
///
/// Only roles without managing publishers accept external publishes; the
/// rest belong to agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopicRole {
    InputOnly,
    OutputOnly,
    Intermediate,
    Inactive,
}

impl TopicRole {
    pub fn classify(has_subscribers: bool, has_publishers: bool) -> Self {
        match (has_subscribers, has_publishers) {
            (true, false) => TopicRole::InputOnly,
            (false, true) => TopicRole::OutputOnly,
            (true, true) => TopicRole::Intermediate,
            (false, false) => TopicRole::Inactive,
        }
    }

    pub fn accepts_external_publish(self) -> bool {
        matches!(self, TopicRole::InputOnly | TopicRole::Inactive)
    }
}

impl fmt::Display for TopicRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TopicRole::InputOnly => "input-only",
            TopicRole::OutputOnly => "output-only",
            TopicRole::Intermediate => "intermediate",
            TopicRole::Inactive => "inactive",
        };
        f.write_str(text)
    }
}

/// One row of the topic table handed to transport collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicInfo {
    pub name: String,
    pub last_value: String,
    pub subscribers: Vec<String>,
    pub publishers: Vec<String>,
    pub role: TopicRole,
    pub stats: TopicStats,
}

/// The runtime surface exposed to transport collaborators: load a
/// configuration, inject values into input topics, and read back topic and
/// graph snapshots. The transport owns user-visible failure behaviour; this
/// type returns structured errors.
pub struct Runtime {
    registry: Arc<TopicRegistry>,
    active: Mutex<Option<PipelineLoader>>,
    config_dir: PathBuf,
}

impl Runtime {
    pub fn new(registry: Arc<TopicRegistry>) -> Self {
        Self::with_config_dir(registry, CONFIG_DIR)
    }

    pub fn with_config_dir(registry: Arc<TopicRegistry>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            active: Mutex::new(None),
            config_dir: config_dir.into(),
        }
    }

    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    /// Persist an uploaded pipeline definition; a same-named file is
    /// overwritten. Nothing else is ever written to disk.
    pub async fn save_config(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.config_dir).await?;
        let path = self.config_dir.join(file_name);
        tokio::fs::write(&path, contents).await?;
        info!(path = %path.display(), bytes = contents.len(), "configuration saved");
        Ok(path)
    }

    /// Replace the active configuration.
    ///
    /// The registry is cleared first so every topic→agent back-reference is
    /// gone before the previous generation of agents is closed; only then is
    /// the new pipeline instantiated. On a parse or I/O failure the call
    /// aborts, keeping whatever the new loader had already created.
    pub async fn load_config(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut active = self.active.lock().await;

        self.registry.clear().await;
        if let Some(mut previous) = active.take() {
            previous.close().await;
        }

        let mut loader = PipelineLoader::new(path.as_ref(), Arc::clone(&self.registry));
        let created = loader.create().await;
        *active = Some(loader);
        created
    }

    /// Inject an external value into an input topic. The topic must already
    /// exist, and topics managed by agents are rejected.
    pub async fn publish(&self, topic: &str, value: &str) -> Result<()> {
        let Some(target) = self.registry.lookup(topic) else {
            return Err(CascadeError::TopicNotFound(topic.to_string()));
        };

        let role = TopicRole::classify(
            target.has_subscribers().await,
            target.has_publishers().await,
        );
        if !role.accepts_external_publish() {
            warn!(topic, %role, "rejecting external publish to protected topic");
            return Err(CascadeError::ProtectedTopic {
                topic: topic.to_string(),
                role,
            });
        }

        target.publish(Message::from_text(value)).await;
        Ok(())
    }

    /// Current value and wiring of every topic, in creation order.
    pub async fn topic_snapshot(&self) -> Vec<TopicInfo> {
        let mut rows = Vec::new();
        for topic in self.registry.topics().await {
            let subscribers = topic.subscriber_names().await;
            let publishers = topic.publisher_names().await;
            let role = TopicRole::classify(!subscribers.is_empty(), !publishers.is_empty());
            rows.push(TopicInfo {
                name: topic.name().to_string(),
                last_value: topic.last_value_text().await,
                subscribers,
                publishers,
                role,
                stats: topic.stats(),
            });
        }
        rows
    }

    pub async fn graph_snapshot(&self) -> Graph {
        Graph::from_registry(&self.registry).await
    }

    /// Seconds since the registry was last cleared, for "recently updated"
    /// hints. `None` before the first clear.
    pub async fn seconds_since_clear(&self) -> Option<u64> {
        self.registry
            .last_clear_time()
            .await
            .map(|instant| instant.elapsed().as_secs())
    }

    /// Close the active pipeline and clear the fabric.
    pub async fn shutdown(&self) {
        let mut active = self.active.lock().await;
        self.registry.clear().await;
        if let Some(mut previous) = active.take() {
            previous.close().await;
        }
        info!("runtime shut down");
    }
}

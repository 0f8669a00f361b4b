// Cascade core library
// Dataflow computation fabric: topics, operator agents, parallel execution

pub mod agent;
pub mod config;
pub mod graph;
pub mod message;
pub mod registry;
pub mod service;
pub mod topic;

// Export core types
pub use agent::{Agent, AgentRef, OpAgent, OpKind, ParallelAgent};
pub use config::PipelineLoader;
pub use graph::{Graph, GraphNode, NodeKind};
pub use message::Message;
pub use registry::{default_registry, TopicRegistry};
pub use service::{Runtime, TopicInfo, TopicRole};
pub use topic::{Topic, TopicStats};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("configuration parse error: {0}")]
    Parse(String),

    #[error("topic not found: {0}")]
    TopicNotFound(String),

    #[error("topic '{topic}' is {role} and not externally writable")]
    ProtectedTopic { topic: String, role: TopicRole },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("agent '{0}' did not drain its mailbox within {1:?}")]
    DrainTimeout(String, std::time::Duration),
}

pub type Result<T> = std::result::Result<T, CascadeError>;

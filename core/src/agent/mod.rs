//! Agent model: the capability contract, the operator family the
//! configuration loader can instantiate, and the queue/worker decorator
//! that gives an agent its own mailbox.

use std::sync::Arc;

use async_trait::async_trait;

use crate::message::Message;
use crate::Result;

pub mod bitwise;
mod ops;
mod parallel;

pub use ops::{OpAgent, OpKind};
pub use parallel::ParallelAgent;

/// Capability contract every computational unit implements.
///
/// An unwrapped agent is not required to tolerate concurrent `on_message`
/// calls; wrap it in a [`ParallelAgent`] before sharing it across tasks.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Display name. Not required to be unique.
    fn name(&self) -> &str;

    /// Restore the agent's initial state.
    async fn reset(&self);

    /// Deliver one message that arrived on `topic`.
    async fn on_message(&self, topic: &str, msg: Message);

    /// Release held resources. Operator agents hold none; decorators drain
    /// their queue here.
    async fn close(&self) -> Result<()>;
}

/// Shared handle to an agent. Topics keep only weak back-references to
/// these; whoever constructed the agent keeps it alive.
pub type AgentRef = Arc<dyn Agent>;

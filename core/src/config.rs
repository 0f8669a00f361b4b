use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::agent::{Agent, AgentRef, OpAgent, OpKind, ParallelAgent};
use crate::registry::TopicRegistry;
use crate::{CascadeError, Result};

/// Instantiates a pipeline from a text definition and owns the agents it
/// creates.
///
/// The format is three lines per agent:
///
/// ```text
/// <agent-type>
/// <in0>,<in1>,...
/// <out0>,<out1>,...
/// ```
///
/// Comma is the only field separator; fields are taken verbatim, empty ones
/// included. A file whose line count is not a multiple of three is rejected
/// before anything is instantiated. A block naming an unknown agent type is
/// logged and skipped; the remaining blocks still load.
pub struct PipelineLoader {
    path: PathBuf,
    registry: Arc<TopicRegistry>,
    agents: Vec<Arc<ParallelAgent>>,
}

impl PipelineLoader {
    pub fn new(path: impl Into<PathBuf>, registry: Arc<TopicRegistry>) -> Self {
        Self {
            path: path.into(),
            registry,
            agents: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &'static str {
        "pipeline"
    }

    pub fn version(&self) -> u32 {
        1
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Read the definition, instantiate each block's agent, wrap it in a
    /// [`ParallelAgent`], and wire the wrapper into the registry.
    pub async fn create(&mut self) -> Result<()> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let lines: Vec<&str> = raw.lines().map(str::trim_end).collect();
        if lines.len() % 3 != 0 {
            return Err(CascadeError::Parse(format!(
                "{}: expected three lines per agent, found {} lines",
                self.path.display(),
                lines.len()
            )));
        }

        for (index, block) in lines.chunks(3).enumerate() {
            let type_name = block[0];
            let inputs: Vec<String> = block[1].split(',').map(str::to_string).collect();
            let outputs: Vec<String> = block[2].split(',').map(str::to_string).collect();

            let Some(kind) = OpKind::from_name(type_name) else {
                warn!(block = index, agent_type = type_name, "unknown agent type, skipping block");
                continue;
            };

            // Queue depth scales with fan-in so slow consumers still leave
            // publishers some headroom.
            let capacity = (inputs.len() * 5).max(10);
            let inner: AgentRef = Arc::new(OpAgent::new(
                kind,
                inputs.clone(),
                outputs.clone(),
                Arc::clone(&self.registry),
            ));
            let wrapper = Arc::new(ParallelAgent::new(inner, capacity));
            let handle: AgentRef = wrapper.clone();

            let arity = kind.input_arity();
            if inputs.len() >= arity {
                for topic in &inputs[..arity] {
                    self.registry.get(topic).await.subscribe(&handle).await;
                }
            }
            if let Some(topic) = outputs.first() {
                self.registry.get(topic).await.add_publisher(&handle).await;
            }

            self.agents.push(wrapper);
        }

        info!(
            path = %self.path.display(),
            agents = self.agents.len(),
            topics = self.registry.len(),
            "pipeline loaded"
        );
        Ok(())
    }

    /// Close every agent in construction order, logging failures but always
    /// making forward progress.
    pub async fn close(&mut self) {
        for agent in self.agents.drain(..) {
            if let Err(err) = agent.close().await {
                warn!(agent = %agent.name(), error = %err, "agent close failed, continuing");
            }
        }
    }
}

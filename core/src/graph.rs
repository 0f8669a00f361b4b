use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::registry::TopicRegistry;

/// Node kinds of the bipartite topic/agent view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Topic,
    Agent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// `T:<name>` for topics, `A:<name>` for agents.
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
    /// Outgoing edges as indices into the graph's node list.
    pub edges: Vec<usize>,
}

/// Transient bipartite view of a registry, rebuilt on demand.
///
/// Edges run topic → subscriber and publisher → topic. Agents sharing a
/// display name collapse into one node, mirroring how the fabric identifies
/// them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    nodes: Vec<GraphNode>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Graph {
    pub async fn from_registry(registry: &TopicRegistry) -> Self {
        let mut graph = Graph::default();
        let topics = registry.topics().await;

        for topic in &topics {
            graph.ensure_node(NodeKind::Topic, topic.name());
        }
        for topic in &topics {
            let topic_node = graph.ensure_node(NodeKind::Topic, topic.name());
            for subscriber in topic.subscriber_names().await {
                let agent_node = graph.ensure_node(NodeKind::Agent, &subscriber);
                graph.add_edge(topic_node, agent_node);
            }
            for publisher in topic.publisher_names().await {
                let agent_node = graph.ensure_node(NodeKind::Agent, &publisher);
                graph.add_edge(agent_node, topic_node);
            }
        }
        graph
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True iff any node lies on a directed cycle.
    ///
    /// Each root walks with its own path set, so every reachable cycle is
    /// reported even though nodes may be revisited across roots. Graphs here
    /// are bipartite and small, which keeps the repeated walks cheap.
    pub fn has_cycles(&self) -> bool {
        let mut path = vec![false; self.nodes.len()];
        (0..self.nodes.len()).any(|root| self.walk(root, &mut path))
    }

    fn walk(&self, node: usize, path: &mut [bool]) -> bool {
        if path[node] {
            return true;
        }
        path[node] = true;
        let cyclic = self.nodes[node]
            .edges
            .iter()
            .any(|&next| self.walk(next, path));
        path[node] = false;
        cyclic
    }

    fn ensure_node(&mut self, kind: NodeKind, name: &str) -> usize {
        let id = match kind {
            NodeKind::Topic => format!("T:{name}"),
            NodeKind::Agent => format!("A:{name}"),
        };
        if let Some(&existing) = self.index.get(&id) {
            return existing;
        }
        let node = self.nodes.len();
        self.nodes.push(GraphNode {
            id: id.clone(),
            kind,
            name: name.to_string(),
            edges: Vec::new(),
        });
        self.index.insert(id, node);
        node
    }

    fn add_edge(&mut self, from: usize, to: usize) {
        if !self.nodes[from].edges.contains(&to) {
            self.nodes[from].edges.push(to);
        }
    }
}

//! Node graph state

use eframe::egui::Pos2;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::model::Model;
use crate::nodes::{NodeData, NodeType};

/// Node identity. Issued monotonically and never reused within a session.
pub type NodeId = u32;

/// Lifecycle of a node's last execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Error,
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub node_type: NodeType,
    /// Logical graph coordinates of the top-left corner
    pub position: Pos2,
    pub data: NodeData,
    pub model: Model,
    pub output: String,
    pub status: NodeStatus,
}

const SUMMARY_CHARS: usize = 50;

impl Node {
    pub fn new(id: NodeId, node_type: NodeType, position: Pos2, model: Model) -> Self {
        Self {
            id,
            node_type,
            position,
            data: NodeData::for_type(node_type),
            model,
            output: String::new(),
            status: NodeStatus::Idle,
        }
    }

    /// Short text shown in the node body
    pub fn summary(&self) -> String {
        if !self.output.is_empty() {
            let mut chars = self.output.chars();
            let head: String = chars.by_ref().take(SUMMARY_CHARS).collect();
            if chars.next().is_some() {
                format!("{head}...")
            } else {
                head
            }
        } else if let Some(topic) = self.data.topic() {
            format!("Topic: {topic}")
        } else {
            "Waiting for input...".to_string()
        }
    }
}

/// A directed connection: `from`'s output feeds `to`'s input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub from: NodeId,
    pub to: NodeId,
}

/// The entire node graph. Nodes are kept in creation order.
#[derive(Debug, Clone)]
pub struct NodeGraph {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    next_id: NodeId,
    default_model: Model,
}

impl Default for NodeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            connections: Vec::new(),
            next_id: 1,
            default_model: Model::default(),
        }
    }

    pub fn with_default_model(mut self, model: Model) -> Self {
        self.default_model = model;
        self
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn next_id(&self) -> NodeId {
        self.next_id
    }

    pub fn nodes_iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn connections_iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn try_node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.node(id).ok_or(GraphError::NodeNotFound(id))
    }

    pub fn try_node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.node_mut(id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Connections feeding `id`, in insertion order
    pub fn incoming(&self, id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.to == id)
    }

    /// Place a new node; its data is seeded empty from the type's schema
    pub fn create_node(&mut self, node_type: NodeType, position: Pos2) -> Result<NodeId, GraphError> {
        let id = self.next_id;
        self.next_id = id.checked_add(1).ok_or(GraphError::IdsExhausted)?;
        log::info!("Creating node {} ({}) at {:?}", id, node_type.key(), position);
        self.nodes.push(Node::new(id, node_type, position, self.default_model));
        Ok(id)
    }

    /// Same as [`Self::create_node`] for a registry key; unknown keys are rejected
    pub fn create_node_by_key(&mut self, key: &str, position: Pos2) -> Result<NodeId, GraphError> {
        let node_type = NodeType::from_key(key)?;
        self.create_node(node_type, position)
    }

    /// Delete a node and all its connections
    pub fn delete_node(&mut self, id: NodeId) -> Result<(Node, Vec<Connection>), GraphError> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or(GraphError::NodeNotFound(id))?;

        let (removed, kept): (Vec<Connection>, Vec<Connection>) = self
            .connections
            .iter()
            .partition(|c| c.from == id || c.to == id);
        self.connections = kept;

        let node = self.nodes.remove(index);
        log::info!("Deleted node {} and {} connection(s)", id, removed.len());
        Ok((node, removed))
    }

    /// Add a connection after validating both endpoints
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<Connection, GraphError> {
        self.try_node(from)?;
        self.try_node(to)?;
        if from == to {
            return Err(GraphError::SelfConnection);
        }
        let connection = Connection { from, to };
        if self.connections.contains(&connection) {
            return Err(GraphError::DuplicateConnection { from, to });
        }
        if self.reaches(to, from) {
            return Err(GraphError::WouldCreateCycle { from, to });
        }
        self.connections.push(connection);
        log::info!("Connection created: {} -> {}", from, to);
        Ok(connection)
    }

    /// Delete a specific connection
    pub fn disconnect(&mut self, from: NodeId, to: NodeId) -> Result<Connection, GraphError> {
        let index = self
            .connections
            .iter()
            .position(|c| c.from == from && c.to == to)
            .ok_or(GraphError::NoConnection { from, to })?;
        Ok(self.connections.remove(index))
    }

    /// Drop every connection feeding `id`
    pub fn disconnect_incoming(&mut self, id: NodeId) -> Vec<Connection> {
        let (removed, kept): (Vec<Connection>, Vec<Connection>) =
            self.connections.iter().partition(|c| c.to == id);
        self.connections = kept;
        removed
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.connections.clear();
    }

    /// Whether `target` can be reached from `start` by following connections
    fn reaches(&self, start: NodeId, target: NodeId) -> bool {
        let mut stack = vec![start];
        let mut seen = vec![start];
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            for next in self.connections.iter().filter(|c| c.from == current).map(|c| c.to) {
                if !seen.contains(&next) {
                    seen.push(next);
                    stack.push(next);
                }
            }
        }
        false
    }

    /// Rebuild a graph from restored parts, keeping node ids.
    ///
    /// Nodes with an id already taken are skipped, as are ids too large to leave
    /// room for a next id. Connections that fail the
    /// usual validation (missing endpoint, self, duplicate, cycle) are dropped.
    /// Returns the graph and how many connections were dropped.
    pub fn from_parts(
        nodes: Vec<Node>,
        connections: impl IntoIterator<Item = (NodeId, NodeId)>,
    ) -> (Self, usize) {
        let mut graph = Self::new();
        for node in nodes {
            if graph.node(node.id).is_some() {
                log::warn!("Skipping duplicate node id {} in snapshot", node.id);
                continue;
            }
            let Some(after) = node.id.checked_add(1) else {
                log::warn!("Skipping node id {} in snapshot: no id left after it", node.id);
                continue;
            };
            graph.next_id = graph.next_id.max(after);
            graph.nodes.push(node);
        }

        let mut dropped = 0;
        for (from, to) in connections {
            if let Err(e) = graph.connect(from, to) {
                log::warn!("Dropping restored connection {} -> {}: {}", from, to, e);
                dropped += 1;
            }
        }
        (graph, dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(n: usize) -> (NodeGraph, Vec<NodeId>) {
        let mut graph = NodeGraph::new();
        let ids = (0..n)
            .map(|i| graph.create_node(NodeType::ScriptGen, Pos2::new(i as f32 * 10.0, 0.0)).unwrap())
            .collect();
        (graph, ids)
    }

    #[test]
    fn ids_are_never_reused() {
        let (mut graph, ids) = graph_with(3);
        assert_eq!(ids, vec![1, 2, 3]);
        graph.delete_node(3).unwrap();
        let fresh = graph.create_node(NodeType::Translator, Pos2::ZERO).unwrap();
        assert_eq!(fresh, 4);
    }

    #[test]
    fn new_nodes_start_idle_with_schema_data() {
        let mut graph = NodeGraph::new().with_default_model(Model::Claude);
        let id = graph.create_node(NodeType::TopicResearch, Pos2::new(5.0, 6.0)).unwrap();
        let node = graph.node(id).unwrap();
        assert_eq!(node.status, NodeStatus::Idle);
        assert_eq!(node.model, Model::Claude);
        assert!(node.output.is_empty());
        assert_eq!(node.data.fields().len(), 2);
        assert_eq!(node.position, Pos2::new(5.0, 6.0));
    }

    #[test]
    fn unknown_type_key_is_rejected() {
        let mut graph = NodeGraph::new();
        let err = graph.create_node_by_key("podcast", Pos2::ZERO).unwrap_err();
        assert_eq!(err, GraphError::UnknownNodeType("podcast".into()));
        assert!(graph.is_empty());
        assert_eq!(graph.next_id(), 1);
    }

    #[test]
    fn connect_rejects_self_and_duplicates() {
        let (mut graph, ids) = graph_with(2);
        assert_eq!(graph.connect(ids[0], ids[0]), Err(GraphError::SelfConnection));
        graph.connect(ids[0], ids[1]).unwrap();
        assert_eq!(
            graph.connect(ids[0], ids[1]),
            Err(GraphError::DuplicateConnection { from: ids[0], to: ids[1] })
        );
        assert_eq!(graph.connections_iter().count(), 1);
    }

    #[test]
    fn connect_rejects_cycles() {
        let (mut graph, ids) = graph_with(3);
        graph.connect(ids[0], ids[1]).unwrap();
        graph.connect(ids[1], ids[2]).unwrap();
        assert_eq!(
            graph.connect(ids[2], ids[0]),
            Err(GraphError::WouldCreateCycle { from: ids[2], to: ids[0] })
        );
        assert_eq!(
            graph.connect(ids[1], ids[0]),
            Err(GraphError::WouldCreateCycle { from: ids[1], to: ids[0] })
        );
        // Reverse of a diamond edge is fine as long as no loop forms
        graph.connect(ids[0], ids[2]).unwrap();
    }

    #[test]
    fn connect_requires_existing_nodes() {
        let (mut graph, ids) = graph_with(1);
        assert_eq!(graph.connect(ids[0], 99), Err(GraphError::NodeNotFound(99)));
    }

    #[test]
    fn delete_cascades_only_incident_connections() {
        let (mut graph, ids) = graph_with(4);
        graph.connect(ids[0], ids[1]).unwrap();
        graph.connect(ids[1], ids[2]).unwrap();
        graph.connect(ids[0], ids[3]).unwrap();
        graph.connect(ids[2], ids[3]).unwrap();

        let (node, removed) = graph.delete_node(ids[1]).unwrap();
        assert_eq!(node.id, ids[1]);
        assert_eq!(removed.len(), 2);

        let remaining: Vec<_> = graph.connections_iter().copied().collect();
        assert_eq!(
            remaining,
            vec![
                Connection { from: ids[0], to: ids[3] },
                Connection { from: ids[2], to: ids[3] },
            ]
        );
        assert!(graph.node(ids[1]).is_none());
        assert_eq!(graph.delete_node(ids[1]).unwrap_err(), GraphError::NodeNotFound(ids[1]));
    }

    #[test]
    fn disconnect_removes_single_edge() {
        let (mut graph, ids) = graph_with(3);
        graph.connect(ids[0], ids[2]).unwrap();
        graph.connect(ids[1], ids[2]).unwrap();
        graph.disconnect(ids[0], ids[2]).unwrap();
        assert_eq!(graph.incoming(ids[2]).count(), 1);
        assert_eq!(
            graph.disconnect(ids[0], ids[2]),
            Err(GraphError::NoConnection { from: ids[0], to: ids[2] })
        );
        assert_eq!(graph.disconnect_incoming(ids[2]).len(), 1);
        assert_eq!(graph.connections_iter().count(), 0);
    }

    #[test]
    fn from_parts_keeps_ids_and_drops_bad_edges() {
        let nodes = vec![
            Node::new(4, NodeType::ChannelName, Pos2::ZERO, Model::Gemini),
            Node::new(9, NodeType::ChannelHandle, Pos2::ZERO, Model::Gemini),
            Node::new(9, NodeType::Translator, Pos2::ZERO, Model::Gemini),
        ];
        let (graph, dropped) = NodeGraph::from_parts(nodes, vec![(4, 9), (4, 9), (9, 12), (9, 4)]);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.node(9).unwrap().node_type, NodeType::ChannelHandle);
        assert_eq!(graph.next_id(), 10);
        assert_eq!(dropped, 3);
        assert_eq!(graph.connections_iter().count(), 1);
    }

    #[test]
    fn ids_run_out_without_wrapping() {
        let nodes = vec![Node::new(u32::MAX - 1, NodeType::ChannelName, Pos2::ZERO, Model::Gemini)];
        let (mut graph, _) = NodeGraph::from_parts(nodes, Vec::new());
        assert_eq!(graph.next_id(), u32::MAX);

        assert_eq!(graph.create_node(NodeType::Translator, Pos2::ZERO), Err(GraphError::IdsExhausted));
        assert_eq!(graph.next_id(), u32::MAX);
        assert_eq!(graph.node_count(), 1);
        assert!(matches!(
            graph.create_node_by_key("translator", Pos2::ZERO),
            Err(GraphError::IdsExhausted)
        ));
    }

    #[test]
    fn summary_prefers_output_then_topic() {
        let mut node = Node::new(1, NodeType::ChannelName, Pos2::ZERO, Model::Gemini);
        assert_eq!(node.summary(), "Waiting for input...");
        node.data.set("topic", "camping").unwrap();
        assert_eq!(node.summary(), "Topic: camping");
        node.output = "x".repeat(60);
        assert_eq!(node.summary(), format!("{}...", "x".repeat(50)));
        node.output = "short".into();
        assert_eq!(node.summary(), "short");
    }
}

//! Workflow snapshots and the key-value stores they are written to

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use eframe::egui::Pos2;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::graph::{Node, NodeGraph, NodeId, NodeStatus};
use crate::model::Model;
use crate::nodes::{NodeData, NodeType};
use crate::templates::Mode;

/// Slot for the context handed from channel planning to video planning
pub const HANDOFF_KEY: &str = "channel_factory_handoff";

const MODEL_FIELD: &str = "model";

/// Persisted node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub status: NodeStatus,
}

/// Persisted connection, by node id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub from: NodeId,
    pub to: NodeId,
}

/// Serialized form of a graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

/// A rebuilt graph and what had to be thrown away on the way
#[derive(Debug)]
pub struct Restored {
    pub graph: NodeGraph,
    pub dropped_nodes: usize,
    pub dropped_connections: usize,
}

impl WorkflowSnapshot {
    pub fn from_graph(graph: &NodeGraph) -> Self {
        let nodes = graph
            .nodes_iter()
            .map(|node| {
                let mut data = node.data.fields();
                data.insert(MODEL_FIELD.to_string(), node.model.id().to_string());
                NodeRecord {
                    id: node.id,
                    node_type: node.node_type.key().to_string(),
                    x: node.position.x,
                    y: node.position.y,
                    data,
                    output: node.output.clone(),
                    status: node.status,
                }
            })
            .collect();

        let connections = graph
            .connections_iter()
            .map(|c| ConnectionRecord { from: c.from, to: c.to })
            .collect();

        Self { nodes, connections }
    }

    /// Rebuild the graph, keeping ids.
    ///
    /// Nodes of unknown type are dropped together with their connections;
    /// connections that do not resolve are dropped. A node caught mid-run
    /// comes back idle, since its call did not survive.
    pub fn into_graph(self, default_model: Model) -> Restored {
        let mut dropped_nodes = 0;
        let nodes: Vec<Node> = self
            .nodes
            .into_iter()
            .filter_map(|record| match NodeType::from_key(&record.node_type) {
                Ok(node_type) => Some(record_to_node(record, node_type)),
                Err(e) => {
                    log::warn!("Dropping node {} from snapshot: {}", record.id, e);
                    dropped_nodes += 1;
                    None
                }
            })
            .collect();

        let typed = nodes.len();
        let (graph, dropped_connections) =
            NodeGraph::from_parts(nodes, self.connections.into_iter().map(|c| (c.from, c.to)));
        dropped_nodes += typed - graph.node_count();

        Restored {
            graph: graph.with_default_model(default_model),
            dropped_nodes,
            dropped_connections,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn record_to_node(record: NodeRecord, node_type: NodeType) -> Node {
    let model = record
        .data
        .get(MODEL_FIELD)
        .map(|id| Model::from_id(id))
        .unwrap_or_default();
    let status = match record.status {
        NodeStatus::Running => NodeStatus::Idle,
        other => other,
    };
    Node {
        id: record.id,
        node_type,
        position: Pos2::new(record.x, record.y),
        data: NodeData::from_fields(node_type, &record.data),
        model,
        output: record.output,
        status,
    }
}

/// Context carried from the channel graph into video planning
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
}

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:#+|[-*•]|\d+[.)])\s*").expect("valid list marker pattern"));

impl HandoffContext {
    /// Best-effort extraction from a channel planning graph
    pub fn from_graph(graph: &NodeGraph) -> Self {
        let topic = graph
            .nodes_iter()
            .find_map(|n| n.data.topic())
            .map(str::to_string);

        let channel_name = graph
            .nodes_iter()
            .find(|n| n.node_type == NodeType::ChannelName && n.status == NodeStatus::Completed)
            .and_then(|n| first_channel_name(&n.output));

        let target_audience = graph
            .nodes_iter()
            .find(|n| n.node_type == NodeType::TargetAudience && n.status == NodeStatus::Completed)
            .map(|n| n.output.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            topic,
            channel_name,
            target_audience,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.topic.is_none() && self.channel_name.is_none() && self.target_audience.is_none()
    }
}

/// First suggested name in a list like `1. **Cozy Corner**: a channel about...`
fn first_channel_name(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let stripped = LIST_MARKER.replace(line, "");
        let head = stripped
            .split([':', '(', '—'])
            .next()
            .unwrap_or_default()
            .split(" - ")
            .next()
            .unwrap_or_default();
        let name = head.trim().trim_matches(|c: char| c == '*' || c == '"' || c == '\'').trim();
        (!name.is_empty()).then(|| name.to_string())
    })
}

/// Durable string storage keyed by slot name. Last write wins.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local store, for tests and headless use
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStore {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> std::path::PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::write(self.path(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Browser `localStorage`
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorageStore;

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    /// Fails when the browser has storage disabled
    pub fn open() -> Result<Self, StoreError> {
        Self::storage().map(|_| Self)
    }

    fn storage() -> Result<web_sys::Storage, StoreError> {
        web_sys::window()
            .ok_or_else(|| StoreError::Unavailable("no window".into()))?
            .local_storage()
            .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))?
            .ok_or_else(|| StoreError::Unavailable("localStorage disabled".into()))
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| StoreError::Unavailable(format!("{:?}", e)))
    }
}

/// Overwrite the snapshot for `mode`
pub fn save_snapshot(store: &dyn KeyValueStore, mode: Mode, graph: &NodeGraph) -> Result<(), StoreError> {
    let json = WorkflowSnapshot::from_graph(graph).to_json()?;
    store.set(mode.storage_key(), &json)
}

/// Read the snapshot for `mode`. Missing, unreadable or corrupt slots yield `None`.
pub fn load_snapshot(store: &dyn KeyValueStore, mode: Mode) -> Option<WorkflowSnapshot> {
    let json = match store.get(mode.storage_key()) {
        Ok(Some(json)) => json,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("Could not read {} snapshot: {}", mode.id(), e);
            return None;
        }
    };
    match WorkflowSnapshot::from_json(&json) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            log::warn!("Ignoring corrupt {} snapshot: {}", mode.id(), e);
            None
        }
    }
}

pub fn save_handoff(store: &dyn KeyValueStore, handoff: &HandoffContext) -> Result<(), StoreError> {
    store.set(HANDOFF_KEY, &serde_json::to_string(handoff)?)
}

pub fn load_handoff(store: &dyn KeyValueStore) -> Option<HandoffContext> {
    let json = store.get(HANDOFF_KEY).ok().flatten()?;
    match serde_json::from_str::<HandoffContext>(&json) {
        Ok(handoff) if !handoff.is_empty() => Some(handoff),
        Ok(_) => None,
        Err(e) => {
            log::warn!("Ignoring corrupt handoff context: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{bootstrap, TemplateSeed, CHANNEL_TEMPLATE};

    fn sample_graph() -> NodeGraph {
        let mut graph = bootstrap(&CHANNEL_TEMPLATE, &TemplateSeed::with_topic("indoor plants"), Model::Gemini);
        graph.delete_node(2).unwrap();
        let name = graph.node_mut(1).unwrap();
        name.output = "1. **Leaf Lab**: plants made simple".into();
        name.status = NodeStatus::Completed;
        name.model = Model::Claude;
        let banner = graph.node_mut(5).unwrap();
        banner.output = "Error: quota exceeded".into();
        banner.status = NodeStatus::Error;
        banner.position = Pos2::new(-12.5, 999.0);
        graph
    }

    #[test]
    fn snapshot_round_trip_preserves_graph() {
        let graph = sample_graph();
        let json = WorkflowSnapshot::from_graph(&graph).to_json().unwrap();
        let restored = WorkflowSnapshot::from_json(&json).unwrap().into_graph(Model::Gemini);

        assert_eq!(restored.dropped_nodes, 0);
        assert_eq!(restored.dropped_connections, 0);
        let before: Vec<_> = graph.nodes_iter().cloned().collect();
        let after: Vec<_> = restored.graph.nodes_iter().cloned().collect();
        assert_eq!(before, after);
        let before: Vec<_> = graph.connections_iter().copied().collect();
        let after: Vec<_> = restored.graph.connections_iter().copied().collect();
        assert_eq!(before, after);
        assert_eq!(restored.graph.next_id(), graph.next_id());
    }

    #[test]
    fn snapshot_uses_documented_field_names() {
        let graph = sample_graph();
        let value = serde_json::to_value(WorkflowSnapshot::from_graph(&graph)).unwrap();
        let first = &value["nodes"][0];
        assert_eq!(first["type"], "channel-name");
        assert_eq!(first["data"]["model"], "claude");
        assert_eq!(first["data"]["topic"], "indoor plants");
        assert_eq!(first["status"], "completed");
        assert_eq!(value["connections"][0]["from"], 1);
    }

    #[test]
    fn unresolvable_references_are_dropped() {
        let json = r#"{
            "nodes": [
                {"id": 3, "type": "channel-name", "x": 0, "y": 0, "data": {"topic": "chess"}, "output": "", "status": "idle"},
                {"id": 7, "type": "hologram", "x": 0, "y": 0, "data": {}, "output": "", "status": "idle"},
                {"id": 8, "type": "channel-handle", "x": 10, "y": 0, "data": {}, "output": "", "status": "running"}
            ],
            "connections": [{"from": 3, "to": 8}, {"from": 3, "to": 7}, {"from": 42, "to": 8}]
        }"#;
        let restored = WorkflowSnapshot::from_json(json).unwrap().into_graph(Model::Gemini);
        assert_eq!(restored.dropped_nodes, 1);
        assert_eq!(restored.dropped_connections, 2);
        assert_eq!(restored.graph.node_count(), 2);
        assert_eq!(restored.graph.connections_iter().count(), 1);
        assert_eq!(restored.graph.next_id(), 9);
        assert_eq!(restored.graph.node(8).unwrap().status, NodeStatus::Idle);
    }

    #[test]
    fn largest_node_id_is_dropped_on_restore() {
        let json = format!(
            r#"{{
                "nodes": [
                    {{"id": {}, "type": "channel-name", "x": 0, "y": 0, "data": {{}}, "output": "", "status": "idle"}},
                    {{"id": 2, "type": "channel-handle", "x": 0, "y": 0, "data": {{}}, "output": "", "status": "idle"}}
                ],
                "connections": [{{"from": {}, "to": 2}}]
            }}"#,
            u32::MAX,
            u32::MAX
        );
        let restored = WorkflowSnapshot::from_json(&json).unwrap().into_graph(Model::Gemini);
        assert_eq!(restored.dropped_nodes, 1);
        assert_eq!(restored.dropped_connections, 1);
        assert_eq!(restored.graph.node_count(), 1);
        assert_eq!(restored.graph.next_id(), 3);
    }

    #[test]
    fn corrupt_snapshot_loads_as_none() {
        let store = MemoryStore::new();
        store.set(Mode::Channel.storage_key(), "{not json").unwrap();
        assert!(load_snapshot(&store, Mode::Channel).is_none());
        assert!(load_snapshot(&store, Mode::Video).is_none());
    }

    #[test]
    fn save_overwrites_previous_snapshot() {
        let store = MemoryStore::new();
        let mut graph = sample_graph();
        save_snapshot(&store, Mode::Channel, &graph).unwrap();
        graph.delete_node(1).unwrap();
        save_snapshot(&store, Mode::Channel, &graph).unwrap();
        let snapshot = load_snapshot(&store, Mode::Channel).unwrap();
        assert_eq!(snapshot.nodes.len(), graph.node_count());
        assert!(load_snapshot(&store, Mode::Video).is_none());
    }

    #[test]
    fn handoff_extracts_name_topic_and_audience() {
        let mut graph = sample_graph();
        // Target audience node was id 3
        let audience = graph.node_mut(3).unwrap();
        audience.output = "  Persona: busy renters aged 25-34  ".into();
        audience.status = NodeStatus::Completed;

        let handoff = HandoffContext::from_graph(&graph);
        assert_eq!(handoff.topic.as_deref(), Some("indoor plants"));
        assert_eq!(handoff.channel_name.as_deref(), Some("Leaf Lab"));
        assert_eq!(handoff.target_audience.as_deref(), Some("Persona: busy renters aged 25-34"));

        let json = serde_json::to_value(&handoff).unwrap();
        assert!(json.get("channelName").is_some());
    }

    #[test]
    fn handoff_round_trips_through_store() {
        let store = MemoryStore::new();
        assert!(load_handoff(&store).is_none());
        save_handoff(&store, &HandoffContext::default()).unwrap();
        assert!(load_handoff(&store).is_none());

        let handoff = HandoffContext {
            topic: Some("retro gaming".into()),
            ..HandoffContext::default()
        };
        save_handoff(&store, &handoff).unwrap();
        assert_eq!(load_handoff(&store), Some(handoff));
    }

    #[test]
    fn file_store_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        assert_eq!(store.get("slot").unwrap(), None);
        store.set("slot", "{\"a\":1}").unwrap();

        let reopened = FileStore::new(dir.path()).unwrap();
        assert_eq!(reopened.get("slot").unwrap().as_deref(), Some("{\"a\":1}"));
        reopened.remove("slot").unwrap();
        reopened.remove("slot").unwrap();
        assert_eq!(store.get("slot").unwrap(), None);
    }

    #[test]
    fn channel_name_parsing_variants() {
        assert_eq!(first_channel_name("\n\n## \"Brew Crew\" - coffee talk").as_deref(), Some("Brew Crew"));
        assert_eq!(first_channel_name("- Night Owls (late night radio)").as_deref(), Some("Night Owls"));
        assert_eq!(first_channel_name("   \n  "), None);
    }
}

//! Error types for the workflow engine

use thiserror::Error;

use crate::graph::NodeId;

/// Rejections raised by graph mutations. The graph is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Unknown node type '{0}'")]
    UnknownNodeType(String),

    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("A node cannot be connected to itself")]
    SelfConnection,

    #[error("Node {from} is already connected to node {to}")]
    DuplicateConnection { from: NodeId, to: NodeId },

    #[error("Connecting node {from} to node {to} would create a cycle")]
    WouldCreateCycle { from: NodeId, to: NodeId },

    #[error("Node type '{node_type}' has no property '{property}'")]
    UnknownProperty { node_type: String, property: String },

    #[error("Node {from} is not connected to node {to}")]
    NoConnection { from: NodeId, to: NodeId },

    #[error("No node ids are left in this graph")]
    IdsExhausted,
}

/// Errors raised by the editing session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("There is nothing waiting for confirmation")]
    NoPendingConfirmation,

    #[error("Node {0} is already running")]
    NodeBusy(NodeId),
}

/// Failure reported by the model-call collaborator.
///
/// Displays as the bare message so node outputs read `Error: <message>`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ModelError {
    pub message: String,
}

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Durable storage failures. Never fatal: callers log and fall back.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config {path}: {reason}")]
    Invalid { path: String, reason: String },
}

//! Channel Factory - node-graph planner for content channels
//!
//! Each step of planning a channel (name, handle, audience, research, scripts...)
//! is a node on a canvas. Wiring nodes together feeds one step's result into the
//! next step's prompt. The engine here is headless: a [`WorkflowSession`] takes
//! [`Command`]s and answers with [`SessionEvent`]s, and the binary only renders
//! and forwards pointer input.

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod interaction;
pub mod launch;
pub mod model;
pub mod nodes;
pub mod persistence;
pub mod report;
pub mod session;
pub mod templates;
pub mod ui_components;
pub mod viewport;
pub mod workspace;

pub use config::FactoryConfig;
pub use error::{ConfigError, EditorError, GraphError, ModelError, StoreError};
pub use graph::{Connection, Node, NodeGraph, NodeId, NodeStatus};
pub use launch::LaunchOptions;
pub use model::{Model, ModelClient, UnconfiguredClient};
pub use nodes::{NodeData, NodeType};
pub use persistence::{HandoffContext, KeyValueStore, MemoryStore, WorkflowSnapshot};
pub use session::{Command, Confirmation, SessionEvent, WorkflowSession};
pub use templates::{Mode, TemplateSeed};
pub use workspace::{ModeEntry, Workspace};

//! One editing session: the graph of a single mode plus everything that edits it
//!
//! Input is fed in as [`Command`]s and answered with [`SessionEvent`]s, so the
//! whole editor can be driven without a rendering surface. Every mutating
//! command writes the snapshot through to storage.

use std::rc::Rc;

use eframe::egui::Pos2;

use crate::config::FactoryConfig;
use crate::error::{EditorError, ModelError};
use crate::executor;
use crate::graph::{Connection, Node, NodeGraph, NodeId, NodeStatus};
use crate::interaction::{GestureEffect, Interaction};
use crate::model::Model;
use crate::persistence::{self, KeyValueStore, MemoryStore};
use crate::templates::{bootstrap, Mode, TemplateSeed};
use crate::viewport::{CubicCurve, Viewport};

/// Destructive actions wait here until the user answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    DeleteNode(NodeId),
    ClearWorkflow,
}

/// Discrete intents applied to a session
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    PointerDown { pos: Pos2 },
    PointerMove { pos: Pos2 },
    PointerUp { pos: Pos2 },
    Wheel { delta_y: f32 },
    /// A palette entry dropped on the canvas at a screen position
    DropNode { type_key: String, pos: Pos2 },
    SelectNode(NodeId),
    Connect { from: NodeId, to: NodeId },
    Disconnect { from: NodeId, to: NodeId },
    SetProperty { node: NodeId, property: String, value: String },
    SetModel { node: NodeId, model: Model },
    SetOutput { node: NodeId, output: String },
    RequestDelete(NodeId),
    RequestClear,
    Confirm,
    Decline,
    /// The model call for `node` finished
    NodeExecuted { node: NodeId, result: Result<String, ModelError> },
}

/// What changed as a result of a command
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    NodeCreated(NodeId),
    NodeSelected(NodeId),
    NodeMoved(NodeId),
    NodeDragged(NodeId),
    NodeUpdated(NodeId),
    NodeDeleted(NodeId),
    NodeExecuted { node: NodeId, status: NodeStatus },
    ConnectionRemoved(Connection),
    WiringStarted(NodeId),
    WireMoved,
    WireCompleted(Connection),
    WiringCancelled,
    Panned,
    Zoomed(f32),
    ConfirmationRequested(Confirmation),
    ConfirmationDeclined(Confirmation),
    WorkflowCleared,
}

pub type Events = Vec<SessionEvent>;

pub struct WorkflowSession {
    mode: Mode,
    graph: NodeGraph,
    viewport: Viewport,
    interaction: Interaction,
    selected: Option<NodeId>,
    pending: Option<Confirmation>,
    seed: TemplateSeed,
    store: Rc<dyn KeyValueStore>,
    config: FactoryConfig,
}

impl WorkflowSession {
    /// Restore the mode's snapshot if it holds any node, else build the template
    pub fn open(mode: Mode, seed: TemplateSeed, store: Rc<dyn KeyValueStore>, config: FactoryConfig) -> Self {
        let restored = persistence::load_snapshot(store.as_ref(), mode)
            .filter(|snapshot| !snapshot.nodes.is_empty())
            .map(|snapshot| snapshot.into_graph(config.default_model));

        let mut session = Self::empty(mode, seed, store, config);
        match restored {
            Some(restored) if !restored.graph.is_empty() => {
                log::info!(
                    "Restored {} workflow: {} node(s), {} dropped connection(s)",
                    mode.id(),
                    restored.graph.node_count(),
                    restored.dropped_connections
                );
                session.graph = restored.graph;
            }
            _ => session.rebuild(),
        }
        session.selected = session.graph.nodes_iter().next().map(|n| n.id);
        session
    }

    /// Build the mode's template from `seed`, overwriting whatever snapshot is stored
    pub fn fresh(mode: Mode, seed: TemplateSeed, store: Rc<dyn KeyValueStore>, config: FactoryConfig) -> Self {
        let mut session = Self::empty(mode, seed, store, config);
        session.rebuild();
        session.selected = session.graph.nodes_iter().next().map(|n| n.id);
        session
    }

    fn rebuild(&mut self) {
        self.graph = bootstrap(self.mode.template(), &self.seed, self.config.default_model);
        self.save();
    }

    /// A session with no nodes, e.g. while the video brief is still being asked for
    pub fn empty(mode: Mode, seed: TemplateSeed, store: Rc<dyn KeyValueStore>, config: FactoryConfig) -> Self {
        Self {
            mode,
            graph: NodeGraph::new().with_default_model(config.default_model),
            viewport: Viewport::new(config.viewport.clone()),
            interaction: Interaction::new(),
            selected: None,
            pending: None,
            seed,
            store,
            config,
        }
    }

    /// Headless session backed by memory
    pub fn in_memory(mode: Mode, seed: TemplateSeed) -> Self {
        Self::open(mode, seed, Rc::new(MemoryStore::new()), FactoryConfig::default())
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// The canvas moved on screen
    pub fn set_canvas_origin(&mut self, origin: Pos2) {
        self.viewport.set_origin(origin);
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.selected.and_then(|id| self.graph.node(id))
    }

    pub fn pending_confirmation(&self) -> Option<Confirmation> {
        self.pending
    }

    pub fn seed(&self) -> &TemplateSeed {
        &self.seed
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    pub fn store(&self) -> &Rc<dyn KeyValueStore> {
        &self.store
    }

    /// Topic used to title reports
    pub fn topic(&self) -> Option<&str> {
        Some(self.seed.topic.as_str())
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.graph.nodes_iter().find_map(|n| n.data.topic()))
    }

    /// Dashed preview while a wire is being dragged, in graph space
    pub fn wire_preview(&self) -> Option<CubicCurve> {
        self.interaction.wire_preview(&self.graph, &self.viewport)
    }

    /// Write the snapshot for this mode. Failures are logged, never raised.
    pub fn save(&self) {
        if let Err(e) = persistence::save_snapshot(self.store.as_ref(), self.mode, &self.graph) {
            log::warn!("Failed to save {} workflow: {}", self.mode.id(), e);
        }
    }

    pub fn apply(&mut self, command: Command) -> Result<Events, EditorError> {
        match command {
            Command::PointerDown { pos } => {
                let effect = self.interaction.pointer_down(&self.graph, &self.viewport, pos);
                Ok(self.on_gesture(effect))
            }
            Command::PointerMove { pos } => {
                let effect = self.interaction.pointer_move(&mut self.graph, &mut self.viewport, pos);
                Ok(self.on_gesture(effect))
            }
            Command::PointerUp { pos } => {
                let effect = self.interaction.pointer_up(&self.graph, &self.viewport, pos);
                match effect {
                    GestureEffect::WireReleased { from, to } => self.connect(from, to),
                    GestureEffect::InputClicked(node) => {
                        let removed = self.graph.disconnect_incoming(node);
                        if !removed.is_empty() {
                            log::info!("Removed {} connection(s) into node {}", removed.len(), node);
                            self.save();
                        }
                        Ok(removed.into_iter().map(SessionEvent::ConnectionRemoved).collect())
                    }
                    other => Ok(self.on_gesture(other)),
                }
            }
            Command::Wheel { delta_y } => {
                let scale = self.viewport.zoom_by_wheel(delta_y);
                Ok(vec![SessionEvent::Zoomed(scale)])
            }
            Command::DropNode { type_key, pos } => {
                let position = self.viewport.screen_to_graph(pos);
                let id = self.graph.create_node_by_key(&type_key, position)?;
                self.selected = Some(id);
                self.save();
                Ok(vec![SessionEvent::NodeCreated(id), SessionEvent::NodeSelected(id)])
            }
            Command::SelectNode(id) => {
                self.graph.try_node(id)?;
                self.selected = Some(id);
                Ok(vec![SessionEvent::NodeSelected(id)])
            }
            Command::Connect { from, to } => self.connect(from, to),
            Command::Disconnect { from, to } => {
                let connection = self.graph.disconnect(from, to)?;
                self.save();
                Ok(vec![SessionEvent::ConnectionRemoved(connection)])
            }
            Command::SetProperty { node, property, value } => {
                self.graph.try_node_mut(node)?.data.set(&property, value)?;
                self.save();
                Ok(vec![SessionEvent::NodeUpdated(node)])
            }
            Command::SetModel { node, model } => {
                self.graph.try_node_mut(node)?.model = model;
                self.save();
                Ok(vec![SessionEvent::NodeUpdated(node)])
            }
            Command::SetOutput { node, output } => {
                self.graph.try_node_mut(node)?.output = output;
                self.save();
                Ok(vec![SessionEvent::NodeUpdated(node)])
            }
            Command::RequestDelete(id) => {
                self.graph.try_node(id)?;
                self.pending = Some(Confirmation::DeleteNode(id));
                Ok(vec![SessionEvent::ConfirmationRequested(Confirmation::DeleteNode(id))])
            }
            Command::RequestClear => {
                self.pending = Some(Confirmation::ClearWorkflow);
                Ok(vec![SessionEvent::ConfirmationRequested(Confirmation::ClearWorkflow)])
            }
            Command::Confirm => {
                let confirmation = self.pending.take().ok_or(EditorError::NoPendingConfirmation)?;
                self.carry_out(confirmation)
            }
            Command::Decline => {
                let confirmation = self.pending.take().ok_or(EditorError::NoPendingConfirmation)?;
                Ok(vec![SessionEvent::ConfirmationDeclined(confirmation)])
            }
            Command::NodeExecuted { node, result } => {
                let target = self.graph.try_node_mut(node)?;
                executor::store_result(target, result);
                let status = target.status;
                self.save();
                Ok(vec![SessionEvent::NodeExecuted { node, status }])
            }
        }
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<Events, EditorError> {
        let connection = self.graph.connect(from, to)?;
        self.save();
        Ok(vec![SessionEvent::WireCompleted(connection)])
    }

    fn carry_out(&mut self, confirmation: Confirmation) -> Result<Events, EditorError> {
        match confirmation {
            Confirmation::DeleteNode(id) => {
                let (_, removed) = self.graph.delete_node(id)?;
                if self.selected == Some(id) {
                    self.selected = None;
                }
                self.interaction.cancel();
                self.save();
                let mut events: Events = removed.into_iter().map(SessionEvent::ConnectionRemoved).collect();
                events.push(SessionEvent::NodeDeleted(id));
                Ok(events)
            }
            Confirmation::ClearWorkflow => {
                self.interaction.cancel();
                self.viewport.reset();
                self.rebuild();
                self.selected = self.graph.nodes_iter().next().map(|n| n.id);
                log::info!("Reset {} workflow to its template", self.mode.id());
                Ok(vec![SessionEvent::WorkflowCleared])
            }
        }
    }

    fn on_gesture(&mut self, effect: GestureEffect) -> Events {
        match effect {
            GestureEffect::Nothing | GestureEffect::PanStarted | GestureEffect::PanFinished => vec![],
            GestureEffect::NodeGrabbed(id) => {
                self.selected = Some(id);
                vec![SessionEvent::NodeSelected(id)]
            }
            GestureEffect::NodeMoved(id) => vec![SessionEvent::NodeMoved(id)],
            GestureEffect::DragFinished(id) => {
                self.save();
                vec![SessionEvent::NodeDragged(id)]
            }
            GestureEffect::Panned => vec![SessionEvent::Panned],
            GestureEffect::WiringStarted(id) => vec![SessionEvent::WiringStarted(id)],
            GestureEffect::WireMoved => vec![SessionEvent::WireMoved],
            GestureEffect::WireCancelled => vec![SessionEvent::WiringCancelled],
            // Resolved by the caller before reaching here
            GestureEffect::WireReleased { .. } | GestureEffect::InputClicked(_) => vec![],
        }
    }

    /// Mark a node running ahead of its model call
    pub(crate) fn mark_running(&mut self, id: NodeId) -> Result<(), EditorError> {
        let node = self.graph.try_node_mut(id)?;
        if node.status == NodeStatus::Running {
            return Err(EditorError::NodeBusy(id));
        }
        node.status = NodeStatus::Running;
        log::debug!("Node {} running", id);
        Ok(())
    }
}

//! Pointer gestures on the canvas: node dragging, panning and wiring
//!
//! Only one gesture is active at a time. What starts is decided by what sits
//! under the pointer when it goes down; everything after that follows the
//! gesture until the pointer comes back up.

use eframe::egui::{Pos2, Rect, Vec2};

use crate::graph::{NodeGraph, NodeId};
use crate::ui_components::style;
use crate::viewport::{self, CubicCurve, Viewport};

/// What lies under a screen position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Canvas,
    NodeBody(NodeId),
    OutputSocket(NodeId),
    InputSocket(NodeId),
}

/// Find the topmost thing under `screen`. Later nodes are drawn on top.
pub fn hit_test(graph: &NodeGraph, viewport: &Viewport, screen: Pos2) -> HitTarget {
    let point = viewport.screen_to_graph(screen);
    let socket_reach = style::SOCKET_RADIUS * style::SOCKET_HIT_SCALE;

    let nodes: Vec<_> = graph.nodes_iter().collect();
    for node in nodes.into_iter().rev() {
        if point.distance(viewport::output_socket(node)) <= socket_reach {
            return HitTarget::OutputSocket(node.id);
        }
        if point.distance(viewport::input_socket(node)) <= socket_reach {
            return HitTarget::InputSocket(node.id);
        }
        let body = Rect::from_min_size(node.position, Vec2::new(style::NODE_WIDTH, style::NODE_HEIGHT));
        if body.contains(point) {
            return HitTarget::NodeBody(node.id);
        }
    }
    HitTarget::Canvas
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    DraggingNode {
        node: NodeId,
        /// Logical position of the node when the drag began
        start_position: Pos2,
        pointer_start: Pos2,
    },
    Panning {
        pan_start: Vec2,
        pointer_start: Pos2,
    },
    Wiring {
        from: NodeId,
        /// Live screen position of the pointer
        pointer: Pos2,
    },
    /// Pointer went down on an input socket; releasing there is a click
    PressingInput(NodeId),
}

/// What a pointer event did, for the session to act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEffect {
    Nothing,
    NodeGrabbed(NodeId),
    NodeMoved(NodeId),
    DragFinished(NodeId),
    PanStarted,
    Panned,
    PanFinished,
    WiringStarted(NodeId),
    WireMoved,
    /// Wiring ended over an input socket
    WireReleased { from: NodeId, to: NodeId },
    /// Wiring ended anywhere else
    WireCancelled,
    InputClicked(NodeId),
}

#[derive(Debug, Default)]
pub struct Interaction {
    gesture: Gesture,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_idle(&self) -> bool {
        self.gesture == Gesture::Idle
    }

    pub fn pointer_down(&mut self, graph: &NodeGraph, viewport: &Viewport, screen: Pos2) -> GestureEffect {
        if !self.is_idle() {
            return GestureEffect::Nothing;
        }

        match hit_test(graph, viewport, screen) {
            HitTarget::OutputSocket(from) => {
                log::debug!("Started wiring from node {}", from);
                self.gesture = Gesture::Wiring { from, pointer: screen };
                GestureEffect::WiringStarted(from)
            }
            HitTarget::InputSocket(node) => {
                self.gesture = Gesture::PressingInput(node);
                GestureEffect::Nothing
            }
            HitTarget::NodeBody(node) => {
                let Some(start_position) = graph.node(node).map(|n| n.position) else {
                    return GestureEffect::Nothing;
                };
                self.gesture = Gesture::DraggingNode {
                    node,
                    start_position,
                    pointer_start: screen,
                };
                GestureEffect::NodeGrabbed(node)
            }
            HitTarget::Canvas => {
                self.gesture = Gesture::Panning {
                    pan_start: viewport.pan(),
                    pointer_start: screen,
                };
                GestureEffect::PanStarted
            }
        }
    }

    pub fn pointer_move(&mut self, graph: &mut NodeGraph, viewport: &mut Viewport, screen: Pos2) -> GestureEffect {
        match self.gesture.clone() {
            Gesture::Idle | Gesture::PressingInput(_) => GestureEffect::Nothing,
            Gesture::DraggingNode {
                node,
                start_position,
                pointer_start,
            } => {
                let delta = viewport.screen_delta_to_graph(screen - pointer_start);
                match graph.node_mut(node) {
                    Some(n) => {
                        n.position = start_position + delta;
                        GestureEffect::NodeMoved(node)
                    }
                    None => {
                        // Node vanished mid-drag
                        self.gesture = Gesture::Idle;
                        GestureEffect::Nothing
                    }
                }
            }
            Gesture::Panning { pan_start, pointer_start } => {
                viewport.set_pan(pan_start + (screen - pointer_start));
                GestureEffect::Panned
            }
            Gesture::Wiring { from, .. } => {
                self.gesture = Gesture::Wiring { from, pointer: screen };
                GestureEffect::WireMoved
            }
        }
    }

    pub fn pointer_up(&mut self, graph: &NodeGraph, viewport: &Viewport, screen: Pos2) -> GestureEffect {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => GestureEffect::Nothing,
            Gesture::DraggingNode { node, .. } => GestureEffect::DragFinished(node),
            Gesture::Panning { .. } => GestureEffect::PanFinished,
            Gesture::Wiring { from, .. } => match hit_test(graph, viewport, screen) {
                HitTarget::InputSocket(to) => GestureEffect::WireReleased { from, to },
                _ => {
                    log::debug!("Wiring from node {} cancelled", from);
                    GestureEffect::WireCancelled
                }
            },
            Gesture::PressingInput(node) => match hit_test(graph, viewport, screen) {
                HitTarget::InputSocket(released) if released == node => GestureEffect::InputClicked(node),
                _ => GestureEffect::Nothing,
            },
        }
    }

    /// Abandon whatever is in progress
    pub fn cancel(&mut self) {
        self.gesture = Gesture::Idle;
    }

    /// The dashed curve shown while wiring, in graph space
    pub fn wire_preview(&self, graph: &NodeGraph, viewport: &Viewport) -> Option<CubicCurve> {
        let Gesture::Wiring { from, pointer } = &self.gesture else {
            return None;
        };
        let node = graph.node(*from)?;
        Some(CubicCurve::between(
            viewport::output_socket(node),
            viewport.screen_to_graph(*pointer),
        ))
    }
}

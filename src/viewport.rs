//! Pan/zoom transform between canvas (screen) space and logical graph space

use eframe::egui::{Pos2, Vec2};

use crate::config::ViewportConfig;
use crate::graph::Node;
use crate::ui_components::style;

/// Pan/zoom state. Not persisted; reset whenever a mode is (re)entered.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    scale: f32,
    pan: Vec2,
    /// Screen position of the canvas' top-left corner
    origin: Pos2,
    config: ViewportConfig,
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(reason) => {
                log::warn!("{}; using default viewport settings", reason);
                ViewportConfig::default()
            }
        };
        let scale = config.initial_scale.clamp(config.min_scale, config.max_scale);
        Self {
            scale,
            pan: Vec2::from(config.initial_pan),
            origin: Pos2::ZERO,
            config,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    pub fn origin(&self) -> Pos2 {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Pos2) {
        self.origin = origin;
    }

    pub fn set_pan(&mut self, pan: Vec2) {
        self.pan = pan;
    }

    /// Back to the configured initial scale and pan
    pub fn reset(&mut self) {
        let origin = self.origin;
        *self = Self::new(self.config.clone());
        self.origin = origin;
    }

    /// Apply a wheel event. Positive `delta_y` (scrolling down) zooms out.
    pub fn zoom_by_wheel(&mut self, delta_y: f32) -> f32 {
        let next = self.scale - delta_y * self.config.wheel_sensitivity;
        self.scale = next.clamp(self.config.min_scale, self.config.max_scale);
        self.scale
    }

    /// Screen point to logical graph point
    pub fn screen_to_graph(&self, screen: Pos2) -> Pos2 {
        ((screen - self.origin - self.pan) / self.scale).to_pos2()
    }

    /// Logical graph point to screen point
    pub fn graph_to_screen(&self, graph: Pos2) -> Pos2 {
        self.origin + self.pan + graph.to_vec2() * self.scale
    }

    /// Screen-space delta to logical delta
    pub fn screen_delta_to_graph(&self, delta: Vec2) -> Vec2 {
        delta / self.scale
    }
}

/// Where a node's output socket sits, in graph space
pub fn output_socket(node: &Node) -> Pos2 {
    node.position + Vec2::new(style::NODE_WIDTH, style::SOCKET_OFFSET_Y)
}

/// Where a node's input socket sits, in graph space
pub fn input_socket(node: &Node) -> Pos2 {
    node.position + Vec2::new(0.0, style::SOCKET_OFFSET_Y)
}

/// A cubic Bezier leaving horizontally to the right and arriving from the left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicCurve {
    pub points: [Pos2; 4],
}

impl CubicCurve {
    pub fn between(from: Pos2, to: Pos2) -> Self {
        let handle = Vec2::new(style::CURVE_HANDLE, 0.0);
        Self {
            points: [from, from + handle, to - handle, to],
        }
    }

    pub fn start(&self) -> Pos2 {
        self.points[0]
    }

    pub fn end(&self) -> Pos2 {
        self.points[3]
    }

    pub fn point_at(&self, t: f32) -> Pos2 {
        let [p0, p1, p2, p3] = self.points;
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        Pos2::new(
            a * p0.x + b * p1.x + c * p2.x + d * p3.x,
            a * p0.y + b * p1.y + c * p2.y + d * p3.y,
        )
    }

    /// Polyline approximation with `segments + 1` points
    pub fn sample(&self, segments: usize) -> Vec<Pos2> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.point_at(i as f32 / segments as f32))
            .collect()
    }

    /// Map every control point through `f`, e.g. graph to screen
    pub fn map(&self, f: impl Fn(Pos2) -> Pos2) -> Self {
        Self {
            points: self.points.map(f),
        }
    }
}

//! Shared geometry, palette and small widgets
//!
//! Hit testing, connection curves and painting all read node geometry from here.

use eframe::egui::{self, Color32, Ui};

use crate::graph::NodeStatus;

/// Standard spacing and sizing values, in logical graph units
pub mod style {
    /// Node dimensions
    pub const NODE_WIDTH: f32 = 260.0;
    pub const NODE_HEIGHT: f32 = 110.0;
    pub const NODE_HEADER_HEIGHT: f32 = 32.0;
    pub const NODE_PADDING: f32 = 10.0;
    pub const NODE_ROUNDING: f32 = 8.0;

    /// Sockets sit on the left/right edge at a fixed height
    pub const SOCKET_OFFSET_Y: f32 = 40.0;
    pub const SOCKET_RADIUS: f32 = 7.0;
    /// Pointer slop around a socket, as a multiple of its radius
    pub const SOCKET_HIT_SCALE: f32 = 1.8;

    /// Horizontal distance of the connection curve's control points
    pub const CURVE_HANDLE: f32 = 80.0;
    pub const CONNECTION_WIDTH: f32 = 2.0;
    pub const CURVE_SEGMENTS: usize = 32;

    /// Grid
    pub const GRID_SIZE: f32 = 20.0;
}

/// Color palette for consistent theming
pub mod colors {
    use super::Color32;

    // Canvas
    pub const CANVAS_BG: Color32 = Color32::from_rgb(26, 26, 46);
    pub const GRID_LINE: Color32 = Color32::from_rgba_premultiplied(255, 255, 255, 15);

    // Nodes
    pub const NODE_BG: Color32 = Color32::from_rgb(40, 40, 55);
    pub const NODE_BG_SELECTED: Color32 = Color32::from_rgb(50, 50, 70);
    pub const NODE_SELECTED_OUTLINE: Color32 = Color32::from_rgb(100, 149, 237);

    // Connections
    pub const CONNECTION: Color32 = Color32::from_rgb(102, 102, 102);
    pub const WIRE_PREVIEW: Color32 = Color32::from_rgb(180, 180, 200);
    pub const SOCKET: Color32 = Color32::from_rgb(160, 160, 180);

    // Status
    pub const STATUS_IDLE: Color32 = Color32::from_rgb(90, 90, 100);
    pub const STATUS_RUNNING: Color32 = Color32::from_rgb(255, 193, 7);
    pub const STATUS_COMPLETED: Color32 = Color32::from_rgb(46, 204, 113);
    pub const STATUS_ERROR: Color32 = Color32::from_rgb(231, 76, 60);

    // Text
    pub const TEXT_PRIMARY: Color32 = Color32::WHITE;
    pub const TEXT_SECONDARY: Color32 = Color32::GRAY;
}

pub fn status_color(status: NodeStatus) -> Color32 {
    match status {
        NodeStatus::Idle => colors::STATUS_IDLE,
        NodeStatus::Running => colors::STATUS_RUNNING,
        NodeStatus::Completed => colors::STATUS_COMPLETED,
        NodeStatus::Error => colors::STATUS_ERROR,
    }
}

/// Unified dropdown/combo box component
pub struct FlowDropdown<'a, T: PartialEq + Clone> {
    selected: &'a mut T,
    options: &'a [(T, &'a str)],
    label: Option<&'a str>,
    id: egui::Id,
}

impl<'a, T: PartialEq + Clone> FlowDropdown<'a, T> {
    pub fn new(selected: &'a mut T, options: &'a [(T, &'a str)], id: impl std::hash::Hash) -> Self {
        Self {
            selected,
            options,
            label: None,
            id: egui::Id::new(id),
        }
    }

    pub fn label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }

    /// Returns true when the selection changed
    pub fn show(self, ui: &mut Ui) -> bool {
        let before = self.selected.clone();
        ui.horizontal(|ui| {
            if let Some(label) = self.label {
                ui.label(label);
            }

            let current_label = self
                .options
                .iter()
                .find(|(v, _)| v == self.selected)
                .map(|(_, l)| *l)
                .unwrap_or("Choose...");

            egui::ComboBox::from_id_salt(self.id)
                .selected_text(current_label)
                .show_ui(ui, |ui| {
                    for (value, label) in self.options {
                        ui.selectable_value(self.selected, value.clone(), *label);
                    }
                });
        });
        *self.selected != before
    }
}

/// Section header for properties panel
pub fn section_header(ui: &mut Ui, title: &str) {
    ui.add_space(8.0);
    ui.label(egui::RichText::new(title).strong().size(14.0));
    ui.separator();
    ui.add_space(4.0);
}

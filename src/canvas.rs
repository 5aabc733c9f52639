//! The node canvas: painting plus translation of raw pointer input into session commands

use eframe::egui::{self, Align2, Event, FontId, PointerButton, Pos2, Rect, Rounding, Shape, Stroke, Ui, Vec2};

use channel_factory::graph::Node;
use channel_factory::ui_components::{colors, status_color, style};
use channel_factory::viewport::{self, CubicCurve, Viewport};
use channel_factory::{Command, EditorError, NodeType, WorkflowSession};

/// Draw the canvas and, when `interactive`, feed this frame's input to the session.
/// Returns the rejections raised by the input, oldest first.
pub fn show(ui: &mut Ui, session: &mut WorkflowSession, interactive: bool) -> Vec<EditorError> {
    let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
    let canvas_rect = response.rect;
    session.set_canvas_origin(canvas_rect.min);

    let mut errors = Vec::new();
    let commands = if interactive {
        collect_commands(ui, &response, canvas_rect)
    } else {
        Vec::new()
    };
    for command in commands {
        if let Err(e) = session.apply(command) {
            log::warn!("Canvas input rejected: {}", e);
            errors.push(e);
        }
    }

    painter.rect_filled(canvas_rect, 0.0, colors::CANVAS_BG);
    draw_grid(&painter, canvas_rect, session.viewport());

    let graph = session.graph();
    let vp = session.viewport();
    for connection in graph.connections_iter() {
        if let (Some(from), Some(to)) = (graph.node(connection.from), graph.node(connection.to)) {
            let curve = CubicCurve::between(viewport::output_socket(from), viewport::input_socket(to));
            draw_connection(&painter, &curve, vp);
        }
    }

    // Pending wire: drawn only, never hit tested
    if let Some(curve) = session.wire_preview() {
        let points = curve.map(|p| vp.graph_to_screen(p)).sample(style::CURVE_SEGMENTS);
        painter.extend(Shape::dashed_line(
            &points,
            Stroke::new(style::CONNECTION_WIDTH * vp.scale(), colors::WIRE_PREVIEW),
            6.0,
            4.0,
        ));
    }

    for node in graph.nodes_iter() {
        draw_node(&painter, canvas_rect, vp, node, session.selected() == Some(node.id));
    }

    errors
}

fn collect_commands(ui: &Ui, response: &egui::Response, canvas_rect: Rect) -> Vec<Command> {
    let layer = ui.layer_id();
    let ctx = ui.ctx();
    // Windows floating over the canvas keep their own clicks
    let on_canvas = |pos: Pos2| canvas_rect.contains(pos) && ctx.layer_id_at(pos).map_or(true, |l| l == layer);

    let events = ui.input(|i| i.events.clone());
    let mut commands: Vec<Command> = events
        .into_iter()
        .filter_map(|event| match event {
            Event::PointerMoved(pos) => Some(Command::PointerMove { pos }),
            Event::PointerButton {
                pos,
                button: PointerButton::Primary,
                pressed: true,
                ..
            } if on_canvas(pos) => Some(Command::PointerDown { pos }),
            Event::PointerButton {
                pos,
                button: PointerButton::Primary,
                pressed: false,
                ..
            } => Some(Command::PointerUp { pos }),
            _ => None,
        })
        .collect();

    if response.hovered() {
        let scroll = ui.input(|i| i.raw_scroll_delta.y);
        if scroll != 0.0 {
            // Scrolling down zooms out
            commands.push(Command::Wheel { delta_y: -scroll });
        }
    }

    if let Some(node_type) = response.dnd_release_payload::<NodeType>() {
        if let Some(pos) = ui.input(|i| i.pointer.interact_pos()) {
            commands.push(Command::DropNode {
                type_key: node_type.key().to_string(),
                pos,
            });
        }
    }

    commands
}

fn draw_grid(painter: &egui::Painter, rect: Rect, vp: &Viewport) {
    let grid_size = style::GRID_SIZE * vp.scale();
    let offset = vp.pan();
    let stroke = Stroke::new(1.0, colors::GRID_LINE);

    let mut x = rect.left() + offset.x.rem_euclid(grid_size);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += grid_size;
    }
    let mut y = rect.top() + offset.y.rem_euclid(grid_size);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += grid_size;
    }
}

fn draw_connection(painter: &egui::Painter, curve: &CubicCurve, vp: &Viewport) {
    let points = curve.map(|p| vp.graph_to_screen(p)).sample(style::CURVE_SEGMENTS);
    painter.add(Shape::line(
        points,
        Stroke::new(style::CONNECTION_WIDTH * vp.scale(), colors::CONNECTION),
    ));
}

fn draw_node(painter: &egui::Painter, canvas_rect: Rect, vp: &Viewport, node: &Node, is_selected: bool) {
    let zoom = vp.scale();
    let node_pos = vp.graph_to_screen(node.position);
    let node_rect = Rect::from_min_size(node_pos, Vec2::new(style::NODE_WIDTH, style::NODE_HEIGHT) * zoom);

    // Skip if outside visible area
    if !canvas_rect.intersects(node_rect) {
        return;
    }

    let rounding = style::NODE_ROUNDING * zoom;
    let bg_color = if is_selected {
        colors::NODE_BG_SELECTED
    } else {
        colors::NODE_BG
    };
    painter.rect_filled(node_rect, rounding, bg_color);

    // Status border, selection wins
    let outline = if is_selected {
        Stroke::new(2.0, colors::NODE_SELECTED_OUTLINE)
    } else {
        Stroke::new(1.5, status_color(node.status))
    };
    painter.rect_stroke(node_rect, rounding, outline);

    // Header
    let header_rect = Rect::from_min_size(node_pos, Vec2::new(style::NODE_WIDTH, style::NODE_HEADER_HEIGHT) * zoom);
    painter.rect_filled(
        header_rect,
        Rounding {
            nw: rounding,
            ne: rounding,
            sw: 0.0,
            se: 0.0,
        },
        node.node_type.color(),
    );
    painter.text(
        header_rect.left_center() + Vec2::new(style::NODE_PADDING * zoom, 0.0),
        Align2::LEFT_CENTER,
        format!("{} {}", node.node_type.definition().icon, node.node_type.name()),
        FontId::proportional(14.0 * zoom),
        colors::TEXT_PRIMARY,
    );
    painter.circle_filled(
        header_rect.right_center() - Vec2::new(style::NODE_PADDING * zoom, 0.0),
        4.0 * zoom,
        status_color(node.status),
    );

    // Summary
    let padding = style::NODE_PADDING * zoom;
    let body_top = header_rect.left_bottom() + Vec2::new(padding + style::SOCKET_RADIUS * zoom, padding);
    let galley = painter.layout(
        node.summary(),
        FontId::proportional(12.0 * zoom),
        colors::TEXT_SECONDARY,
        node_rect.width() - 2.0 * (padding + style::SOCKET_RADIUS * zoom),
    );
    painter.with_clip_rect(node_rect.intersect(canvas_rect))
        .galley(body_top, galley, colors::TEXT_SECONDARY);

    // Sockets
    let radius = style::SOCKET_RADIUS * zoom;
    for socket in [viewport::input_socket(node), viewport::output_socket(node)] {
        let center = vp.graph_to_screen(socket);
        painter.circle_filled(center, radius, colors::SOCKET);
        painter.circle_stroke(center, radius, Stroke::new(1.0, colors::CANVAS_BG));
    }
}

//! Main application state and UI

use std::rc::Rc;
use std::sync::mpsc;

use eframe::egui;

use channel_factory::executor::{self, RunStep, RunStepper};
use channel_factory::nodes::{Category, PropertyKind};
use channel_factory::ui_components::{colors, section_header, status_color, FlowDropdown};
use channel_factory::{
    report, Command, Confirmation, EditorError, FactoryConfig, KeyValueStore, LaunchOptions, Mode, Model,
    ModelClient, ModelError, ModeEntry, NodeId, NodeStatus, NodeType, UnconfiguredClient, Workspace,
};

/// A model call that came back
struct Completion {
    generation: u64,
    node: NodeId,
    result: Result<String, ModelError>,
}

/// Issues model calls off the UI path and hands results back each frame
struct CallDriver {
    client: Rc<dyn ModelClient>,
    tx: mpsc::Sender<Completion>,
    rx: mpsc::Receiver<Completion>,
    /// Bumped on mode switch so results for a discarded graph are dropped
    generation: u64,
    in_flight: usize,
    /// Whole-graph run in progress, timed on `egui` input time
    run: Option<RunStepper>,
    #[cfg(not(target_arch = "wasm32"))]
    pool: futures::executor::LocalPool,
}

impl CallDriver {
    fn new(client: Rc<dyn ModelClient>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            client,
            tx,
            rx,
            generation: 0,
            in_flight: 0,
            run: None,
            #[cfg(not(target_arch = "wasm32"))]
            pool: futures::executor::LocalPool::new(),
        }
    }

    fn is_busy(&self) -> bool {
        self.in_flight > 0 || self.run.is_some()
    }

    fn reset(&mut self) {
        self.generation += 1;
        self.in_flight = 0;
        self.run = None;
    }

    /// Mark the node running and send its prompt off
    fn start(&mut self, workspace: &mut Workspace, node: NodeId) -> Result<(), EditorError> {
        let call = executor::prepare(workspace.session_mut(), node)?;
        let client = self.client.clone();
        let tx = self.tx.clone();
        let generation = self.generation;
        self.in_flight += 1;

        let task = async move {
            let result = call.invoke(client.as_ref()).await;
            // Receiver is gone only when the app is shutting down
            let _ = tx.send(Completion {
                generation,
                node: call.node,
                result,
            });
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            use futures::task::LocalSpawnExt;
            if let Err(e) = self.pool.spawner().spawn_local(task) {
                log::error!("Failed to spawn model call: {}", e);
            }
        }
        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(task);

        Ok(())
    }

    fn start_run(&mut self, workspace: &Workspace) {
        let session = workspace.session();
        self.run = Some(RunStepper::new(session.graph(), session.config().run.step_delay()));
    }

    /// Collect finished calls and move a run along. Returns true when a run just ended.
    fn pump(&mut self, workspace: &mut Workspace, now: f64) -> bool {
        #[cfg(not(target_arch = "wasm32"))]
        self.pool.run_until_stalled();

        while let Ok(done) = self.rx.try_recv() {
            if done.generation != self.generation {
                log::debug!("Dropping result for node {} from a previous workflow", done.node);
                continue;
            }
            self.in_flight = self.in_flight.saturating_sub(1);
            let session = workspace.session_mut();
            if let Err(e) = session.apply(Command::NodeExecuted {
                node: done.node,
                result: done.result,
            }) {
                log::warn!("Result for node {} discarded: {}", done.node, e);
            }
            if let Some(run) = self.run.as_mut() {
                let status = session.graph().node(done.node).map_or(NodeStatus::Error, |n| n.status);
                run.node_finished(done.node, status, now);
            }
        }

        let Some(run) = self.run.as_mut() else {
            return false;
        };
        match run.poll(workspace.session().graph(), now) {
            RunStep::Wait => false,
            RunStep::Start(node) => {
                if let Err(e) = self.start(workspace, node) {
                    log::warn!("Node {} was not run: {}", node, e);
                    if let Some(run) = self.run.as_mut() {
                        run.start_failed(node);
                    }
                }
                false
            }
            RunStep::Finished(_) => {
                self.run = None;
                true
            }
        }
    }
}

/// The Channel Factory application
pub struct ChannelFactoryApp {
    workspace: Workspace,
    driver: CallDriver,

    show_palette: bool,
    show_properties: bool,
    show_report: bool,

    /// Video brief being typed
    brief_topic: String,
    brief_audience: String,

    /// Last rejected action, shown in the status bar
    notice: Option<String>,
}

impl ChannelFactoryApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        launch: LaunchOptions,
        store: Rc<dyn KeyValueStore>,
        config: FactoryConfig,
    ) -> Self {
        let mut style = (*cc.egui_ctx.style()).clone();
        style.visuals = egui::Visuals::dark();
        style.visuals.window_rounding = egui::Rounding::same(8.0);
        style.visuals.panel_fill = egui::Color32::from_rgb(26, 26, 46);
        style.visuals.extreme_bg_color = egui::Color32::from_rgb(16, 16, 32);
        cc.egui_ctx.set_style(style);

        let brief_topic = launch.topic.clone().unwrap_or_default();
        Self {
            workspace: Workspace::open(launch, store, config),
            driver: CallDriver::new(Rc::new(UnconfiguredClient)),
            show_palette: true,
            show_properties: true,
            show_report: false,
            brief_topic,
            brief_audience: String::new(),
            notice: None,
        }
    }

    fn apply(&mut self, command: Command) {
        match self.workspace.session_mut().apply(command) {
            Ok(_) => self.notice = None,
            Err(e) => {
                log::warn!("{}", e);
                self.notice = Some(e.to_string());
            }
        }
    }

    fn switch_mode(&mut self, mode: Mode) {
        self.driver.reset();
        self.show_report = false;
        if self.workspace.switch_mode(mode) == ModeEntry::NeedsBrief {
            self.brief_audience.clear();
        }
    }

    fn run_node(&mut self, node: NodeId) {
        if let Err(e) = self.driver.start(&mut self.workspace, node) {
            self.notice = Some(e.to_string());
        }
    }

    fn download_report(&self) {
        let session = self.workspace.session();
        let markdown = report::render_markdown(session.graph(), session.mode(), session.topic(), &chrono::Local::now());
        let file_name = report::file_name(session.mode(), session.topic());

        #[cfg(target_arch = "wasm32")]
        {
            let script = match report::download_script(&markdown, &file_name) {
                Ok(script) => script,
                Err(e) => {
                    log::error!("Failed to build report download: {}", e);
                    return;
                }
            };
            if let Err(e) = js_sys::eval(&script) {
                log::error!("Report download failed: {:?}", e);
            }
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            let Some(path) = rfd::FileDialog::new()
                .set_file_name(file_name.as_str())
                .add_filter("Markdown", &["md"])
                .save_file()
            else {
                return;
            };
            match std::fs::write(&path, markdown) {
                Ok(()) => log::info!("Report saved to {}", path.display()),
                Err(e) => log::error!("Failed to save report: {}", e),
            }
        }
    }

    fn menu_bar(&mut self, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("View", |ui| {
                ui.checkbox(&mut self.show_palette, "Node Library");
                ui.checkbox(&mut self.show_properties, "Properties");
            });
            ui.separator();

            let current = self.workspace.mode();
            for mode in Mode::ALL {
                if ui.selectable_label(current == mode, mode.title()).clicked() && current != mode {
                    self.switch_mode(mode);
                }
            }
            ui.separator();

            let idle = !self.driver.is_busy() && !self.workspace.awaiting_brief();
            if ui.add_enabled(idle, egui::Button::new("▶ Run Factory")).clicked() {
                self.driver.start_run(&self.workspace);
            }
            if ui.button("📄 Report").clicked() {
                self.show_report = true;
            }
            if ui.add_enabled(idle, egui::Button::new("⟲ Reset")).clicked() {
                self.apply(Command::RequestClear);
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let session = self.workspace.session();
                ui.label(format!("Zoom: {:.0}%", session.viewport().scale() * 100.0));
                ui.separator();
                ui.label(format!("{} nodes", session.graph().node_count()));
                if self.driver.is_busy() {
                    ui.separator();
                    ui.spinner();
                }
                if let Some(notice) = &self.notice {
                    ui.separator();
                    ui.colored_label(colors::STATUS_ERROR, notice);
                }
            });
        });
    }

    fn palette(&mut self, ui: &mut egui::Ui) {
        ui.heading("Nodes");
        ui.label(egui::RichText::new("Drag onto the canvas").color(colors::TEXT_SECONDARY));
        ui.separator();

        for category in Category::ALL {
            egui::CollapsingHeader::new(category.title())
                .default_open(true)
                .show(ui, |ui| {
                    for node_type in NodeType::in_category(category) {
                        let def = node_type.definition();
                        ui.dnd_drag_source(egui::Id::new(("palette", def.key)), node_type, |ui| {
                            ui.label(egui::RichText::new(format!("{} {}", def.icon, def.name)).color(def.color));
                        });
                    }
                });
        }
    }

    fn properties(&mut self, ui: &mut egui::Ui) {
        ui.heading("Properties");
        ui.separator();

        let Some(node) = self.workspace.session().selected_node().cloned() else {
            ui.label("Select a node to view properties");
            return;
        };
        let id = node.id;

        section_header(ui, &format!("{} {}", node.node_type.definition().icon, node.node_type.name()));
        ui.horizontal(|ui| {
            ui.label("Status:");
            ui.colored_label(status_color(node.status), format!("{:?}", node.status));
        });

        let mut model = node.model;
        let model_options: Vec<(Model, &str)> = Model::ALL.iter().map(|m| (*m, m.label())).collect();
        if FlowDropdown::new(&mut model, &model_options, ("model", id))
            .label("Model")
            .show(ui)
        {
            self.apply(Command::SetModel { node: id, model });
        }

        for property in node.node_type.properties() {
            let mut value = node.data.get(property.id).unwrap_or_default().to_string();
            let changed = match property.kind {
                PropertyKind::Text => {
                    ui.label(property.label);
                    ui.text_edit_singleline(&mut value).changed()
                }
                PropertyKind::Select(choices) => {
                    let options: Vec<(String, &str)> = choices.iter().map(|c| (c.to_string(), *c)).collect();
                    FlowDropdown::new(&mut value, &options, (property.id, id))
                        .label(property.label)
                        .show(ui)
                }
            };
            if changed {
                self.apply(Command::SetProperty {
                    node: id,
                    property: property.id.to_string(),
                    value,
                });
            }
        }

        section_header(ui, "Output");
        let mut output = node.output.clone();
        let edited = egui::ScrollArea::vertical()
            .max_height(260.0)
            .show(ui, |ui| {
                ui.add(
                    egui::TextEdit::multiline(&mut output)
                        .desired_rows(8)
                        .desired_width(f32::INFINITY),
                )
                .changed()
            })
            .inner;
        if edited {
            self.apply(Command::SetOutput { node: id, output });
        }

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            let running = node.status == NodeStatus::Running;
            let label = if running { "⏳ Running..." } else { "▶ Run" };
            if ui.add_enabled(!running, egui::Button::new(label)).clicked() {
                self.run_node(id);
            }
            if ui.button("🗑 Delete").clicked() {
                self.apply(Command::RequestDelete(id));
            }
        });
    }

    fn confirmation_dialog(&mut self, ctx: &egui::Context) {
        let Some(pending) = self.workspace.session().pending_confirmation() else {
            return;
        };
        let question = match pending {
            Confirmation::DeleteNode(id) => {
                let name = self
                    .workspace
                    .session()
                    .graph()
                    .node(id)
                    .map(|n| n.node_type.name())
                    .unwrap_or("this node");
                format!("Delete {}? Its connections are removed too.", name)
            }
            Confirmation::ClearWorkflow => "Reset the workflow? All outputs and edits are lost.".to_string(),
        };

        egui::Window::new("Confirm")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(question);
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Yes").clicked() {
                        self.apply(Command::Confirm);
                    }
                    if ui.button("Cancel").clicked() {
                        self.apply(Command::Decline);
                    }
                });
            });
    }

    fn brief_dialog(&mut self, ctx: &egui::Context) {
        if !self.workspace.awaiting_brief() {
            return;
        }
        egui::Window::new("Video brief")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label("No channel plan to start from. What is the video about?");
                ui.add_space(6.0);
                ui.label("Topic");
                ui.text_edit_singleline(&mut self.brief_topic);
                ui.label("Audience");
                ui.text_edit_singleline(&mut self.brief_audience);
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Start").clicked() {
                        self.workspace.provide_brief(&self.brief_topic, &self.brief_audience);
                    }
                    if ui.button("Skip").clicked() {
                        self.workspace.dismiss_brief();
                    }
                });
            });
    }

    fn report_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_report;
        let mut download = false;
        let session = self.workspace.session();
        let title = match session.mode() {
            Mode::Channel => "🎬 Channel Plan",
            Mode::Video => "🎬 Video Plan",
        };

        egui::Window::new(title)
            .open(&mut open)
            .default_size([640.0, 560.0])
            .show(ctx, |ui| {
                if ui.button("💾 Download (.md)").clicked() {
                    download = true;
                }
                ui.separator();
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let sections = report::sections(session.graph());
                    if sections.is_empty() {
                        ui.label("Nothing has been produced yet. Run the factory first.");
                    }
                    for section in sections {
                        ui.label(egui::RichText::new(section.title).color(section.color).strong().size(16.0));
                        ui.label(section.body);
                        ui.add_space(12.0);
                    }
                });
            });

        self.show_report = open;
        if download {
            self.download_report();
        }
    }
}

impl eframe::App for ChannelFactoryApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = ctx.input(|i| i.time);
        if self.driver.pump(&mut self.workspace, now) {
            self.show_report = true;
        }

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| self.menu_bar(ui));

        if self.show_palette {
            egui::SidePanel::left("node_library")
                .resizable(true)
                .default_width(200.0)
                .min_width(150.0)
                .show(ctx, |ui| self.palette(ui));
        }

        if self.show_properties {
            egui::SidePanel::right("properties")
                .resizable(true)
                .default_width(300.0)
                .min_width(220.0)
                .show(ctx, |ui| {
                    egui::ScrollArea::vertical().show(ui, |ui| self.properties(ui));
                });
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                // Read-only while the video brief is open
                let interactive = !self.workspace.awaiting_brief();
                let errors = crate::canvas::show(ui, self.workspace.session_mut(), interactive);
                if let Some(e) = errors.last() {
                    self.notice = Some(e.to_string());
                }
            });

        self.confirmation_dialog(ctx);
        self.brief_dialog(ctx);
        if self.show_report {
            self.report_window(ctx);
        }

        // Delete key removes the selected node, unless a text field has focus
        let typing = ctx.memory(|m| m.focused().is_some());
        if !typing && ctx.input(|i| i.key_pressed(egui::Key::Delete)) {
            if let Some(id) = self.workspace.session().selected() {
                self.apply(Command::RequestDelete(id));
            }
        }

        // Keep polling while calls are out
        if self.driver.is_busy() {
            ctx.request_repaint_after(std::time::Duration::from_millis(50));
        }
    }
}

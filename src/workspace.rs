//! The two planning modes and the handoff between them

use std::rc::Rc;

use crate::config::FactoryConfig;
use crate::launch::LaunchOptions;
use crate::persistence::{self, HandoffContext, KeyValueStore};
use crate::session::WorkflowSession;
use crate::templates::{Mode, TemplateSeed};

/// How entering a mode went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeEntry {
    /// A graph is on the canvas
    Ready,
    /// Video planning has nothing to start from; ask for a topic and audience
    NeedsBrief,
}

pub struct Workspace {
    store: Rc<dyn KeyValueStore>,
    config: FactoryConfig,
    launch_topic: Option<String>,
    session: WorkflowSession,
    awaiting_brief: bool,
}

impl Workspace {
    pub fn open(launch: LaunchOptions, store: Rc<dyn KeyValueStore>, config: FactoryConfig) -> Self {
        let placeholder = WorkflowSession::empty(launch.mode, TemplateSeed::default(), store.clone(), config.clone());
        let mut workspace = Self {
            store,
            config,
            launch_topic: launch.topic,
            session: placeholder,
            awaiting_brief: false,
        };
        workspace.enter(launch.mode);
        workspace
    }

    pub fn session(&self) -> &WorkflowSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut WorkflowSession {
        &mut self.session
    }

    pub fn mode(&self) -> Mode {
        self.session.mode()
    }

    pub fn awaiting_brief(&self) -> bool {
        self.awaiting_brief
    }

    /// Leave the current mode and rebuild the other one from scratch.
    ///
    /// Leaving channel planning records the handoff context for video planning.
    pub fn switch_mode(&mut self, mode: Mode) -> ModeEntry {
        if self.session.mode() == Mode::Channel {
            let handoff = HandoffContext::from_graph(self.session.graph());
            if !handoff.is_empty() {
                if let Err(e) = persistence::save_handoff(self.store.as_ref(), &handoff) {
                    log::warn!("Failed to save handoff context: {}", e);
                }
            }
        }
        log::info!("Switching to {} mode", mode.id());
        self.enter(mode)
    }

    fn enter(&mut self, mode: Mode) -> ModeEntry {
        self.awaiting_brief = false;
        match mode {
            Mode::Channel => {
                let seed = TemplateSeed {
                    topic: self.launch_topic.clone().unwrap_or_default(),
                    ..TemplateSeed::default()
                };
                self.session = WorkflowSession::open(mode, seed, self.store.clone(), self.config.clone());
                ModeEntry::Ready
            }
            Mode::Video => {
                let has_snapshot = persistence::load_snapshot(self.store.as_ref(), mode)
                    .is_some_and(|snapshot| !snapshot.nodes.is_empty());
                let handoff = persistence::load_handoff(self.store.as_ref());

                if !has_snapshot && handoff.is_none() {
                    self.session = WorkflowSession::empty(
                        mode,
                        TemplateSeed::default(),
                        self.store.clone(),
                        self.config.clone(),
                    );
                    self.awaiting_brief = true;
                    return ModeEntry::NeedsBrief;
                }

                let seed = handoff.map(seed_from_handoff).unwrap_or_default();
                self.session = WorkflowSession::open(mode, seed, self.store.clone(), self.config.clone());
                ModeEntry::Ready
            }
        }
    }

    /// Answer the video brief prompt and build the video graph
    pub fn provide_brief(&mut self, topic: &str, audience: &str) {
        let seed = TemplateSeed {
            topic: topic.trim().to_string(),
            audience: audience.trim().to_string(),
            channel_name: String::new(),
        };
        self.build_video(seed);
    }

    /// Build the video graph without a brief
    pub fn dismiss_brief(&mut self) {
        self.build_video(TemplateSeed::default());
    }

    fn build_video(&mut self, seed: TemplateSeed) {
        if !self.awaiting_brief {
            log::debug!("No brief was requested");
            return;
        }
        self.awaiting_brief = false;
        self.session = WorkflowSession::fresh(Mode::Video, seed, self.store.clone(), self.config.clone());
    }
}

fn seed_from_handoff(handoff: HandoffContext) -> TemplateSeed {
    TemplateSeed {
        topic: handoff.topic.unwrap_or_default(),
        audience: handoff.target_audience.unwrap_or_default(),
        channel_name: handoff.channel_name.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeStatus;
    use crate::persistence::MemoryStore;
    use crate::session::Command;
    use eframe::egui::Pos2;

    fn workspace(mode: Mode, topic: Option<&str>) -> Workspace {
        let launch = LaunchOptions {
            topic: topic.map(str::to_string),
            mode,
        };
        Workspace::open(launch, Rc::new(MemoryStore::new()), FactoryConfig::default())
    }

    #[test]
    fn channel_mode_is_seeded_from_launch_topic() {
        let ws = workspace(Mode::Channel, Some("retro gaming"));
        assert_eq!(ws.mode(), Mode::Channel);
        assert_eq!(ws.session().graph().node_count(), 8);
        assert_eq!(ws.session().topic(), Some("retro gaming"));
    }

    #[test]
    fn video_without_context_asks_for_brief_once() {
        let mut ws = workspace(Mode::Video, None);
        assert!(ws.awaiting_brief());
        assert!(ws.session().graph().is_empty());

        ws.provide_brief("desk setups", "remote workers");
        assert!(!ws.awaiting_brief());
        let brief = ws.session().graph().nodes_iter().next().unwrap();
        assert_eq!(brief.data.get("audience"), Some("remote workers"));

        assert_eq!(ws.switch_mode(Mode::Video), ModeEntry::Ready);
        assert_eq!(ws.session().graph().node_count(), 6);
    }

    #[test]
    fn edits_made_before_the_brief_do_not_replace_the_template() {
        let mut ws = workspace(Mode::Video, None);
        let _ = ws.session_mut().apply(Command::DropNode {
            type_key: "translator".into(),
            pos: Pos2::new(300.0, 300.0),
        });

        ws.provide_brief("desk setups", "remote workers");
        assert_eq!(ws.session().graph().node_count(), 6);
        let brief = ws.session().graph().nodes_iter().next().unwrap();
        assert_eq!(brief.data.get("audience"), Some("remote workers"));

        ws.switch_mode(Mode::Channel);
        ws.switch_mode(Mode::Video);
        assert_eq!(ws.session().graph().node_count(), 6);
    }

    #[test]
    fn dismissing_brief_builds_blank_video_graph() {
        let mut ws = workspace(Mode::Video, None);
        ws.dismiss_brief();
        assert_eq!(ws.session().graph().node_count(), 6);
        assert!(ws.session().graph().nodes_iter().all(|n| n.data.topic().is_none()));
    }

    #[test]
    fn leaving_channel_hands_context_to_video() {
        let mut ws = workspace(Mode::Channel, Some("retro gaming"));
        let session = ws.session_mut();
        session
            .apply(Command::NodeExecuted {
                node: 1,
                result: Ok("1. **Pixel Past**: old games, new eyes\n2. Cartridge Club".into()),
            })
            .unwrap();
        assert_eq!(session.graph().node(1).unwrap().status, NodeStatus::Completed);

        assert_eq!(ws.switch_mode(Mode::Video), ModeEntry::Ready);
        assert!(!ws.awaiting_brief());
        let brief = ws.session().graph().nodes_iter().next().unwrap();
        assert_eq!(brief.data.get("topic"), Some("retro gaming"));
        assert_eq!(brief.data.get("channel"), Some("Pixel Past"));
    }

    #[test]
    fn modes_keep_separate_graphs() {
        let mut ws = workspace(Mode::Channel, Some("retro gaming"));
        ws.session_mut()
            .apply(Command::SetOutput { node: 2, output: "@pixelpast".into() })
            .unwrap();
        ws.switch_mode(Mode::Video);
        assert_eq!(ws.session().graph().node_count(), 6);

        ws.switch_mode(Mode::Channel);
        assert_eq!(ws.session().graph().node(2).unwrap().output, "@pixelpast");
        assert_eq!(ws.session().viewport().scale(), 0.8);
    }
}

//! Declarative starting graphs for each planning mode

use eframe::egui::Pos2;
use serde::{Deserialize, Serialize};

use crate::graph::NodeGraph;
use crate::model::Model;
use crate::nodes::NodeType;

/// The two independent planning graphs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Channel,
    Video,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Channel, Mode::Video];

    pub fn id(&self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Video => "video",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Channel => "Channel Planning",
            Self::Video => "Video Planning",
        }
    }

    /// Storage slot holding this mode's workflow snapshot
    pub fn storage_key(&self) -> &'static str {
        match self {
            Self::Channel => "channel_factory_workflow_channel",
            Self::Video => "channel_factory_workflow_video",
        }
    }

    pub fn template(&self) -> &'static GraphTemplate {
        match self {
            Self::Channel => &CHANNEL_TEMPLATE,
            Self::Video => &VIDEO_TEMPLATE,
        }
    }
}

/// Values poured into a template's seeded properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSeed {
    pub topic: String,
    pub audience: String,
    pub channel_name: String,
}

impl TemplateSeed {
    pub fn with_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    fn value(&self, field: SeedField) -> &str {
        match field {
            SeedField::Topic => &self.topic,
            SeedField::Audience => &self.audience,
            SeedField::ChannelName => &self.channel_name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedField {
    Topic,
    Audience,
    ChannelName,
}

#[derive(Debug, Clone, Copy)]
pub struct TemplateNode {
    pub node_type: NodeType,
    pub x: f32,
    pub y: f32,
    /// `(property id, seed value)` pairs written at bootstrap
    pub seeds: &'static [(&'static str, SeedField)],
}

/// Node list plus connections between node indices
#[derive(Debug, Clone, Copy)]
pub struct GraphTemplate {
    pub nodes: &'static [TemplateNode],
    pub connections: &'static [(usize, usize)],
}

// Three columns: identity, visuals, content
const COL_1: f32 = 350.0;
const COL_2: f32 = 750.0;
const COL_3: f32 = 1150.0;
const COL_4: f32 = 1550.0;
const START_Y: f32 = 100.0;
const GAP_Y: f32 = 250.0;

const fn at(node_type: NodeType, x: f32, y: f32, seeds: &'static [(&'static str, SeedField)]) -> TemplateNode {
    TemplateNode { node_type, x, y, seeds }
}

pub const CHANNEL_TEMPLATE: GraphTemplate = GraphTemplate {
    nodes: &[
        at(NodeType::ChannelName, COL_1, START_Y, &[("topic", SeedField::Topic)]),
        at(NodeType::ChannelHandle, COL_1, START_Y + GAP_Y, &[]),
        at(NodeType::TargetAudience, COL_1, START_Y + GAP_Y * 2.0, &[("topic", SeedField::Topic)]),
        at(NodeType::ProfilePic, COL_2, START_Y, &[]),
        at(NodeType::BannerImage, COL_2, START_Y + GAP_Y, &[]),
        at(NodeType::TopicResearch, COL_3, START_Y, &[("topic", SeedField::Topic)]),
        at(NodeType::VideoMetadata, COL_3, START_Y + GAP_Y, &[]),
        at(NodeType::ScriptGen, COL_3, START_Y + GAP_Y * 2.0, &[]),
    ],
    connections: &[
        (0, 1), // name -> handle
        (0, 2), // name -> target audience
        (0, 3), // name -> profile
        (0, 4), // name -> banner
        (2, 5), // target -> research
        (5, 6), // research -> metadata
        (6, 7), // metadata -> script
    ],
};

pub const VIDEO_TEMPLATE: GraphTemplate = GraphTemplate {
    nodes: &[
        at(
            NodeType::VideoBrief,
            COL_1,
            START_Y,
            &[
                ("topic", SeedField::Topic),
                ("audience", SeedField::Audience),
                ("channel", SeedField::ChannelName),
            ],
        ),
        at(NodeType::HookIdeas, COL_2, START_Y, &[]),
        at(NodeType::VideoMetadata, COL_2, START_Y + GAP_Y, &[]),
        at(NodeType::ThumbnailCopy, COL_3, START_Y + GAP_Y, &[]),
        at(NodeType::ScriptGen, COL_3, START_Y, &[]),
        at(NodeType::Translator, COL_4, START_Y, &[]),
    ],
    connections: &[
        (0, 1), // brief -> hooks
        (0, 2), // brief -> metadata
        (2, 3), // metadata -> thumbnail
        (1, 4), // hooks -> script
        (2, 4), // metadata -> script
        (4, 5), // script -> translator
    ],
};

/// Build a fresh graph from a template
pub fn bootstrap(template: &GraphTemplate, seed: &TemplateSeed, default_model: Model) -> NodeGraph {
    let mut graph = NodeGraph::new().with_default_model(default_model);
    let ids: Vec<_> = template
        .nodes
        .iter()
        .map(|spec| {
            let id = match graph.create_node(spec.node_type, Pos2::new(spec.x, spec.y)) {
                Ok(id) => id,
                Err(e) => {
                    log::warn!("Template node {} skipped: {}", spec.node_type.key(), e);
                    return None;
                }
            };
            if let Some(node) = graph.node_mut(id) {
                for (property, field) in spec.seeds {
                    let value = seed.value(*field);
                    if !value.is_empty() {
                        if let Err(e) = node.data.set(property, value) {
                            log::warn!("Template seed skipped: {}", e);
                        }
                    }
                }
            }
            Some(id)
        })
        .collect();

    for &(from, to) in template.connections {
        let (Some(&Some(from)), Some(&Some(to))) = (ids.get(from), ids.get(to)) else {
            log::warn!("Template connection {} -> {} is out of range", from, to);
            continue;
        };
        if let Err(e) = graph.connect(from, to) {
            log::warn!("Template connection rejected: {}", e);
        }
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Connection;

    #[test]
    fn channel_template_shape() {
        let graph = bootstrap(&CHANNEL_TEMPLATE, &TemplateSeed::with_topic("solo camping"), Model::Gemini);
        assert_eq!(graph.node_count(), 8);
        assert_eq!(graph.connections_iter().count(), 7);

        let name = graph.nodes_iter().next().unwrap();
        assert_eq!(name.node_type, NodeType::ChannelName);
        assert_eq!(name.data.topic(), Some("solo camping"));
        assert!(graph.connections_iter().any(|c| *c == Connection { from: 1, to: 2 }));
        assert!(graph.connections_iter().any(|c| *c == Connection { from: 1, to: 3 }));

        let target = graph.node(3).unwrap();
        assert_eq!(target.node_type, NodeType::TargetAudience);
        assert_eq!(target.data.topic(), Some("solo camping"));
        assert_eq!(target.position, Pos2::new(COL_1, START_Y + GAP_Y * 2.0));
    }

    #[test]
    fn video_template_seeds_brief() {
        let seed = TemplateSeed {
            topic: "budget travel".into(),
            audience: "students".into(),
            channel_name: "Cheap Trips".into(),
        };
        let graph = bootstrap(&VIDEO_TEMPLATE, &seed, Model::Chatgpt);
        assert_eq!(graph.node_count(), 6);
        let brief = graph.nodes_iter().next().unwrap();
        assert_eq!(brief.data.get("audience"), Some("students"));
        assert_eq!(brief.data.get("channel"), Some("Cheap Trips"));
        assert_eq!(brief.model, Model::Chatgpt);
    }

    #[test]
    fn empty_seed_leaves_properties_blank() {
        let graph = bootstrap(&CHANNEL_TEMPLATE, &TemplateSeed::default(), Model::Gemini);
        assert!(graph.nodes_iter().all(|n| n.data.topic().is_none()));
    }

    #[test]
    fn mode_ids_and_keys_are_distinct() {
        assert_eq!(Mode::from_id("video"), Some(Mode::Video));
        assert_eq!(Mode::from_id("podcast"), None);
        assert_ne!(Mode::Channel.storage_key(), Mode::Video.storage_key());
    }
}

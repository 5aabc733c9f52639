//! Node types and their definitions

use std::collections::BTreeMap;

use eframe::egui::Color32;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// All available node types in the factory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    // Identity
    ChannelName,
    ChannelHandle,
    TargetAudience,

    // Visuals
    ProfilePic,
    BannerImage,

    // Content
    TopicResearch,
    VideoMetadata,
    ScriptGen,

    // Global
    Translator,

    // Video planning
    VideoBrief,
    HookIdeas,
    ThumbnailCopy,
}

/// Palette grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Identity,
    Visuals,
    Content,
    Global,
    Video,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Identity,
        Category::Visuals,
        Category::Content,
        Category::Global,
        Category::Video,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Identity => "🪪 Identity",
            Self::Visuals => "🎨 Visuals",
            Self::Content => "📝 Content",
            Self::Global => "🌐 Global",
            Self::Video => "🎬 Video",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Text,
    Select(&'static [&'static str]),
}

/// One configurable field of a node type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySpec {
    pub id: &'static str,
    pub label: &'static str,
    pub kind: PropertyKind,
}

impl PropertySpec {
    const fn text(id: &'static str, label: &'static str) -> Self {
        Self {
            id,
            label,
            kind: PropertyKind::Text,
        }
    }

    const fn select(id: &'static str, label: &'static str, options: &'static [&'static str]) -> Self {
        Self {
            id,
            label,
            kind: PropertyKind::Select(options),
        }
    }
}

/// Static display metadata and property schema for a node type
#[derive(Debug, Clone, Copy)]
pub struct NodeTypeDefinition {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub color: Color32,
    pub category: Category,
    pub properties: &'static [PropertySpec],
}

const VIBES: &[&str] = &["Modern", "Cute", "Professional"];
const IDEA_COUNTS: &[&str] = &["3", "5", "10"];
const FORMATS: &[&str] = &["Shorts", "Long-form"];
const DURATIONS: &[&str] = &["1 min", "3 min", "5 min+"];
const LANGUAGES: &[&str] = &["English", "Japanese", "Spanish"];
const THUMBNAIL_STYLES: &[&str] = &["Bold", "Curious", "Minimal"];

const CHANNEL_NAME: NodeTypeDefinition = NodeTypeDefinition {
    key: "channel-name",
    name: "1. Channel Name",
    icon: "✍",
    color: Color32::from_rgb(255, 107, 107),
    category: Category::Identity,
    properties: &[PropertySpec::text("topic", "Topic / keyword")],
};

const CHANNEL_HANDLE: NodeTypeDefinition = NodeTypeDefinition {
    key: "channel-handle",
    name: "2. Handle (@)",
    icon: "@",
    color: Color32::from_rgb(255, 135, 135),
    category: Category::Identity,
    properties: &[],
};

const TARGET_AUDIENCE: NodeTypeDefinition = NodeTypeDefinition {
    key: "target-audience",
    name: "3. Target Audience",
    icon: "👥",
    color: Color32::from_rgb(255, 165, 165),
    category: Category::Identity,
    properties: &[
        PropertySpec::text("age", "Primary age group"),
        PropertySpec::text("topic", "Topic (optional)"),
    ],
};

const PROFILE_PIC: NodeTypeDefinition = NodeTypeDefinition {
    key: "profile-pic",
    name: "4. Profile Prompt",
    icon: "👤",
    color: Color32::from_rgb(78, 205, 196),
    category: Category::Visuals,
    properties: &[PropertySpec::select("vibe", "Vibe", VIBES)],
};

const BANNER_IMAGE: NodeTypeDefinition = NodeTypeDefinition {
    key: "banner-image",
    name: "5. Banner Plan",
    icon: "🖼",
    color: Color32::from_rgb(69, 183, 175),
    category: Category::Visuals,
    properties: &[],
};

const TOPIC_RESEARCH: NodeTypeDefinition = NodeTypeDefinition {
    key: "topic-research",
    name: "6. Topic Research",
    icon: "🔍",
    color: Color32::from_rgb(255, 230, 109),
    category: Category::Content,
    properties: &[
        PropertySpec::select("count", "Number of ideas", IDEA_COUNTS),
        PropertySpec::text("topic", "Topic"),
    ],
};

const VIDEO_METADATA: NodeTypeDefinition = NodeTypeDefinition {
    key: "video-metadata",
    name: "7. Video Metadata",
    icon: "📹",
    color: Color32::from_rgb(255, 217, 61),
    category: Category::Content,
    properties: &[PropertySpec::select("format", "Format", FORMATS)],
};

const SCRIPT_GEN: NodeTypeDefinition = NodeTypeDefinition {
    key: "script-gen",
    name: "8. Script",
    icon: "📄",
    color: Color32::from_rgb(247, 201, 72),
    category: Category::Content,
    properties: &[PropertySpec::select("duration", "Length", DURATIONS)],
};

const TRANSLATOR: NodeTypeDefinition = NodeTypeDefinition {
    key: "translator",
    name: "9. Translator (Global)",
    icon: "🌐",
    color: Color32::from_rgb(160, 108, 213),
    category: Category::Global,
    properties: &[PropertySpec::select("lang", "Target language", LANGUAGES)],
};

const VIDEO_BRIEF: NodeTypeDefinition = NodeTypeDefinition {
    key: "video-brief",
    name: "Video Brief",
    icon: "🎬",
    color: Color32::from_rgb(52, 152, 219),
    category: Category::Video,
    properties: &[
        PropertySpec::text("topic", "Video topic"),
        PropertySpec::text("audience", "Audience"),
        PropertySpec::text("channel", "Channel name"),
    ],
};

const HOOK_IDEAS: NodeTypeDefinition = NodeTypeDefinition {
    key: "hook-ideas",
    name: "Opening Hooks",
    icon: "🪝",
    color: Color32::from_rgb(93, 173, 226),
    category: Category::Video,
    properties: &[PropertySpec::select("count", "Number of hooks", IDEA_COUNTS)],
};

const THUMBNAIL_COPY: NodeTypeDefinition = NodeTypeDefinition {
    key: "thumbnail-copy",
    name: "Thumbnail Copy",
    icon: "🔠",
    color: Color32::from_rgb(133, 193, 233),
    category: Category::Video,
    properties: &[PropertySpec::select("style", "Style", THUMBNAIL_STYLES)],
};

impl NodeType {
    pub const ALL: [NodeType; 12] = [
        NodeType::ChannelName,
        NodeType::ChannelHandle,
        NodeType::TargetAudience,
        NodeType::ProfilePic,
        NodeType::BannerImage,
        NodeType::TopicResearch,
        NodeType::VideoMetadata,
        NodeType::ScriptGen,
        NodeType::Translator,
        NodeType::VideoBrief,
        NodeType::HookIdeas,
        NodeType::ThumbnailCopy,
    ];

    pub fn definition(&self) -> &'static NodeTypeDefinition {
        match self {
            Self::ChannelName => &CHANNEL_NAME,
            Self::ChannelHandle => &CHANNEL_HANDLE,
            Self::TargetAudience => &TARGET_AUDIENCE,
            Self::ProfilePic => &PROFILE_PIC,
            Self::BannerImage => &BANNER_IMAGE,
            Self::TopicResearch => &TOPIC_RESEARCH,
            Self::VideoMetadata => &VIDEO_METADATA,
            Self::ScriptGen => &SCRIPT_GEN,
            Self::Translator => &TRANSLATOR,
            Self::VideoBrief => &VIDEO_BRIEF,
            Self::HookIdeas => &HOOK_IDEAS,
            Self::ThumbnailCopy => &THUMBNAIL_COPY,
        }
    }

    /// Look up a type by its registry key, e.g. `"channel-name"`
    pub fn from_key(key: &str) -> Result<Self, GraphError> {
        Self::ALL
            .into_iter()
            .find(|t| t.key() == key)
            .ok_or_else(|| GraphError::UnknownNodeType(key.to_string()))
    }

    pub fn key(&self) -> &'static str {
        self.definition().key
    }

    /// Get the display name for this node type
    pub fn name(&self) -> &'static str {
        self.definition().name
    }

    pub fn color(&self) -> Color32 {
        self.definition().color
    }

    pub fn properties(&self) -> &'static [PropertySpec] {
        self.definition().properties
    }

    /// Types whose model output is an image prompt rather than finished text
    pub fn is_image_prompt(&self) -> bool {
        matches!(self, Self::ProfilePic | Self::BannerImage)
    }

    pub fn in_category(category: Category) -> impl Iterator<Item = NodeType> {
        Self::ALL
            .into_iter()
            .filter(move |t| t.definition().category == category)
    }
}

/// Typed configuration for each node type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    ChannelName { topic: String },
    ChannelHandle {},
    TargetAudience { age: String, topic: String },
    ProfilePic { vibe: String },
    BannerImage {},
    TopicResearch { count: String, topic: String },
    VideoMetadata { format: String },
    ScriptGen { duration: String },
    Translator { lang: String },
    VideoBrief { topic: String, audience: String, channel: String },
    HookIdeas { count: String },
    ThumbnailCopy { style: String },
}

impl NodeData {
    /// Empty values for every property of the type
    pub fn for_type(node_type: NodeType) -> Self {
        match node_type {
            NodeType::ChannelName => Self::ChannelName { topic: String::new() },
            NodeType::ChannelHandle => Self::ChannelHandle {},
            NodeType::TargetAudience => Self::TargetAudience { age: String::new(), topic: String::new() },
            NodeType::ProfilePic => Self::ProfilePic { vibe: String::new() },
            NodeType::BannerImage => Self::BannerImage {},
            NodeType::TopicResearch => Self::TopicResearch { count: String::new(), topic: String::new() },
            NodeType::VideoMetadata => Self::VideoMetadata { format: String::new() },
            NodeType::ScriptGen => Self::ScriptGen { duration: String::new() },
            NodeType::Translator => Self::Translator { lang: String::new() },
            NodeType::VideoBrief => Self::VideoBrief {
                topic: String::new(),
                audience: String::new(),
                channel: String::new(),
            },
            NodeType::HookIdeas => Self::HookIdeas { count: String::new() },
            NodeType::ThumbnailCopy => Self::ThumbnailCopy { style: String::new() },
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Self::ChannelName { .. } => NodeType::ChannelName,
            Self::ChannelHandle {} => NodeType::ChannelHandle,
            Self::TargetAudience { .. } => NodeType::TargetAudience,
            Self::ProfilePic { .. } => NodeType::ProfilePic,
            Self::BannerImage {} => NodeType::BannerImage,
            Self::TopicResearch { .. } => NodeType::TopicResearch,
            Self::VideoMetadata { .. } => NodeType::VideoMetadata,
            Self::ScriptGen { .. } => NodeType::ScriptGen,
            Self::Translator { .. } => NodeType::Translator,
            Self::VideoBrief { .. } => NodeType::VideoBrief,
            Self::HookIdeas { .. } => NodeType::HookIdeas,
            Self::ThumbnailCopy { .. } => NodeType::ThumbnailCopy,
        }
    }

    /// Read a property by its schema id
    pub fn get(&self, property: &str) -> Option<&str> {
        let value = match (self, property) {
            (Self::ChannelName { topic }, "topic") => topic,
            (Self::TargetAudience { age, .. }, "age") => age,
            (Self::TargetAudience { topic, .. }, "topic") => topic,
            (Self::ProfilePic { vibe }, "vibe") => vibe,
            (Self::TopicResearch { count, .. }, "count") => count,
            (Self::TopicResearch { topic, .. }, "topic") => topic,
            (Self::VideoMetadata { format }, "format") => format,
            (Self::ScriptGen { duration }, "duration") => duration,
            (Self::Translator { lang }, "lang") => lang,
            (Self::VideoBrief { topic, .. }, "topic") => topic,
            (Self::VideoBrief { audience, .. }, "audience") => audience,
            (Self::VideoBrief { channel, .. }, "channel") => channel,
            (Self::HookIdeas { count }, "count") => count,
            (Self::ThumbnailCopy { style }, "style") => style,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Write a property by its schema id
    pub fn set(&mut self, property: &str, value: impl Into<String>) -> Result<(), GraphError> {
        let node_type = self.node_type();
        let slot = match (self, property) {
            (Self::ChannelName { topic }, "topic") => topic,
            (Self::TargetAudience { age, .. }, "age") => age,
            (Self::TargetAudience { topic, .. }, "topic") => topic,
            (Self::ProfilePic { vibe }, "vibe") => vibe,
            (Self::TopicResearch { count, .. }, "count") => count,
            (Self::TopicResearch { topic, .. }, "topic") => topic,
            (Self::VideoMetadata { format }, "format") => format,
            (Self::ScriptGen { duration }, "duration") => duration,
            (Self::Translator { lang }, "lang") => lang,
            (Self::VideoBrief { topic, .. }, "topic") => topic,
            (Self::VideoBrief { audience, .. }, "audience") => audience,
            (Self::VideoBrief { channel, .. }, "channel") => channel,
            (Self::HookIdeas { count }, "count") => count,
            (Self::ThumbnailCopy { style }, "style") => style,
            _ => {
                return Err(GraphError::UnknownProperty {
                    node_type: node_type.key().to_string(),
                    property: property.to_string(),
                })
            }
        };
        *slot = value.into();
        Ok(())
    }

    /// Flatten into `property id -> value`, keyed exactly by the type's schema
    pub fn fields(&self) -> BTreeMap<String, String> {
        self.node_type()
            .properties()
            .iter()
            .map(|spec| (spec.id.to_string(), self.get(spec.id).unwrap_or_default().to_string()))
            .collect()
    }

    /// Rebuild from a flattened map; unknown keys are ignored, missing ones stay empty
    pub fn from_fields(node_type: NodeType, fields: &BTreeMap<String, String>) -> Self {
        let mut data = Self::for_type(node_type);
        for spec in node_type.properties() {
            if let Some(value) = fields.get(spec.id) {
                if let Err(e) = data.set(spec.id, value.clone()) {
                    log::warn!("Restored field skipped: {}", e);
                }
            }
        }
        data
    }

    /// The topic this node was seeded with, if it carries one
    pub fn topic(&self) -> Option<&str> {
        self.get("topic").filter(|t| !t.trim().is_empty())
    }
}

//! Markdown report of everything a workflow produced

use std::sync::LazyLock;

use chrono::{DateTime, TimeZone};
use eframe::egui::Color32;
use regex::Regex;

use crate::graph::{NodeGraph, NodeStatus};
use crate::templates::Mode;

static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img src="([^"]+)"[^>]*>"#).expect("valid img regex"));
static BREAK_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<br\s*/?>").expect("valid br regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

const FALLBACK_TOPIC: &str = "YouTube_Channel";

/// One finished node as it appears in the report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub title: &'static str,
    pub color: Color32,
    pub body: String,
}

/// Completed outputs in creation order. Empty and failed nodes are left out.
pub fn sections(graph: &NodeGraph) -> Vec<ReportSection> {
    graph
        .nodes_iter()
        .filter(|n| !n.output.trim().is_empty() && n.status != NodeStatus::Error)
        .map(|n| ReportSection {
            title: n.node_type.name(),
            color: n.node_type.color(),
            body: to_markdown(&n.output),
        })
        .collect()
}

/// Inline HTML left in outputs becomes Markdown
pub fn to_markdown(output: &str) -> String {
    let text = IMG_TAG.replace_all(output, "\n![Generated Image]($1)\n");
    BREAK_TAG.replace_all(&text, "\n").into_owned()
}

fn topic_or_fallback(topic: Option<&str>) -> &str {
    topic.map(str::trim).filter(|t| !t.is_empty()).unwrap_or(FALLBACK_TOPIC)
}

fn heading(mode: Mode) -> &'static str {
    match mode {
        Mode::Channel => "Channel Plan",
        Mode::Video => "Video Plan",
    }
}

pub fn render_markdown<Tz>(graph: &NodeGraph, mode: Mode, topic: Option<&str>, generated_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut doc = format!("# {}: {}\n\n", heading(mode), topic_or_fallback(topic));
    doc.push_str(&format!(
        "> Generated: {}\n\n---\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    for section in sections(graph) {
        doc.push_str(&format!("## {}\n\n{}\n\n---\n\n", section.title, section.body));
    }
    doc
}

/// e.g. `Channel_Plan_urban_beekeeping.md`
pub fn file_name(mode: Mode, topic: Option<&str>) -> String {
    let topic = WHITESPACE.replace_all(topic_or_fallback(topic), "_");
    format!("{}_{}.md", heading(mode).replace(' ', "_"), topic)
}

/// Browser script that downloads `markdown` as `file_name` through a data URL
pub fn download_script(markdown: &str, file_name: &str) -> Result<String, serde_json::Error> {
    use base64::Engine;

    let encoded = base64::engine::general_purpose::STANDARD.encode(markdown.as_bytes());
    let file_name = serde_json::to_string(file_name)?;
    Ok(format!(
        "const link = document.createElement('a');\n\
         link.href = 'data:text/markdown;charset=utf-8;base64,{encoded}';\n\
         link.download = {file_name};\n\
         link.click();\n"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use eframe::egui::Pos2;

    use crate::nodes::NodeType;

    fn finished_graph() -> NodeGraph {
        let mut graph = NodeGraph::new();
        let name = graph.create_node(NodeType::ChannelName, Pos2::ZERO).unwrap();
        let pic = graph.create_node(NodeType::ProfilePic, Pos2::ZERO).unwrap();
        let failed = graph.create_node(NodeType::ScriptGen, Pos2::ZERO).unwrap();
        graph.create_node(NodeType::Translator, Pos2::ZERO).unwrap();

        let node = graph.node_mut(name).unwrap();
        node.output = "1. Hive Minds<br>2. Bee Local".into();
        node.status = NodeStatus::Completed;
        let node = graph.node_mut(pic).unwrap();
        node.output = "**Prompt:** a bee\n<img src=\"https://img.example/bee.png\" style=\"max-width:100%\">".into();
        node.status = NodeStatus::Completed;
        let node = graph.node_mut(failed).unwrap();
        node.output = "Error: quota exceeded".into();
        node.status = NodeStatus::Error;
        graph
    }

    #[test]
    fn report_lists_finished_nodes_only() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let doc = render_markdown(&finished_graph(), Mode::Channel, Some("urban beekeeping"), &at);

        assert!(doc.starts_with("# Channel Plan: urban beekeeping\n\n> Generated: 2024-05-01 09:30:00\n\n---\n\n"));
        assert!(doc.contains("## 1. Channel Name\n\n1. Hive Minds\n2. Bee Local\n\n---\n\n"));
        assert!(doc.contains("![Generated Image](https://img.example/bee.png)"));
        assert!(!doc.contains("<img"));
        assert!(!doc.contains("8. Script"));
        assert!(!doc.contains("9. Translator"));
        assert_eq!(doc.matches("## ").count(), 2);
    }

    #[test]
    fn video_report_without_topic_uses_fallback() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let doc = render_markdown(&NodeGraph::new(), Mode::Video, None, &at);
        assert!(doc.starts_with("# Video Plan: YouTube_Channel\n"));
    }

    #[test]
    fn file_names_collapse_whitespace() {
        assert_eq!(
            file_name(Mode::Channel, Some("urban  bee\tkeeping")),
            "Channel_Plan_urban_bee_keeping.md"
        );
        assert_eq!(file_name(Mode::Video, Some("  ")), "Video_Plan_YouTube_Channel.md");
    }

    #[test]
    fn download_script_quotes_the_file_name() {
        let script = download_script("# Plan", r"Video_Plan_it's_a\.md").unwrap();
        assert!(script.contains(r#"link.download = "Video_Plan_it's_a\\.md";"#));
        assert!(script.contains("base64,IyBQbGFu'"));
    }
}

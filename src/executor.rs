//! Node graph execution engine
//!
//! A node runs by collecting the outputs of the nodes wired into it, turning them
//! and its own properties into a prompt, and handing that prompt to a
//! [`ModelClient`]. The model call is the only suspension point. A whole-graph run
//! walks the nodes strictly one after another in creation order.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::{EditorError, ModelError};
use crate::graph::{Node, NodeGraph, NodeId, NodeStatus};
use crate::model::{Model, ModelClient};
use crate::nodes::NodeType;
use crate::session::{Command, WorkflowSession};

/// A `Topic:` line left in an upstream output
static TOPIC_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)Topic:[ \t]*(.+)$").expect("valid topic regex"));

const UNDECIDED_TOPIC: &str = "an undecided topic";

/// Labelled blocks of upstream output, in connection insertion order
pub fn gather_context(graph: &NodeGraph, id: NodeId) -> String {
    graph
        .incoming(id)
        .filter_map(|c| graph.node(c.from))
        .map(|source| format!("[Reference: {}]\n{}", source.node_type.name(), source.output))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Best-effort topic scraped out of context text
pub fn scrape_topic(context: &str) -> Option<&str> {
    TOPIC_LINE
        .captures(context)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|t| !t.is_empty())
}

fn or_default<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(fallback)
}

/// The type-specific instruction, without context
fn instruction(node: &Node, context: &str) -> String {
    let data = &node.data;
    let topic = data.topic();

    match node.node_type {
        NodeType::ChannelName => format!(
            "Suggest 5 creative YouTube channel names for the topic '{}'. Include a short brand concept for each.",
            topic.unwrap_or(UNDECIDED_TOPIC)
        ),
        NodeType::ChannelHandle => {
            "Based on the channel name ideas above, suggest 5 English IDs that could be used as a YouTube handle (@)."
                .to_string()
        }
        NodeType::TargetAudience => {
            let subject = scrape_topic(context).or(topic).unwrap_or("a YouTube channel");
            let mut prompt = format!(
                "Analyze the main target audience (age, gender, interests) for the topic '{subject}' as a persona."
            );
            if let Some(age) = data.get("age").filter(|a| !a.trim().is_empty()) {
                prompt.push_str(&format!(" Focus on viewers aged {}.", age.trim()));
            }
            prompt
        }
        NodeType::ProfilePic => format!(
            "Write a simple, clear English prompt for generating a YouTube profile picture (logo) that fits the channel's mood.\n\
             (Format: \"A minimalist logo of...\", output only the prompt without explanation)\n\
             Style: {}",
            or_default(data.get("vibe"), "Modern")
        ),
        NodeType::BannerImage => "Write a high-quality English prompt for generating YouTube channel art (banner).\n\
             (Format: \"Wide banner image showing...\", output only the prompt without explanation)"
            .to_string(),
        NodeType::TopicResearch => format!(
            "Analyze {} killer content ideas that currently get strong views on YouTube for the topic '{}'.",
            or_default(data.get("count"), "5"),
            topic.or_else(|| scrape_topic(context)).unwrap_or(UNDECIDED_TOPIC)
        ),
        NodeType::VideoMetadata => {
            let mut prompt = "Pick the single best idea from the content planned above and write a click-worthy \
                              video title, description and tag set."
                .to_string();
            if let Some(format) = data.get("format").filter(|f| !f.trim().is_empty()) {
                prompt.push_str(&format!(" Format: {}.", format.trim()));
            }
            prompt
        }
        NodeType::ScriptGen => format!(
            "Write an intro, body and outro script for the selected video. Length: {}",
            or_default(data.get("duration"), "1 min")
        ),
        NodeType::Translator => format!(
            "Translate everything above into {}.",
            or_default(data.get("lang"), "English")
        ),
        NodeType::VideoBrief => format!(
            "Write a one-page brief for a single video about '{}' for the channel '{}', aimed at {}. \
             Cover the angle, the promise to the viewer and the key points.",
            topic.unwrap_or(UNDECIDED_TOPIC),
            or_default(data.get("channel"), "our channel"),
            or_default(data.get("audience"), "a general audience")
        ),
        NodeType::HookIdeas => format!(
            "Write {} opening hooks for the first 15 seconds of the video described above.",
            or_default(data.get("count"), "5")
        ),
        NodeType::ThumbnailCopy => format!(
            "Write 5 short thumbnail text options in a {} style for the video above. Keep each under five words.",
            or_default(data.get("style"), "Bold")
        ),
    }
}

/// Full prompt for a node: upstream context first, then the instruction
pub fn build_prompt(node: &Node, context: &str) -> String {
    let prompt = instruction(node, context);
    if context.is_empty() {
        prompt
    } else {
        format!("{context}\n\n{prompt}")
    }
}

/// Shape the raw model answer into the node's output
pub fn render_output(node_type: NodeType, raw: &str) -> String {
    if node_type.is_image_prompt() {
        let clean: String = raw.chars().filter(|c| *c != '"' && *c != '\'').collect();
        format!(
            "**Prompt:** {}\n\n**Image:** not generated here. Paste the prompt into an image model.",
            clean.trim()
        )
    } else {
        raw.to_string()
    }
}

/// Write a finished call into its node
pub(crate) fn store_result(node: &mut Node, result: Result<String, ModelError>) {
    match result {
        Ok(raw) => {
            node.output = render_output(node.node_type, &raw);
            node.status = NodeStatus::Completed;
            log::info!("Node {} ({}) completed", node.id, node.node_type.key());
        }
        Err(e) => {
            log::warn!("Node {} ({}) failed: {}", node.id, node.node_type.key(), e);
            node.output = format!("Error: {e}");
            node.status = NodeStatus::Error;
        }
    }
}

/// A model call ready to be issued, detached from the session
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCall {
    pub node: NodeId,
    pub model: Model,
    pub prompt: String,
}

impl PreparedCall {
    pub async fn invoke(&self, client: &dyn ModelClient) -> Result<String, ModelError> {
        client.call(self.model, &self.prompt).await
    }
}

/// Mark the node running and build its call.
///
/// The running status is visible before anything is awaited. The result goes
/// back in through [`Command::NodeExecuted`].
pub fn prepare(session: &mut WorkflowSession, id: NodeId) -> Result<PreparedCall, EditorError> {
    session.mark_running(id)?;
    let graph = session.graph();
    let node = graph.try_node(id)?;
    let context = gather_context(graph, id);
    log::debug!("Node {} prompt built with {} bytes of context", id, context.len());
    Ok(PreparedCall {
        node: id,
        model: node.model,
        prompt: build_prompt(node, &context),
    })
}

/// Run one node to completion. Model failures end up in the node, not in `Err`.
pub async fn execute_node(
    session: &mut WorkflowSession,
    client: &dyn ModelClient,
    id: NodeId,
) -> Result<NodeStatus, EditorError> {
    let call = prepare(session, id)?;
    let result = call.invoke(client).await;
    session.apply(Command::NodeExecuted { node: id, result })?;
    Ok(session.graph().try_node(id)?.status)
}

/// Nodes still to visit in a whole-graph run, in creation order
#[derive(Debug, Clone, Default)]
pub struct RunQueue {
    pending: VecDeque<NodeId>,
}

impl RunQueue {
    pub fn new(graph: &NodeGraph) -> Self {
        Self {
            pending: graph.nodes_iter().map(|n| n.id).collect(),
        }
    }

    /// Next node to run, skipping ones deleted or already running since the run began
    pub fn next(&mut self, graph: &NodeGraph) -> Option<NodeId> {
        while let Some(id) = self.pending.pop_front() {
            match graph.node(id) {
                Some(node) if node.status != NodeStatus::Running => return Some(id),
                Some(_) => log::debug!("Skipping node {}: already running", id),
                None => log::debug!("Skipping node {}: deleted", id),
            }
        }
        None
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Outcome counts of a whole-graph run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    pub failed: usize,
}

/// What a frame-driven run wants next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStep {
    /// A node is out, or the pause after it has not elapsed
    Wait,
    /// Start this node and report back through [`RunStepper::node_finished`]
    Start(NodeId),
    Finished(RunSummary),
}

/// A whole-graph run advanced by polling, for hosts that cannot await [`run_all`].
///
/// Times are seconds on any monotonic clock.
#[derive(Debug, Clone)]
pub struct RunStepper {
    queue: RunQueue,
    delay: f64,
    waiting_on: Option<NodeId>,
    resume_at: f64,
    summary: RunSummary,
}

impl RunStepper {
    pub fn new(graph: &NodeGraph, delay: Duration) -> Self {
        let queue = RunQueue::new(graph);
        log::info!("Running {} node(s)", queue.remaining());
        Self {
            queue,
            delay: delay.as_secs_f64(),
            waiting_on: None,
            resume_at: f64::NEG_INFINITY,
            summary: RunSummary::default(),
        }
    }

    pub fn waiting_on(&self) -> Option<NodeId> {
        self.waiting_on
    }

    pub fn poll(&mut self, graph: &NodeGraph, now: f64) -> RunStep {
        if self.waiting_on.is_some() || now < self.resume_at {
            return RunStep::Wait;
        }
        match self.queue.next(graph) {
            Some(id) => {
                self.waiting_on = Some(id);
                RunStep::Start(id)
            }
            None => {
                log::info!(
                    "Run finished: {} completed, {} failed",
                    self.summary.completed,
                    self.summary.failed
                );
                RunStep::Finished(self.summary)
            }
        }
    }

    /// Record how the awaited node ended; results for other nodes are ignored
    pub fn node_finished(&mut self, node: NodeId, status: NodeStatus, now: f64) {
        if self.waiting_on != Some(node) {
            return;
        }
        self.waiting_on = None;
        self.resume_at = now + self.delay;
        match status {
            NodeStatus::Completed => self.summary.completed += 1,
            _ => self.summary.failed += 1,
        }
    }

    /// The awaited node never started; move on without pausing
    pub fn start_failed(&mut self, node: NodeId) {
        if self.waiting_on == Some(node) {
            self.waiting_on = None;
        }
    }
}

/// Execute every node in creation order, pausing between nodes
pub async fn run_all<F, Fut>(session: &mut WorkflowSession, client: &dyn ModelClient, mut pause: F) -> RunSummary
where
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = ()>,
{
    let delay = session.config().run.step_delay();
    let mut queue = RunQueue::new(session.graph());
    let mut summary = RunSummary::default();
    log::info!("Running {} node(s)", queue.remaining());

    while let Some(id) = queue.next(session.graph()) {
        match execute_node(session, client, id).await {
            Ok(NodeStatus::Completed) => summary.completed += 1,
            Ok(_) => summary.failed += 1,
            Err(e) => log::warn!("Node {} was not run: {}", id, e),
        }
        pause(delay).await;
    }

    log::info!("Run finished: {} completed, {} failed", summary.completed, summary.failed);
    summary
}

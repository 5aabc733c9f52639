//! End-to-end runs of the factory without a rendering surface

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use eframe::egui::Pos2;

use channel_factory::executor::{execute_node, run_all, RunSummary};
use channel_factory::persistence::{load_snapshot, save_snapshot, WorkflowSnapshot};
use channel_factory::{
    Command, FactoryConfig, KeyValueStore, LaunchOptions, MemoryStore, Mode, Model, ModelClient, ModelError,
    NodeStatus, NodeType, TemplateSeed, WorkflowSession, Workspace,
};

/// Echoes `OUT:<prompt>`, failing for prompts that contain `fail_on`
struct StubClient {
    fail_on: Option<&'static str>,
    calls: RefCell<Vec<(Model, String)>>,
}

impl StubClient {
    fn echo() -> Self {
        Self {
            fail_on: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn failing_on(needle: &'static str) -> Self {
        Self {
            fail_on: Some(needle),
            calls: RefCell::new(Vec::new()),
        }
    }
}

#[async_trait(?Send)]
impl ModelClient for StubClient {
    async fn call(&self, model: Model, prompt: &str) -> Result<String, ModelError> {
        self.calls.borrow_mut().push((model, prompt.to_string()));
        match self.fail_on {
            Some(needle) if prompt.contains(needle) => Err(ModelError::new("quota exceeded")),
            _ => Ok(format!("OUT:{prompt}")),
        }
    }
}

async fn no_pause(_: Duration) {}

#[test]
fn channel_factory_runs_every_node() {
    let mut session = WorkflowSession::in_memory(Mode::Channel, TemplateSeed::with_topic("home espresso"));
    let client = StubClient::echo();

    let summary = tokio_test::block_on(run_all(&mut session, &client, no_pause));

    assert_eq!(summary, RunSummary { completed: 8, failed: 0 });
    assert_eq!(client.calls.borrow().len(), 8);
    for node in session.graph().nodes_iter() {
        assert_eq!(node.status, NodeStatus::Completed, "node {}", node.id);
        if node.node_type.is_image_prompt() {
            assert!(node.output.starts_with("**Prompt:** OUT:"));
        } else {
            assert!(node.output.starts_with("OUT:"), "node {}", node.id);
        }
    }

    // Metadata sees research, which saw the target audience, which saw the name
    let calls = client.calls.borrow();
    let metadata_prompt = &calls[6].1;
    assert!(metadata_prompt.contains("[Reference: 6. Topic Research]"));
    assert!(metadata_prompt.contains("home espresso"));
}

#[test]
fn quota_failure_does_not_stop_the_run() {
    let mut session = WorkflowSession::in_memory(Mode::Channel, TemplateSeed::with_topic("home espresso"));
    // Only the banner prompt mentions channel art
    let client = StubClient::failing_on("channel art");

    let summary = tokio_test::block_on(run_all(&mut session, &client, no_pause));
    assert_eq!(summary, RunSummary { completed: 7, failed: 1 });

    let banner = session
        .graph()
        .nodes_iter()
        .find(|n| n.node_type == NodeType::BannerImage)
        .unwrap();
    assert_eq!(banner.status, NodeStatus::Error);
    assert_eq!(banner.output, "Error: quota exceeded");
    assert_eq!(client.calls.borrow().len(), 8);
}

#[test]
fn node_model_choice_reaches_the_client() {
    let mut session = WorkflowSession::in_memory(Mode::Channel, TemplateSeed::default());
    session.apply(Command::SetModel { node: 2, model: Model::Claude }).unwrap();
    session.apply(Command::SetOutput { node: 1, output: "X".into() }).unwrap();
    let client = StubClient::echo();

    tokio_test::block_on(execute_node(&mut session, &client, 2)).unwrap();
    let calls = client.calls.borrow();
    assert_eq!(calls[0].0, Model::Claude);
    assert!(calls[0].1.contains("X"));
}

#[test]
fn results_survive_a_reopen() {
    let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
    let launch = LaunchOptions {
        topic: Some("home espresso".into()),
        mode: Mode::Channel,
    };

    let mut workspace = Workspace::open(launch.clone(), store.clone(), FactoryConfig::default());
    let client = StubClient::echo();
    tokio_test::block_on(run_all(workspace.session_mut(), &client, no_pause));
    workspace
        .session_mut()
        .apply(Command::DropNode {
            type_key: "translator".into(),
            pos: Pos2::new(900.0, 700.0),
        })
        .unwrap();
    workspace.session_mut().apply(Command::Connect { from: 8, to: 9 }).unwrap();

    let reopened = Workspace::open(launch, store, FactoryConfig::default());
    let graph = reopened.session().graph();
    assert_eq!(graph.node_count(), 9);
    assert_eq!(graph.next_id(), 10);
    assert_eq!(graph.connections_iter().count(), 8);
    assert!(graph.nodes_iter().take(8).all(|n| n.status == NodeStatus::Completed));
}

#[test]
fn snapshot_round_trip_keeps_everything() {
    let store = MemoryStore::new();
    let mut session = WorkflowSession::in_memory(Mode::Video, TemplateSeed::with_topic("latte art"));
    tokio_test::block_on(run_all(&mut session, &StubClient::echo(), no_pause));

    save_snapshot(&store, Mode::Video, session.graph()).unwrap();
    let snapshot = load_snapshot(&store, Mode::Video).unwrap();
    let restored = snapshot.clone().into_graph(Model::Gemini);
    assert_eq!(restored.dropped_connections, 0);
    assert_eq!(WorkflowSnapshot::from_graph(&restored.graph), snapshot);
    assert_eq!(WorkflowSnapshot::from_graph(session.graph()), snapshot);
}

#[test]
fn channel_plan_flows_into_video_planning() {
    let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
    let launch = LaunchOptions {
        topic: Some("home espresso".into()),
        mode: Mode::Channel,
    };
    let mut workspace = Workspace::open(launch, store, FactoryConfig::default());
    workspace
        .session_mut()
        .apply(Command::NodeExecuted {
            node: 1,
            result: Ok("1. **Crema Club**: espresso for everyone\n2. Bean There".into()),
        })
        .unwrap();

    workspace.switch_mode(Mode::Video);
    assert!(!workspace.awaiting_brief());

    let client = StubClient::echo();
    let brief_id = workspace.session().graph().nodes_iter().next().unwrap().id;
    tokio_test::block_on(execute_node(workspace.session_mut(), &client, brief_id)).unwrap();
    let prompt = &client.calls.borrow()[0].1;
    assert!(prompt.contains("'home espresso'"));
    assert!(prompt.contains("'Crema Club'"));
}

//! Scenario tests transcribed directly from §8 of the design document.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pritunl_core::{Event, EventSink, LogSink, OrgId, ServerId, UserId};
use pritunl_node::{Call, ClientInfo, OrgUserRepo, OvpnConfigProvider};
use pritunl_node::session::{NodeConfig, NodeSessionController};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StaticRepo {
    org_id: OrgId,
    user_id: UserId,
}

#[async_trait]
impl OrgUserRepo for StaticRepo {
    async fn org_exists(&self, org_id: &OrgId) -> bool {
        *org_id == self.org_id
    }

    async fn user_exists(&self, org_id: &OrgId, user_id: &UserId) -> bool {
        *org_id == self.org_id && *user_id == self.user_id
    }

    async fn verify_otp(&self, org_id: &OrgId, user_id: &UserId, otp_code: &str) -> bool {
        self.user_exists(org_id, user_id).await && otp_code == "123456"
    }
}

struct OneOrgConfigProvider;

#[async_trait]
impl OvpnConfigProvider for OneOrgConfigProvider {
    async fn org_count(&self, _server_id: &ServerId) -> usize {
        1
    }

    async fn render_ovpn_conf(&self, _server_id: &ServerId) -> Result<String, pritunl_node::NodeError> {
        Ok("dev tun\n".to_string())
    }

    async fn network(&self, _server_id: &ServerId) -> String {
        "10.8.0.0/24".to_string()
    }

    async fn local_networks(&self, _server_id: &ServerId) -> Vec<String> {
        vec![]
    }
}

#[derive(Default)]
struct RecordingEventSink {
    events: Mutex<Vec<Event>>,
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Default)]
struct RecordingLogSink {
    messages: Mutex<Vec<String>>,
}

impl LogSink for RecordingLogSink {
    fn log(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

fn test_config(server_id: &str, mock_server: &MockServer) -> NodeConfig {
    let addr = mock_server.address();
    let mut config = NodeConfig::new(ServerId::new(server_id), "test-session", addr.ip().to_string(), addr.port(), "node-key");
    config.scheme = "http".to_string();
    config
}

#[tokio::test]
async fn node_clean_shutdown_on_410_emits_no_event() {
    let mock_server = MockServer::start().await;
    let server_id = "srv1";

    Mock::given(method("POST"))
        .and(path(format!("/server/{server_id}")))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .and(path(format!("/server/{server_id}/com")))
        .respond_with(ResponseTemplate::new(410))
        .mount(&mock_server)
        .await;

    let events = Arc::new(RecordingEventSink::default());
    let log = Arc::new(RecordingLogSink::default());

    let controller = NodeSessionController::new(
        test_config(server_id, &mock_server),
        Arc::new(StaticRepo { org_id: OrgId::new("org1"), user_id: UserId::new("user1") }),
        Arc::new(OneOrgConfigProvider),
    )
    .with_events(events.clone())
    .with_log(log.clone());

    controller.start(true).await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!controller.is_running().await, "session must be stopped once the remote declares it gone");
    assert!(events.events.lock().unwrap().is_empty(), "clean 410 shutdown must not emit ServersUpdated");
}

#[tokio::test]
async fn node_transport_failure_emits_event_and_log() {
    let mock_server = MockServer::start().await;
    let server_id = "srv2";

    Mock::given(method("POST"))
        .and(path(format!("/server/{server_id}")))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .and(path(format!("/server/{server_id}/com")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let events = Arc::new(RecordingEventSink::default());
    let log = Arc::new(RecordingLogSink::default());

    let controller = NodeSessionController::new(
        test_config(server_id, &mock_server),
        Arc::new(StaticRepo { org_id: OrgId::new("org1"), user_id: UserId::new("user1") }),
        Arc::new(OneOrgConfigProvider),
    )
    .with_events(events.clone())
    .with_log(log.clone());

    controller.start(true).await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!controller.is_running().await);
    assert_eq!(events.events.lock().unwrap().as_slice(), &[Event::ServersUpdated]);
    assert!(
        log.messages.lock().unwrap().iter().any(|m| m.contains("lost connection") || m.contains("stopped server")),
        "a log entry describing the lost connection must be recorded"
    );
}

#[tokio::test]
async fn command_dispatch_tls_verify_true_and_false() {
    let org_id = OrgId::new("org1");
    let user_id = UserId::new("user1");
    let repo: Arc<dyn OrgUserRepo> = Arc::new(StaticRepo { org_id: org_id.clone(), user_id: user_id.clone() });
    let events: Arc<dyn EventSink> = Arc::new(RecordingEventSink::default());
    let log: Arc<dyn LogSink> = Arc::new(RecordingLogSink::default());
    let mut clients = HashSet::new();

    let ok_call = Call { id: "x".to_string(), command: "tls_verify".to_string(), args: vec![json!("org1"), json!("user1")] };
    let response = pritunl_node::commands::dispatch(&ok_call, "test-session", &repo, &events, &log, &mut clients, true).await;
    assert_eq!(response.id, "x");
    assert_eq!(response.response, json!(true));

    let bad_call = Call { id: "y".to_string(), command: "tls_verify".to_string(), args: vec![json!("org1"), json!("ghost")] };
    let response = pritunl_node::commands::dispatch(&bad_call, "test-session", &repo, &events, &log, &mut clients, true).await;
    assert_eq!(response.id, "y");
    assert_eq!(response.response, json!(false));
}

#[tokio::test]
async fn command_dispatch_update_clients_emits_per_org_events_on_count_change() {
    let repo: Arc<dyn OrgUserRepo> = Arc::new(StaticRepo { org_id: OrgId::new("org1"), user_id: UserId::new("user1") });
    let events = Arc::new(RecordingEventSink::default());
    let events_sink: Arc<dyn EventSink> = events.clone();
    let log: Arc<dyn LogSink> = Arc::new(RecordingLogSink::default());
    let mut clients = HashSet::new();

    let call = Call {
        id: "z".to_string(),
        command: "update_clients".to_string(),
        args: vec![json!([
            {"org_id": "org1", "user_id": "user1"},
            {"org_id": "org2", "user_id": "user2"},
        ])],
    };
    pritunl_node::commands::dispatch(&call, "test-session", &repo, &events_sink, &log, &mut clients, true).await;

    assert_eq!(clients.len(), 2);
    let recorded = events.events.lock().unwrap();
    let mut updated_orgs: Vec<_> = recorded
        .iter()
        .filter_map(|e| match e {
            Event::UsersUpdated { org_id } => Some(org_id.clone()),
            _ => None,
        })
        .collect();
    updated_orgs.sort();
    assert_eq!(updated_orgs, vec![OrgId::new("org1"), OrgId::new("org2")]);
    assert!(recorded.iter().any(|e| *e == Event::ServersUpdated));
}

#[tokio::test]
async fn command_dispatch_update_clients_no_event_when_not_running() {
    let repo: Arc<dyn OrgUserRepo> = Arc::new(StaticRepo { org_id: OrgId::new("org1"), user_id: UserId::new("user1") });
    let events = Arc::new(RecordingEventSink::default());
    let events_sink: Arc<dyn EventSink> = events.clone();
    let log: Arc<dyn LogSink> = Arc::new(RecordingLogSink::default());
    let mut clients = HashSet::new();

    let call = Call {
        id: "z".to_string(),
        command: "update_clients".to_string(),
        args: vec![json!([{"org_id": "org1", "user_id": "user1"}])],
    };
    pritunl_node::commands::dispatch(&call, "test-session", &repo, &events_sink, &log, &mut clients, false).await;

    assert_eq!(clients.len(), 1);
    assert!(events.events.lock().unwrap().is_empty(), "update_clients must not emit while the session isn't running");
}

#[tokio::test]
async fn command_dispatch_update_clients_same_count_membership_churn_does_not_fire() {
    let repo: Arc<dyn OrgUserRepo> = Arc::new(StaticRepo { org_id: OrgId::new("org1"), user_id: UserId::new("user1") });
    let events = Arc::new(RecordingEventSink::default());
    let events_sink: Arc<dyn EventSink> = events.clone();
    let log: Arc<dyn LogSink> = Arc::new(RecordingLogSink::default());
    let mut clients: HashSet<_> = [ClientInfo { org_id: OrgId::new("org1"), user_id: UserId::new("user1") }].into_iter().collect();

    // Same cardinality (1), different member: a real node swap, but the
    // trigger is pure count comparison, matching client_count != len(clients).
    let call = Call {
        id: "z".to_string(),
        command: "update_clients".to_string(),
        args: vec![json!([{"org_id": "org1", "user_id": "user2"}])],
    };
    pritunl_node::commands::dispatch(&call, "test-session", &repo, &events_sink, &log, &mut clients, true).await;

    assert_eq!(clients.len(), 1);
    assert!(events.events.lock().unwrap().is_empty(), "cardinality-only trigger must not fire on same-count membership churn");
}

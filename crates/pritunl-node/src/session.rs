//! The node session controller: owns one remote node daemon's lifecycle and
//! its long-poll communication worker.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pritunl_core::constants::{HTTP_COM_REQUEST_TIMEOUT, HTTP_REQUEST_TIMEOUT, NODE_SERVER_VER};
use pritunl_core::{Event, EventSink, LogSink, NullEventSink, ServerId, TracingLogSink};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::collaborators::{OrgUserRepo, OvpnConfigProvider};
use crate::commands::{dispatch, ClientInfo};
use crate::error::NodeError;
use crate::protocol::CallResponse;
use crate::transport::{ComOutcome, NodeTransport};

/// Static identity of the node this session talks to. Immutable for the
/// session's lifetime; restarting against a different node means building a
/// new controller.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub server_id: ServerId,
    pub name: String,
    pub scheme: String,
    pub ip: String,
    pub port: u16,
    pub node_key: String,
}

impl NodeConfig {
    pub fn new(server_id: ServerId, name: impl Into<String>, ip: impl Into<String>, port: u16, node_key: impl Into<String>) -> Self {
        Self {
            server_id,
            name: name.into(),
            scheme: "https".to_string(),
            ip: ip.into(),
            port,
            node_key: node_key.into(),
        }
    }
}

struct Inner {
    status: bool,
    interrupt: bool,
    clients: HashSet<ClientInfo>,
    worker: Option<JoinHandle<()>>,
}

/// Drives one remote node daemon through Stopped/Starting/Running/Stopping/
/// Failed. `status`/`interrupt`/`clients` are written only by the owning
/// controller and its worker, in the well-defined phases the design
/// document calls out: `start` writes `status = true` before spawning the
/// worker, the worker writes `status = false` only on exit, `stop` writes
/// `status = false` after a successful DELETE.
pub struct NodeSessionController {
    config: NodeConfig,
    transport: Arc<NodeTransport>,
    org_repo: Arc<dyn OrgUserRepo>,
    ovpn: Arc<dyn OvpnConfigProvider>,
    events: Arc<dyn EventSink>,
    log: Arc<dyn LogSink>,
    global_interrupt: Arc<AtomicBool>,
    inner: Arc<Mutex<Inner>>,
}

impl NodeSessionController {
    pub fn new(
        config: NodeConfig,
        org_repo: Arc<dyn OrgUserRepo>,
        ovpn: Arc<dyn OvpnConfigProvider>,
    ) -> Self {
        Self {
            config,
            transport: Arc::new(NodeTransport::new()),
            org_repo,
            ovpn,
            events: Arc::new(NullEventSink),
            log: Arc::new(TracingLogSink),
            global_interrupt: Arc::new(AtomicBool::new(false)),
            inner: Arc::new(Mutex::new(Inner { status: false, interrupt: false, clients: HashSet::new(), worker: None })),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_log(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = log;
        self
    }

    pub fn with_global_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.global_interrupt = flag;
        self
    }

    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.status
    }

    /// Precondition: `status == false`. Idempotent: returns `Ok(())`
    /// without doing anything if already running.
    pub async fn start(&self, silent: bool) -> Result<(), NodeError> {
        {
            let inner = self.inner.lock().await;
            if inner.status {
                return Ok(());
            }
        }

        let org_count = self.ovpn.org_count(&self.config.server_id).await;
        if org_count == 0 {
            return Err(NodeError::MissingOrganization { server_id: self.config.server_id.clone() });
        }

        let ovpn_conf = self.ovpn.render_ovpn_conf(&self.config.server_id).await?;
        let network = self.ovpn.network(&self.config.server_id).await;
        let local_networks = self.ovpn.local_networks(&self.config.server_id).await;

        self.transport
            .start(
                &self.config.server_id,
                &self.config.scheme,
                &self.config.ip,
                self.config.port,
                &self.config.node_key,
                &network,
                &local_networks,
                &ovpn_conf,
                &NODE_SERVER_VER.to_string(),
                HTTP_REQUEST_TIMEOUT,
            )
            .await?;

        {
            let mut inner = self.inner.lock().await;
            inner.interrupt = false;
            inner.status = true;
            inner.worker = Some(self.spawn_worker());
        }

        if !silent {
            self.events.emit(Event::ServersUpdated);
        }

        Ok(())
    }

    /// Precondition: `status == true`. Idempotent: returns `Ok(())` without
    /// doing anything if already stopped.
    pub async fn stop(&self, silent: bool) -> Result<(), NodeError> {
        {
            let mut inner = self.inner.lock().await;
            if !inner.status {
                return Ok(());
            }
            inner.interrupt = true;
            inner.worker.take();
        }

        self.transport
            .stop(&self.config.server_id, &self.config.scheme, &self.config.ip, self.config.port, &self.config.node_key, HTTP_REQUEST_TIMEOUT)
            .await?;

        {
            let mut inner = self.inner.lock().await;
            inner.status = false;
        }

        if !silent {
            self.events.emit(Event::ServersUpdated);
        }

        Ok(())
    }

    /// Behaviorally identical to [`Self::stop`] today; kept as a distinct
    /// method so a future divergence (e.g. skipping the graceful DELETE on
    /// a forced shutdown) doesn't require a public API break.
    pub async fn force_stop(&self, silent: bool) -> Result<(), NodeError> {
        self.stop(silent).await
    }

    fn spawn_worker(&self) -> JoinHandle<()> {
        let config = self.config.clone();
        let transport = self.transport.clone();
        let org_repo = self.org_repo.clone();
        let events = self.events.clone();
        let log = self.log.clone();
        let global_interrupt = self.global_interrupt.clone();
        let inner = self.inner.clone();

        tokio::spawn(async move {
            run_worker(config, transport, org_repo, events, log, global_interrupt, inner).await;
        })
    }
}

async fn run_worker(
    config: NodeConfig,
    transport: Arc<NodeTransport>,
    org_repo: Arc<dyn OrgUserRepo>,
    events: Arc<dyn EventSink>,
    log: Arc<dyn LogSink>,
    global_interrupt: Arc<AtomicBool>,
    inner: Arc<Mutex<Inner>>,
) {
    let mut responses: Vec<CallResponse> = Vec::new();
    let mut failed = false;

    loop {
        {
            let guard = inner.lock().await;
            if guard.interrupt || global_interrupt.load(Ordering::SeqCst) {
                break;
            }
        }

        let outcome = transport
            .poll_com(&config.server_id, &config.scheme, &config.ip, config.port, &config.node_key, &responses, HTTP_COM_REQUEST_TIMEOUT)
            .await;

        let calls = match outcome {
            Ok(ComOutcome::Gone) => break,
            Ok(ComOutcome::Calls(calls)) => calls,
            Err(err) => {
                warn!(server_id = %config.server_id, error = %err, "node communication worker: transport error");
                failed = true;
                break;
            }
        };

        {
            let guard = inner.lock().await;
            if guard.interrupt || global_interrupt.load(Ordering::SeqCst) {
                break;
            }
        }

        responses.clear();
        for call in &calls {
            let mut guard = inner.lock().await;
            let running = guard.status;
            let response = dispatch(call, &config.name, &org_repo, &events, &log, &mut guard.clients, running).await;
            responses.push(response);
        }
    }

    let mut guard = inner.lock().await;
    guard.status = false;
    drop(guard);

    if failed {
        log.log(&format!("session {}: lost connection to node; stopped server", config.name));
        events.emit(Event::ServersUpdated);
    }
}

//! Explicit dispatch table for remote-callable commands. No reflection: an
//! unrecognized command name is logged and the call is dropped from the
//! response buffer.

use std::collections::HashSet;
use std::sync::Arc;

use pritunl_core::{Event, EventSink, LogSink, OrgId, UserId};
use serde_json::Value;

use crate::collaborators::OrgUserRepo;
use crate::protocol::{Call, CallResponse};

/// One connected OpenVPN client as tracked by a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientInfo {
    pub org_id: OrgId,
    pub user_id: UserId,
}

fn arg_str(args: &[Value], index: usize) -> Option<String> {
    args.get(index)?.as_str().map(str::to_owned)
}

/// Runs one call against the session's collaborators and returns the
/// response to append to the next `/com` batch. `session_name` is the
/// session's own name, used for log scoping instead of any ambient,
/// unbound server reference.
pub async fn dispatch(
    call: &Call,
    session_name: &str,
    org_repo: &Arc<dyn OrgUserRepo>,
    events: &Arc<dyn EventSink>,
    log: &Arc<dyn LogSink>,
    clients: &mut HashSet<ClientInfo>,
    running: bool,
) -> CallResponse {
    let response = match call.command.as_str() {
        "tls_verify" => tls_verify(&call.args, session_name, org_repo, log).await,
        "otp_verify" => otp_verify(&call.args, session_name, org_repo, log).await,
        "client_connect" => {
            client_touch(&call.args, session_name, org_repo, log, "client_connect").await;
            Value::Null
        }
        "client_disconnect" => {
            client_touch(&call.args, session_name, org_repo, log, "client_disconnect").await;
            Value::Null
        }
        "update_clients" => {
            update_clients(&call.args, session_name, events, log, clients, running);
            Value::Null
        }
        other => {
            log.log(&format!("session {session_name}: unrecognized command '{other}'"));
            Value::Null
        }
    };

    CallResponse { id: call.id.clone(), response }
}

async fn tls_verify(args: &[Value], session_name: &str, org_repo: &Arc<dyn OrgUserRepo>, log: &Arc<dyn LogSink>) -> Value {
    let (Some(org), Some(user)) = (arg_str(args, 0), arg_str(args, 1)) else {
        log.log(&format!("session {session_name}: tls_verify missing org/user args"));
        return Value::Bool(false);
    };
    let org_id = OrgId::new(org);
    let user_id = UserId::new(user);

    if !org_repo.org_exists(&org_id).await {
        log.log(&format!("session {session_name}: tls_verify: unknown organization {org_id}"));
        return Value::Bool(false);
    }
    if !org_repo.user_exists(&org_id, &user_id).await {
        log.log(&format!("session {session_name}: tls_verify: unknown user {user_id} in organization {org_id}"));
        return Value::Bool(false);
    }

    Value::Bool(true)
}

async fn otp_verify(args: &[Value], session_name: &str, org_repo: &Arc<dyn OrgUserRepo>, log: &Arc<dyn LogSink>) -> Value {
    let base = tls_verify(args, session_name, org_repo, log).await;
    if base != Value::Bool(true) {
        return base;
    }

    let (Some(org), Some(user), Some(otp)) = (arg_str(args, 0), arg_str(args, 1), arg_str(args, 2)) else {
        log.log(&format!("session {session_name}: otp_verify missing otp_code arg"));
        return Value::Bool(false);
    };
    let org_id = OrgId::new(org);
    let user_id = UserId::new(user);

    if !org_repo.verify_otp(&org_id, &user_id, &otp).await {
        log.log(&format!("session {session_name}: otp_verify: invalid otp for user {user_id} in organization {org_id}"));
        return Value::Bool(false);
    }

    Value::Bool(true)
}

async fn client_touch(args: &[Value], session_name: &str, org_repo: &Arc<dyn OrgUserRepo>, log: &Arc<dyn LogSink>, which: &str) {
    let (Some(org), Some(user)) = (arg_str(args, 0), arg_str(args, 1)) else {
        log.log(&format!("session {session_name}: {which} missing org/user args"));
        return;
    };
    let org_id = OrgId::new(org);
    let user_id = UserId::new(user);

    if !org_repo.org_exists(&org_id).await || !org_repo.user_exists(&org_id, &user_id).await {
        log.log(&format!("session {session_name}: {which}: unknown org/user {org_id}/{user_id}"));
    }
}

fn update_clients(
    args: &[Value],
    session_name: &str,
    events: &Arc<dyn EventSink>,
    log: &Arc<dyn LogSink>,
    clients: &mut HashSet<ClientInfo>,
    running: bool,
) {
    let Some(raw) = args.first().and_then(Value::as_array) else {
        log.log(&format!("session {session_name}: update_clients missing clients array"));
        return;
    };

    let mut next = HashSet::new();
    for entry in raw {
        let Some(org) = entry.get("org_id").and_then(Value::as_str) else { continue };
        let Some(user) = entry.get("user_id").and_then(Value::as_str) else { continue };
        next.insert(ClientInfo { org_id: OrgId::new(org), user_id: UserId::new(user) });
    }

    let changed = next.len() != clients.len();
    let affected_orgs: HashSet<OrgId> = next.iter().map(|c| c.org_id.clone()).collect();

    *clients = next;

    if running && changed {
        for org_id in affected_orgs {
            events.emit(Event::UsersUpdated { org_id });
        }
        events.emit(Event::ServersUpdated);
    }
}

//! Server role of the cross-grid login protocol.
//!
//! Processes an inbound `/homeagent/{id}/` handshake body: rebuilds the
//! circuit record and the gatekeeper/destination descriptors, then asks
//! the local acceptance policy whether the transfer may proceed. The
//! acceptance decision itself is an external collaborator wired in by the
//! composition root.

use hypergate_types::{AgentCircuitRecord, GridRegion};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Local acceptance decision for an inbound agent transfer.
///
/// Implemented by the composition root; typically registers the session
/// and forwards the agent toward the gatekeeper named in the handshake.
pub trait AgentTransferPolicy: Send + Sync {
    /// Returns `(accepted, reason)`. The reason must be suitable for
    /// display to the remote grid's operator.
    fn login_agent_to_grid(
        &self,
        circuit: &AgentCircuitRecord,
        gatekeeper: &GridRegion,
        destination: &GridRegion,
    ) -> (bool, String);
}

/// Structured handshake response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HomeAgentResponse {
    pub success: bool,
    pub reason: String,
}

/// Errors processing an inbound handshake. These map to protocol error
/// responses at the HTTP layer; they never reach the remote grid as
/// anything other than a status code and reason text.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The request body was not the expected structured map.
    #[error("undecodable handshake body")]
    BadRequest,
}

/// Processes an inbound home-agent handshake.
///
/// `agent_id` comes from the request URI; the body supplies the encoded
/// circuit plus the `gatekeeper_*` / `destination_*` metadata keys. An
/// undecodable body yields [`HandshakeError::BadRequest`] without
/// invoking the policy.
pub fn process_home_agent(
    policy: &dyn AgentTransferPolicy,
    agent_id: Uuid,
    body: &Value,
) -> Result<HomeAgentResponse, HandshakeError> {
    let Value::Object(args) = body else {
        return Err(HandshakeError::BadRequest);
    };

    let gatekeeper = unpack_gatekeeper(args);
    let destination = unpack_destination(args);
    let circuit = AgentCircuitRecord::decode(args);

    tracing::debug!(
        %agent_id,
        circuit_agent = %circuit.agent_id,
        destination = %destination.name,
        "processing inbound home-agent handshake"
    );

    let (success, reason) = policy.login_agent_to_grid(&circuit, &gatekeeper, &destination);
    Ok(HomeAgentResponse { success, reason })
}

fn unpack_gatekeeper(args: &Map<String, Value>) -> GridRegion {
    let mut gatekeeper = GridRegion::default();
    if let Some(host) = args.get("gatekeeper_host").and_then(Value::as_str) {
        gatekeeper.external_host = host.to_string();
    }
    if let Some(port) = get_parsed::<u16>(args, "gatekeeper_port") {
        gatekeeper.http_port = port;
    }
    gatekeeper
}

fn unpack_destination(args: &Map<String, Value>) -> GridRegion {
    let mut destination = GridRegion::default();
    match get_parsed::<i32>(args, "destination_x") {
        Some(x) => destination.loc_x = x,
        None => tracing::warn!("handshake request did not carry destination_x"),
    }
    match get_parsed::<i32>(args, "destination_y") {
        Some(y) => destination.loc_y = y,
        None => tracing::warn!("handshake request did not carry destination_y"),
    }
    if let Some(id) = args
        .get("destination_uuid")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
    {
        destination.region_id = id;
    }
    if let Some(name) = args.get("destination_name").and_then(Value::as_str) {
        destination.name = name.to_string();
    }
    destination
}

/// Fetches a key that legacy senders emit as a string but newer ones may
/// emit as a number, and parses it.
fn get_parsed<T: std::str::FromStr>(args: &Map<String, Value>, key: &str) -> Option<T> {
    match args.get(key)? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct RecordingPolicy {
        accept: bool,
        reason: &'static str,
        invoked: AtomicBool,
    }

    impl RecordingPolicy {
        fn new(accept: bool, reason: &'static str) -> Self {
            Self {
                accept,
                reason,
                invoked: AtomicBool::new(false),
            }
        }
    }

    impl AgentTransferPolicy for RecordingPolicy {
        fn login_agent_to_grid(
            &self,
            circuit: &AgentCircuitRecord,
            gatekeeper: &GridRegion,
            destination: &GridRegion,
        ) -> (bool, String) {
            self.invoked.store(true, Ordering::SeqCst);
            assert_eq!(gatekeeper.external_host, "gate.example");
            assert_eq!(gatekeeper.http_port, 8002);
            assert_eq!(destination.loc_x, 256000);
            assert_eq!(destination.name, "Welcome");
            assert_eq!(circuit.first_name, "Test");
            (self.accept, self.reason.to_string())
        }
    }

    fn handshake_body() -> Value {
        json!({
            "agent_id": Uuid::new_v4().to_string(),
            "first_name": "Test",
            "last_name": "Visitor",
            "circuit_code": "12345",
            "gatekeeper_host": "gate.example",
            "gatekeeper_port": "8002",
            "destination_x": "256000",
            "destination_y": "256000",
            "destination_uuid": Uuid::new_v4().to_string(),
            "destination_name": "Welcome",
        })
    }

    #[test]
    fn accepted_transfer_reports_success() {
        let policy = RecordingPolicy::new(true, "");
        let response = process_home_agent(&policy, Uuid::new_v4(), &handshake_body()).unwrap();
        assert!(response.success);
        assert!(policy.invoked.load(Ordering::SeqCst));
    }

    #[test]
    fn refused_transfer_carries_policy_reason() {
        let policy = RecordingPolicy::new(false, "grid is closed");
        let response = process_home_agent(&policy, Uuid::new_v4(), &handshake_body()).unwrap();
        assert!(!response.success);
        assert_eq!(response.reason, "grid is closed");
    }

    #[test]
    fn non_object_body_is_bad_request_without_policy_call() {
        let policy = RecordingPolicy::new(true, "");
        let err = process_home_agent(&policy, Uuid::new_v4(), &json!("not a map"))
            .expect_err("non-object body should be rejected");
        assert!(matches!(err, HandshakeError::BadRequest));
        assert!(!policy.invoked.load(Ordering::SeqCst));
    }
}

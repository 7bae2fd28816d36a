//! Client role of the cross-grid login protocol.
//!
//! `UserAgentClient` talks to one remote grid's user-agent service: the
//! `/homeagent/{id}/` handshake endpoint for session transfer, plus the
//! companion keyed-parameter calls. Each handshake attempt moves through
//! `Idle → Sent → {Accepted | Rejected | Unreachable | Malformed}`; the
//! terminal state is the returned [`LoginOutcome`]. Retry policy belongs
//! to the caller — nothing here retries.

use crate::REQUEST_TIMEOUT;
use hypergate_types::{AgentCircuitRecord, GridRegion, Vector3};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use url::form_urlencoded;
use uuid::Uuid;

/// Terminal state of one handshake attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The destination accepted the session.
    Accepted,
    /// The destination answered and refused, with its reason.
    Rejected(String),
    /// The destination could not be contacted (connect/timeout/write).
    Unreachable(String),
    /// The destination answered something neither structured nor legacy.
    Malformed(String),
}

impl LoginOutcome {
    pub fn accepted(&self) -> bool {
        matches!(self, LoginOutcome::Accepted)
    }

    pub fn reason(&self) -> &str {
        match self {
            LoginOutcome::Accepted => "",
            LoginOutcome::Rejected(r)
            | LoginOutcome::Unreachable(r)
            | LoginOutcome::Malformed(r) => r,
        }
    }
}

/// Decodes a handshake response body.
///
/// Two explicit branches: (a) a structured JSON object with boolean
/// `success` and string `reason`; (b) a legacy plain-text body that is
/// successful iff it starts with the case-insensitive literal `"true"`.
/// Anything else is a failure.
pub fn decode_login_response(body: &str) -> LoginOutcome {
    let body = body.trim();
    if body.is_empty() {
        return LoginOutcome::Malformed("empty response from destination".into());
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(success) = map.get("success").and_then(Value::as_bool) {
            let reason = map
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return if success {
                LoginOutcome::Accepted
            } else {
                LoginOutcome::Rejected(reason)
            };
        }
    }

    // Legacy servers answer with a bare text literal.
    if body.to_ascii_lowercase().starts_with("true") {
        return LoginOutcome::Accepted;
    }

    LoginOutcome::Malformed(format!("unrecognized response: {body}"))
}

/// Connector to one remote grid's user-agent service.
pub struct UserAgentClient {
    server_url: String,
    http: reqwest::Client,
}

impl UserAgentClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        let mut server_url = server_url.into();
        while server_url.ends_with('/') {
            server_url.pop();
        }
        Self {
            server_url,
            http: reqwest::Client::new(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Ships an authenticated session to the destination grid.
    ///
    /// Builds the wire payload from the encoded circuit plus the handshake
    /// metadata and POSTs it to the destination's per-agent endpoint. A
    /// transport failure is reported as [`LoginOutcome::Unreachable`]
    /// without retry.
    pub async fn login_agent_to_grid(
        &self,
        circuit: &AgentCircuitRecord,
        gatekeeper: &GridRegion,
        destination: &GridRegion,
    ) -> LoginOutcome {
        let uri = format!("{}/homeagent/{}/", self.server_url, circuit.agent_id);
        let args = pack_login_args(circuit, gatekeeper, destination);

        tracing::info!(
            uri = %uri,
            region = %destination.name,
            x = destination.loc_x,
            y = destination.loc_y,
            "posting login handshake to remote grid"
        );

        let sent = self
            .http
            .post(&uri)
            .timeout(REQUEST_TIMEOUT)
            .json(&Value::Object(args))
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                tracing::info!(uri = %uri, error = %e, "login handshake transport failure");
                return LoginOutcome::Unreachable("cannot contact remote region".into());
            }
        };

        match response.text().await {
            Ok(body) => decode_login_response(&body),
            Err(e) => {
                tracing::info!(uri = %uri, error = %e, "login handshake reply unreadable");
                LoginOutcome::Unreachable("destination did not reply".into())
            }
        }
    }

    /// Asks the home grid where this user's home region is.
    ///
    /// Returns the region plus start position and look-at on success;
    /// `None` on transport failure, fault, or a negative result.
    pub async fn get_home_region(&self, user_id: Uuid) -> Option<(GridRegion, Vector3, Vector3)> {
        let params = [("userID".to_string(), user_id.to_string())];
        let hash = match self.send_keyed_request("get_home_region", &params).await {
            Ok(hash) => hash,
            Err(reason) => {
                tracing::debug!(%user_id, reason, "get_home_region failed");
                return None;
            }
        };

        if !result_is_true(&hash) {
            return None;
        }

        let mut region = GridRegion::default();
        if let Some(id) = hash.get("uuid").and_then(|s| Uuid::parse_str(s).ok()) {
            region.region_id = id;
        }
        if let Some(x) = hash.get("x").and_then(|s| s.parse().ok()) {
            region.loc_x = x;
        }
        if let Some(y) = hash.get("y").and_then(|s| s.parse().ok()) {
            region.loc_y = y;
        }
        if let Some(name) = hash.get("region_name") {
            region.name = name.clone();
        }
        if let Some(host) = hash.get("hostname") {
            region.external_host = host.clone();
        }
        if let Some(port) = hash.get("http_port").and_then(|s| s.parse().ok()) {
            region.http_port = port;
        }
        if let Some(port) = hash.get("internal_port").and_then(|s| s.parse().ok()) {
            region.internal_port = port;
        }

        let position = hash
            .get("position")
            .and_then(|s| s.parse().ok())
            .unwrap_or(Vector3::UNIT_Y);
        let look_at = hash
            .get("lookAt")
            .and_then(|s| s.parse().ok())
            .unwrap_or(Vector3::UNIT_Y);

        Some((region, position, look_at))
    }

    /// True when the session is returning to the grid named `external_name`.
    pub async fn agent_is_coming_home(&self, session_id: Uuid, external_name: &str) -> bool {
        let params = [
            ("sessionID".to_string(), session_id.to_string()),
            ("externalName".to_string(), external_name.to_string()),
        ];
        self.get_bool_response("agent_is_coming_home", &params).await
    }

    /// Verifies a visiting agent's service token with its home grid.
    pub async fn verify_agent(&self, session_id: Uuid, token: &str) -> bool {
        let params = [
            ("sessionID".to_string(), session_id.to_string()),
            ("token".to_string(), token.to_string()),
        ];
        self.get_bool_response("verify_agent", &params).await
    }

    /// Verifies a connecting client's service token with its home grid.
    pub async fn verify_client(&self, session_id: Uuid, token: &str) -> bool {
        let params = [
            ("sessionID".to_string(), session_id.to_string()),
            ("token".to_string(), token.to_string()),
        ];
        self.get_bool_response("verify_client", &params).await
    }

    /// Tells the home grid that this session has ended.
    pub async fn logout_agent(&self, user_id: Uuid, session_id: Uuid) -> bool {
        let params = [
            ("sessionID".to_string(), session_id.to_string()),
            ("userID".to_string(), user_id.to_string()),
        ];
        self.get_bool_response("logout_agent", &params).await
    }

    async fn get_bool_response(&self, method: &str, params: &[(String, String)]) -> bool {
        match self.send_keyed_request(method, params).await {
            Ok(hash) => result_is_true(&hash),
            Err(reason) => {
                tracing::debug!(method, reason, "keyed-parameter call failed");
                false
            }
        }
    }

    /// One-shot keyed-parameter request: a flat key->string set out, a flat
    /// key->string set back. Transport failures and fault responses come
    /// back as `Err(reason)`, never as a propagated exception.
    async fn send_keyed_request(
        &self,
        method: &str,
        params: &[(String, String)],
    ) -> Result<HashMap<String, String>, String> {
        let mut body = form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            body.append_pair(key, value);
        }
        let body = body.finish();

        let uri = format!("{}/rpc/{}", self.server_url, method);
        let response = self
            .http
            .post(&uri)
            .timeout(REQUEST_TIMEOUT)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await
            .map_err(|e| format!("unable to contact remote server: {e}"))?;

        let text = response
            .text()
            .await
            .map_err(|e| format!("remote server reply unreadable: {e}"))?;

        let hash: HashMap<String, String> = form_urlencoded::parse(text.as_bytes())
            .into_owned()
            .collect();

        if let Some(fault) = hash.get("fault") {
            return Err(format!("remote call fault: {fault}"));
        }

        Ok(hash)
    }
}

fn result_is_true(hash: &HashMap<String, String>) -> bool {
    hash.get("result")
        .is_some_and(|r| r.eq_ignore_ascii_case("true"))
}

/// Wire payload for the handshake: the encoded circuit plus the
/// destination-selection metadata the remote side needs.
fn pack_login_args(
    circuit: &AgentCircuitRecord,
    gatekeeper: &GridRegion,
    destination: &GridRegion,
) -> Map<String, Value> {
    let mut args = circuit.encode();
    args.insert("gatekeeper_host".into(), json!(gatekeeper.external_host));
    args.insert(
        "gatekeeper_port".into(),
        json!(gatekeeper.http_port.to_string()),
    );
    args.insert(
        "destination_x".into(),
        json!(destination.loc_x.to_string()),
    );
    args.insert(
        "destination_y".into(),
        json!(destination.loc_y.to_string()),
    );
    args.insert("destination_name".into(), json!(destination.name));
    args.insert(
        "destination_uuid".into(),
        json!(destination.region_id.to_string()),
    );
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypergate_types::REGION_SIZE;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn structured_success_response() {
        assert_eq!(
            decode_login_response(r#"{"success": true, "reason": ""}"#),
            LoginOutcome::Accepted
        );
    }

    #[test]
    fn structured_rejection_carries_reason() {
        let outcome = decode_login_response(r#"{"success": false, "reason": "blocked"}"#);
        assert_eq!(outcome, LoginOutcome::Rejected("blocked".into()));
        assert!(!outcome.accepted());
        assert_eq!(outcome.reason(), "blocked");
    }

    #[test]
    fn legacy_true_prefix_is_success() {
        assert!(decode_login_response("true").accepted());
        assert!(decode_login_response("TRUE").accepted());
        assert!(decode_login_response("True, region ready").accepted());
        assert_eq!(decode_login_response("true").reason(), "");
    }

    #[test]
    fn anything_else_is_malformed() {
        assert!(matches!(
            decode_login_response("no thanks"),
            LoginOutcome::Malformed(_)
        ));
        assert!(matches!(
            decode_login_response(""),
            LoginOutcome::Malformed(_)
        ));
        // A JSON object without a boolean `success` is not structured.
        assert!(matches!(
            decode_login_response(r#"{"ok": 1}"#),
            LoginOutcome::Malformed(_)
        ));
    }

    #[test]
    fn login_args_carry_handshake_metadata() {
        let circuit = AgentCircuitRecord {
            agent_id: Uuid::new_v4(),
            ..Default::default()
        };
        let gatekeeper = GridRegion {
            external_host: "gate.example".into(),
            http_port: 8002,
            ..Default::default()
        };
        let destination = GridRegion {
            region_id: Uuid::new_v4(),
            name: "Welcome".into(),
            loc_x: 1000 * REGION_SIZE as i32,
            loc_y: 1000 * REGION_SIZE as i32,
            ..Default::default()
        };

        let args = pack_login_args(&circuit, &gatekeeper, &destination);
        assert_eq!(args["gatekeeper_host"], json!("gate.example"));
        assert_eq!(args["gatekeeper_port"], json!("8002"));
        assert_eq!(args["destination_x"], json!("256000"));
        assert_eq!(args["destination_name"], json!("Welcome"));
        assert_eq!(
            args["destination_uuid"],
            json!(destination.region_id.to_string())
        );
        // The circuit's own keys survive alongside the metadata.
        assert_eq!(args["agent_id"], json!(circuit.agent_id.to_string()));
    }

    #[tokio::test]
    async fn unreachable_destination_reports_cannot_contact() {
        // Bind then drop to find a port nobody is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = UserAgentClient::new(format!("http://{addr}"));
        let outcome = client
            .login_agent_to_grid(
                &AgentCircuitRecord::default(),
                &GridRegion::default(),
                &GridRegion::default(),
            )
            .await;

        assert_eq!(
            outcome,
            LoginOutcome::Unreachable("cannot contact remote region".into())
        );
    }

    #[tokio::test]
    async fn legacy_server_reply_is_accepted() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 16 * 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-length: 4\r\nconnection: close\r\n\r\ntrue",
                )
                .await
                .unwrap();
        });

        let client = UserAgentClient::new(format!("http://{addr}"));
        let outcome = client
            .login_agent_to_grid(
                &AgentCircuitRecord::default(),
                &GridRegion::default(),
                &GridRegion::default(),
            )
            .await;

        assert_eq!(outcome, LoginOutcome::Accepted);
    }
}

//! Inbound cross-grid login handshake endpoint.

use crate::AppState;
use axum::body::Bytes;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use hypergate_federation::{process_home_agent, HandshakeError};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

fn bad_request() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "reason": "undecodable handshake body" })),
    )
        .into_response()
}

/// `POST /homeagent/{agent_id}/` — receives an encoded circuit from a
/// remote grid and asks the local policy whether the agent may enter.
///
/// An agent id that is not a UUID is an unknown resource, not a protocol
/// error. An undecodable body is rejected before the policy runs.
pub async fn home_agent_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(agent_id): Path<String>,
    body: Bytes,
) -> Response {
    let Ok(agent_id) = Uuid::parse_str(&agent_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let Ok(body) = serde_json::from_slice::<Value>(&body) else {
        return bad_request();
    };

    let policy = Arc::clone(&state.policy);
    let processed =
        tokio::task::spawn_blocking(move || process_home_agent(policy.as_ref(), agent_id, &body))
            .await;

    match processed {
        Ok(Ok(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(Err(HandshakeError::BadRequest)) => bad_request(),
        Err(e) => {
            tracing::error!(error = %e, "home-agent task panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{test_state, AppHarness};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn handshake_request(agent_id: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(format!("/homeagent/{agent_id}/"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn valid_handshake_registers_session() {
        let AppHarness { app, sessions, _guard, .. } = test_state();
        let agent_id = Uuid::new_v4();
        let body = json!({
            "agent_id": agent_id.to_string(),
            "session_id": Uuid::new_v4().to_string(),
            "first_name": "Test",
            "last_name": "Visitor",
            "gatekeeper_host": "gate.example",
            "gatekeeper_port": "8002",
            "destination_x": "256000",
            "destination_y": "256000",
            "destination_name": "Welcome",
        });

        let response = app
            .oneshot(handshake_request(
                &agent_id.to_string(),
                Body::from(body.to_string()),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn undecodable_body_is_rejected_before_policy() {
        let AppHarness { app, sessions, _guard, .. } = test_state();

        let response = app
            .oneshot(handshake_request(
                &Uuid::new_v4().to_string(),
                Body::from("this is not json"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn non_object_json_body_is_rejected() {
        let AppHarness { app, sessions, _guard, .. } = test_state();

        let response = app
            .oneshot(handshake_request(
                &Uuid::new_v4().to_string(),
                Body::from("\"just a string\""),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn malformed_agent_id_is_not_found() {
        let AppHarness { app, _guard, .. } = test_state();

        let response = app
            .oneshot(handshake_request("not-a-uuid", Body::from("{}")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_method_is_not_allowed() {
        let AppHarness { app, _guard, .. } = test_state();

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri(format!("/homeagent/{}/", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}

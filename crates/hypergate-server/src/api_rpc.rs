//! Companion keyed-parameter RPC endpoint.
//!
//! `POST /rpc/{method}` with a form-urlencoded body of flat string keys;
//! the reply is the same shape with a `result` key of `"True"` or
//! `"False"`. Protocol-level failures answer with a `fault` key instead
//! of an HTTP error status, matching what remote callers expect.

use crate::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use hypergate_types::Vector3;
use std::collections::HashMap;
use std::sync::Arc;
use url::form_urlencoded;
use uuid::Uuid;

fn keyed_reply(pairs: &[(&str, String)]) -> Response {
    let mut body = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        body.append_pair(key, value);
    }
    (
        [(header::CONTENT_TYPE, "application/x-www-form-urlencoded")],
        body.finish(),
    )
        .into_response()
}

fn bool_reply(result: bool) -> Response {
    let result = if result { "True" } else { "False" };
    keyed_reply(&[("result", result.to_string())])
}

fn fault_reply(reason: &str) -> Response {
    keyed_reply(&[("fault", reason.to_string()), ("result", "False".into())])
}

fn get_uuid(params: &HashMap<String, String>, key: &str) -> Option<Uuid> {
    params.get(key).and_then(|s| Uuid::parse_str(s).ok())
}

/// `POST /rpc/{method}` — dispatches one keyed-parameter call.
pub async fn rpc_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(method): Path<String>,
    body: String,
) -> Response {
    let params: HashMap<String, String> = form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect();

    tracing::debug!(method, "companion rpc call");

    match method.as_str() {
        "get_home_region" => get_home_region(state, params).await,
        "verify_agent" => {
            let (Some(session_id), Some(token)) =
                (get_uuid(&params, "sessionID"), params.get("token"))
            else {
                return fault_reply("missing sessionID or token");
            };
            bool_reply(state.sessions.verify_agent(session_id, token))
        }
        "verify_client" => {
            let (Some(session_id), Some(token)) =
                (get_uuid(&params, "sessionID"), params.get("token"))
            else {
                return fault_reply("missing sessionID or token");
            };
            bool_reply(state.sessions.verify_client(session_id, token))
        }
        "agent_is_coming_home" => {
            let (Some(session_id), Some(external_name)) =
                (get_uuid(&params, "sessionID"), params.get("externalName"))
            else {
                return fault_reply("missing sessionID or externalName");
            };
            bool_reply(state.sessions.agent_is_coming_home(session_id, external_name))
        }
        "logout_agent" => {
            let (Some(session_id), Some(user_id)) =
                (get_uuid(&params, "sessionID"), get_uuid(&params, "userID"))
            else {
                return fault_reply("missing sessionID or userID");
            };
            bool_reply(state.sessions.logout(session_id, user_id))
        }
        _ => fault_reply(&format!("unknown method: {method}")),
    }
}

/// Answers where a user's home region is: the grid's default region, for
/// a user with a live session.
async fn get_home_region(state: Arc<AppState>, params: HashMap<String, String>) -> Response {
    let Some(user_id) = get_uuid(&params, "userID") else {
        return fault_reply("missing userID");
    };
    if state.sessions.session_id_for_agent(user_id).is_nil() {
        return bool_reply(false);
    }

    let directory = state.directory.clone();
    let scope_id = state.scope_id;
    let region = tokio::task::spawn_blocking(move || directory.default_region(scope_id)).await;

    let region = match region {
        Ok(Ok(Some(region))) => region,
        Ok(Ok(None)) => return bool_reply(false),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "default region lookup failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "default region task panicked");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let position = Vector3::new(128.0, 128.0, 0.0);
    keyed_reply(&[
        ("result", "True".into()),
        ("uuid", region.region_id.to_string()),
        ("x", region.loc_x.to_string()),
        ("y", region.loc_y.to_string()),
        ("region_name", region.name.clone()),
        ("hostname", region.external_host.clone()),
        ("http_port", region.http_port.to_string()),
        ("internal_port", region.internal_port.to_string()),
        ("position", position.to_string()),
        ("lookAt", Vector3::UNIT_Y.to_string()),
    ])
}

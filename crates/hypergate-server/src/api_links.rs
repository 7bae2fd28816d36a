//! Hyperlink administration endpoints.
//!
//! Thin HTTP wrappers over the linker: link a remote region, unlink one,
//! list what is linked. Link failures are operator-facing data, so they
//! come back as `{success: false, reason}` rather than error statuses.

use crate::AppState;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use hypergate_types::REGION_SIZE;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    /// `host[:port[:name]]` shorthand for the remote region.
    pub descriptor: String,
    /// Placement in region units; a random slot is chosen when absent.
    pub x: Option<u32>,
    pub y: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UnlinkRequest {
    /// `host:port` or the local display name of the linked region.
    pub descriptor: String,
}

fn task_panicked(e: tokio::task::JoinError) -> Response {
    tracing::error!(error = %e, "linker task panicked");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

/// Converts a placement in region units to meters, refusing coordinates
/// that do not fit the map's signed 32-bit meter space.
fn placement_meters(region_units: u32) -> Option<i32> {
    i32::try_from(i64::from(region_units) * i64::from(REGION_SIZE)).ok()
}

/// `POST /api/links` — link a remote region.
pub async fn create_link_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<LinkRequest>,
) -> Response {
    let linker = Arc::clone(&state.linker);
    let scope_id = state.scope_id;
    let placement = match (request.x, request.y) {
        (Some(x), Some(y)) => match (placement_meters(x), placement_meters(y)) {
            (Some(x_meters), Some(y_meters)) => Some((x_meters, y_meters)),
            _ => {
                return Json(json!({
                    "success": false,
                    "reason": format!("Region coordinates out of range ({x}, {y})"),
                }))
                .into_response()
            }
        },
        _ => None,
    };
    let linked = tokio::task::spawn_blocking(move || match placement {
        Some((x_meters, y_meters)) => {
            linker.try_link_to_coords(scope_id, &request.descriptor, x_meters, y_meters)
        }
        None => linker.link_region(scope_id, &request.descriptor),
    })
    .await;

    match linked {
        Ok(Ok(region)) => Json(json!({ "success": true, "region": region })).into_response(),
        Ok(Err(e)) => {
            Json(json!({ "success": false, "reason": e.to_string() })).into_response()
        }
        Err(e) => task_panicked(e),
    }
}

/// `DELETE /api/links` — unlink a region.
pub async fn remove_link_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<UnlinkRequest>,
) -> Response {
    let linker = Arc::clone(&state.linker);
    let removed =
        tokio::task::spawn_blocking(move || linker.try_unlink_region(&request.descriptor)).await;

    match removed {
        Ok(Ok(removed)) => Json(json!({ "removed": removed })).into_response(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "unlink failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => task_panicked(e),
    }
}

/// `GET /api/links` — list linked regions.
pub async fn list_links_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let linker = Arc::clone(&state.linker);
    let links = tokio::task::spawn_blocking(move || linker.hyperlinks()).await;

    match links {
        Ok(Ok(regions)) => Json(json!({ "regions": regions })).into_response(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "hyperlink listing failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => task_panicked(e),
    }
}

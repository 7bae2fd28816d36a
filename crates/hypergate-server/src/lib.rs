//! Hypergate server library logic.

pub mod api_homeagent;
pub mod api_links;
pub mod api_rpc;
pub mod config;
pub mod policy;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use hypergate_db::DbPool;
use hypergate_federation::{AgentTransferPolicy, SessionTable};
use hypergate_grid::{HypergridLinker, RegionDirectory};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Region directory backed by the pool.
    pub directory: RegionDirectory,
    /// Hyperlink establishment and teardown.
    ///
    /// Fully synchronous (SQLite plus a blocking HTTP handshake); handlers
    /// call it through `spawn_blocking`.
    pub linker: Arc<HypergridLinker>,
    /// Live sessions this grid has issued.
    pub sessions: Arc<SessionTable>,
    /// Acceptance decision for inbound agent transfers.
    pub policy: Arc<dyn AgentTransferPolicy>,
    /// The external name remote grids know this grid by.
    pub external_name: String,
    /// Region directory scope.
    pub scope_id: Uuid,
}

/// Maximum request body size (2 MiB). Protects against OOM from oversized
/// payloads.
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/homeagent/{agent_id}/",
            post(api_homeagent::home_agent_handler),
        )
        .route("/rpc/{method}", post(api_rpc::rpc_handler))
        .route(
            "/api/links",
            post(api_links::create_link_handler)
                .delete(api_links::remove_link_handler)
                .get(api_links::list_links_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}

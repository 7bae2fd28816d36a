//! Shared types and wire codec for the Hypergate federation plane.
//!
//! This crate provides the foundational types used across all Hypergate
//! crates: the region descriptor (`GridRegion`) and its packed 64-bit
//! coordinate handle, the agent session record (`AgentCircuitRecord`) with
//! its structured-map wire codec, the avatar appearance snapshot carried
//! inside it, and the region flag constants shared with the persisted
//! region directory.
//!
//! No crate in the workspace depends on anything *except* `hypergate-types`
//! for cross-cutting type definitions. This keeps the dependency graph
//! clean and prevents circular dependencies.

pub mod appearance;
pub mod circuit;
pub mod region;
pub mod vector;

pub use appearance::{AppearanceSnapshot, Attachment, WearableSlot, MAX_WEARABLES};
pub use circuit::AgentCircuitRecord;
pub use region::{region_flags, GridRegion, REGION_SIZE};
pub use vector::Vector3;

/// Well-known service-URL keys carried in a circuit's `service_urls` map.
///
/// A visiting account advertises its home grid's endpoints under these
/// names; their absence marks the account as native to the current grid.
pub mod service_urls {
    pub const INVENTORY_SERVER_URI: &str = "InventoryServerURI";
    pub const ASSET_SERVER_URI: &str = "AssetServerURI";
    pub const HOME_URI: &str = "HomeURI";
    pub const GATEKEEPER_URI: &str = "GatekeeperURI";
}

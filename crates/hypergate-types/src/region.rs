//! Region descriptors and the packed coordinate handle.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Width of one region in meters. Grid coordinates are stored in meters at
/// region-size granularity.
pub const REGION_SIZE: u32 = 256;

/// Flag bits stored with a persisted region directory row.
///
/// The numeric values are part of the persisted format and must not change.
pub mod region_flags {
    pub const DEFAULT_REGION: u32 = 1;
    pub const FALLBACK_REGION: u32 = 2;
    pub const REGION_ONLINE: u32 = 4;
    pub const NO_DIRECT_LOGIN: u32 = 8;
    pub const HYPERLINK: u32 = 512;

    /// The flag set applied to every hyperlinked remote region.
    pub const HYPERLINK_DEFAULTS: u32 = HYPERLINK | NO_DIRECT_LOGIN | REGION_ONLINE;
}

/// Identifies a region anywhere in the federation.
///
/// Immutable once a gatekeeper handshake confirms it, except that the remote
/// side's authoritative answer may correct the display name and coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRegion {
    pub region_id: Uuid,
    pub scope_id: Uuid,
    /// X coordinate in meters (region-size granularity).
    pub loc_x: i32,
    /// Y coordinate in meters (region-size granularity).
    pub loc_y: i32,
    pub name: String,
    pub external_host: String,
    pub http_port: u16,
    pub internal_port: u16,
    /// Map tile asset shown for this region.
    pub map_image: Uuid,
}

impl Default for GridRegion {
    fn default() -> Self {
        Self {
            region_id: Uuid::nil(),
            scope_id: Uuid::nil(),
            loc_x: 0,
            loc_y: 0,
            name: String::new(),
            external_host: String::new(),
            http_port: 0,
            internal_port: 0,
            map_image: Uuid::nil(),
        }
    }
}

impl GridRegion {
    /// A bare region at the given coordinates (meters).
    pub fn at(loc_x: i32, loc_y: i32) -> Self {
        Self {
            loc_x,
            loc_y,
            ..Self::default()
        }
    }

    /// Packs the coordinates into the 64-bit region handle
    /// (`x` in the high word, `y` in the low word, both in meters).
    pub fn handle(&self) -> u64 {
        pack_handle(self.loc_x as u32, self.loc_y as u32)
    }

    /// Base server URL for this region's HTTP services.
    pub fn server_uri(&self) -> String {
        format!("http://{}:{}", self.external_host, self.http_port)
    }
}

/// Packs an (x, y) meter coordinate pair into a region handle.
pub fn pack_handle(x: u32, y: u32) -> u64 {
    ((x as u64) << 32) | y as u64
}

/// Unpacks a region handle into its (x, y) meter coordinates.
pub fn unpack_handle(handle: u64) -> (u32, u32) {
    ((handle >> 32) as u32, handle as u32)
}

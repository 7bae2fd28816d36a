//! Avatar appearance snapshot carried inside a circuit record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of wearable slots a client can populate (body, skin, hair, eyes,
/// shirt, pants, shoes, socks, jacket, gloves, undershirt, underpants,
/// skirt). Fixed by the client protocol.
pub const MAX_WEARABLES: usize = 13;

/// One wearable slot: the inventory item worn there and the asset it
/// resolves to. Empty slots hold nil UUIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WearableSlot {
    pub item_id: Uuid,
    pub asset_id: Uuid,
}

/// An object attached to an avatar attachment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub point: i32,
    pub item_id: Uuid,
    pub asset_id: Uuid,
}

/// Snapshot of an avatar's appearance, re-serialized at every region
/// crossing and every hypergrid hop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppearanceSnapshot {
    /// Monotonic serial bumped by the client on every appearance change.
    pub serial: i32,
    /// Fixed-capacity wearable slots, indexed by slot position.
    pub wearables: Vec<WearableSlot>,
    /// Attachments in attachment-point order.
    pub attachments: Vec<Attachment>,
}

impl Default for AppearanceSnapshot {
    fn default() -> Self {
        Self {
            serial: 0,
            wearables: vec![WearableSlot::default(); MAX_WEARABLES],
            attachments: Vec::new(),
        }
    }
}

//! Inventory folder and item records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Folder type codes shared with client software.
///
/// The numeric values are part of the wire and persisted formats and must
/// not change. `FOLDER` and `UNKNOWN` mark plain user folders with no
/// system role.
pub mod folder_types {
    pub const UNKNOWN: i16 = -1;
    pub const TEXTURE: i16 = 0;
    pub const SOUND: i16 = 1;
    pub const CALLING_CARD: i16 = 2;
    pub const LANDMARK: i16 = 3;
    pub const CLOTHING: i16 = 5;
    pub const OBJECT: i16 = 6;
    pub const NOTECARD: i16 = 7;
    /// Plain folder, and also the synthesized type of the root entry.
    pub const FOLDER: i16 = 8;
    pub const ROOT: i16 = 9;
    pub const LSL_TEXT: i16 = 10;
    pub const BODY_PART: i16 = 13;
    pub const TRASH: i16 = 14;
    pub const SNAPSHOT: i16 = 15;
    pub const LOST_AND_FOUND: i16 = 16;
    pub const ANIMATION: i16 = 20;
    pub const GESTURE: i16 = 21;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryFolder {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub owner: Uuid,
    pub name: String,
    pub folder_type: i16,
    pub version: u16,
}

impl Default for InventoryFolder {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            parent_id: Uuid::nil(),
            owner: Uuid::nil(),
            name: String::new(),
            folder_type: folder_types::FOLDER,
            version: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub folder_id: Uuid,
    pub owner: Uuid,
    pub creator_id: Uuid,
    pub name: String,
    pub description: String,
    pub asset_id: Uuid,
    pub asset_type: i16,
    pub inv_type: i16,
    pub flags: u32,
}

/// Contents of one folder: immediate child folders and items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderContent {
    pub owner: Uuid,
    pub folder_id: Uuid,
    pub folders: Vec<InventoryFolder>,
    pub items: Vec<InventoryItem>,
}

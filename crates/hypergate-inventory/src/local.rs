//! Seams to the grid's own inventory and account services.

use crate::types::{FolderContent, InventoryFolder, InventoryItem};
use std::collections::BTreeMap;
use uuid::Uuid;

/// The grid's own inventory backend. Implementations are expected to be
/// cheap local calls (database or in-process service); all operations
/// answer with the same negative-on-failure semantics the router exposes.
pub trait LocalInventoryService: Send + Sync {
    fn get_root_folder(&self, owner: Uuid) -> Option<InventoryFolder>;
    fn get_folder_content(&self, owner: Uuid, folder_id: Uuid) -> Option<FolderContent>;
    fn get_folder_items(&self, owner: Uuid, folder_id: Uuid) -> Vec<InventoryItem>;

    fn add_folder(&self, folder: &InventoryFolder) -> bool;
    fn update_folder(&self, folder: &InventoryFolder) -> bool;
    fn move_folder(&self, folder: &InventoryFolder) -> bool;
    fn purge_folder(&self, folder: &InventoryFolder) -> bool;
    fn delete_folders(&self, owner: Uuid, folder_ids: &[Uuid]) -> bool;

    fn add_item(&self, item: &InventoryItem) -> bool;
    fn update_item(&self, item: &InventoryItem) -> bool;
    fn move_items(&self, owner: Uuid, items: &[InventoryItem]) -> bool;
    fn delete_items(&self, owner: Uuid, item_ids: &[Uuid]) -> bool;

    fn get_item(&self, owner: Uuid, item_id: Uuid) -> Option<InventoryItem>;
    fn get_folder(&self, owner: Uuid, folder_id: Uuid) -> Option<InventoryFolder>;
    fn get_asset_permissions(&self, owner: Uuid, asset_id: Uuid) -> u32;

    /// Backends that resolve system folders themselves return them here;
    /// the router synthesizes the map from root-folder children otherwise.
    fn system_folders(&self, _owner: Uuid) -> Option<BTreeMap<i16, InventoryFolder>> {
        None
    }
}

/// Account existence on this grid. A user with a local account is native
/// regardless of any session state.
pub trait AccountLookup: Send + Sync {
    fn account_exists(&self, scope_id: Uuid, user_id: Uuid) -> bool;
}

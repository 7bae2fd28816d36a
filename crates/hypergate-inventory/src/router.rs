//! Per-call local/foreign inventory dispatch.

use crate::local::{AccountLookup, LocalInventoryService};
use crate::remote::RemoteInventoryClient;
use crate::types::{folder_types, FolderContent, InventoryFolder, InventoryItem};
use hypergate_federation::SessionTable;
use hypergate_types::service_urls;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Routes each inventory operation to the local backend or to the owner's
/// home-grid inventory service.
///
/// Classification happens per call, not per session: a user is local when
/// a local account exists; otherwise their live session's
/// `InventoryServerURI` marks them foreign. No account and no session
/// data classifies as local — the call then falls through to the local
/// backend rather than being dropped.
pub struct InventoryRouter {
    local: Arc<dyn LocalInventoryService>,
    remote: RemoteInventoryClient,
    accounts: Arc<dyn AccountLookup>,
    sessions: Arc<SessionTable>,
    scope_id: Uuid,
}

impl InventoryRouter {
    pub fn new(
        local: Arc<dyn LocalInventoryService>,
        remote: RemoteInventoryClient,
        accounts: Arc<dyn AccountLookup>,
        sessions: Arc<SessionTable>,
        scope_id: Uuid,
    ) -> Self {
        Self {
            local,
            remote,
            accounts,
            sessions,
            scope_id,
        }
    }

    /// `(true, home_inventory_url)` for a visitor, `(false, "")` for a
    /// native user.
    pub fn is_foreign_user(&self, user_id: Uuid) -> (bool, String) {
        if self.accounts.account_exists(self.scope_id, user_id) {
            return (false, String::new());
        }
        match self
            .sessions
            .service_url(user_id, service_urls::INVENTORY_SERVER_URI)
        {
            Some(url) => (true, url.trim_end_matches('/').to_string()),
            None => (false, String::new()),
        }
    }

    /// The remote call target for a foreign owner: their inventory URL
    /// with the owner id appended, plus the live session id.
    fn foreign_target(&self, owner: Uuid) -> Option<(String, Uuid)> {
        let (foreign, url) = self.is_foreign_user(owner);
        if !foreign {
            return None;
        }
        let session_id = self.sessions.session_id_for_agent(owner);
        Some((format!("{url}/{owner}"), session_id))
    }

    pub fn get_folder_content(&self, owner: Uuid, folder_id: Uuid) -> Option<FolderContent> {
        match self.foreign_target(owner) {
            None => self.local.get_folder_content(owner, folder_id),
            Some((uri, session)) => self.remote.get_folder_content(&uri, folder_id, session),
        }
    }

    pub fn get_folder_items(&self, owner: Uuid, folder_id: Uuid) -> Vec<InventoryItem> {
        match self.foreign_target(owner) {
            None => self.local.get_folder_items(owner, folder_id),
            Some((uri, session)) => self.remote.get_folder_items(&uri, folder_id, session),
        }
    }

    pub fn add_folder(&self, folder: &InventoryFolder) -> bool {
        match self.foreign_target(folder.owner) {
            None => self.local.add_folder(folder),
            Some((uri, session)) => self.remote.add_folder(&uri, folder, session),
        }
    }

    pub fn update_folder(&self, folder: &InventoryFolder) -> bool {
        match self.foreign_target(folder.owner) {
            None => self.local.update_folder(folder),
            Some((uri, session)) => self.remote.update_folder(&uri, folder, session),
        }
    }

    pub fn move_folder(&self, folder: &InventoryFolder) -> bool {
        match self.foreign_target(folder.owner) {
            None => self.local.move_folder(folder),
            Some((uri, session)) => self.remote.move_folder(&uri, folder, session),
        }
    }

    pub fn purge_folder(&self, folder: &InventoryFolder) -> bool {
        match self.foreign_target(folder.owner) {
            None => self.local.purge_folder(folder),
            Some((uri, session)) => self.remote.purge_folder(&uri, folder, session),
        }
    }

    /// An empty batch deletes nothing and reports failure.
    pub fn delete_folders(&self, owner: Uuid, folder_ids: &[Uuid]) -> bool {
        if folder_ids.is_empty() {
            return false;
        }
        match self.foreign_target(owner) {
            None => self.local.delete_folders(owner, folder_ids),
            Some((uri, session)) => self.remote.delete_folders(&uri, folder_ids, session),
        }
    }

    pub fn add_item(&self, item: &InventoryItem) -> bool {
        match self.foreign_target(item.owner) {
            None => self.local.add_item(item),
            Some((uri, session)) => self.remote.add_item(&uri, item, session),
        }
    }

    pub fn update_item(&self, item: &InventoryItem) -> bool {
        match self.foreign_target(item.owner) {
            None => self.local.update_item(item),
            Some((uri, session)) => self.remote.update_item(&uri, item, session),
        }
    }

    /// An empty batch is a vacuous success, no call is made.
    pub fn move_items(&self, owner: Uuid, items: &[InventoryItem]) -> bool {
        if items.is_empty() {
            return true;
        }
        match self.foreign_target(owner) {
            None => self.local.move_items(owner, items),
            Some((uri, session)) => self.remote.move_items(&uri, items, session),
        }
    }

    /// An empty batch is a vacuous success, no call is made.
    pub fn delete_items(&self, owner: Uuid, item_ids: &[Uuid]) -> bool {
        if item_ids.is_empty() {
            return true;
        }
        tracing::debug!(count = item_ids.len(), owner = %owner, "deleting items");
        match self.foreign_target(owner) {
            None => self.local.delete_items(owner, item_ids),
            Some((uri, session)) => self.remote.delete_items(&uri, item_ids, session),
        }
    }

    pub fn get_item(&self, owner: Uuid, item_id: Uuid) -> Option<InventoryItem> {
        match self.foreign_target(owner) {
            None => self.local.get_item(owner, item_id),
            Some((uri, session)) => self.remote.query_item(&uri, item_id, session),
        }
    }

    pub fn get_folder(&self, owner: Uuid, folder_id: Uuid) -> Option<InventoryFolder> {
        match self.foreign_target(owner) {
            None => self.local.get_folder(owner, folder_id),
            Some((uri, session)) => self.remote.query_folder(&uri, folder_id, session),
        }
    }

    pub fn get_asset_permissions(&self, owner: Uuid, asset_id: Uuid) -> u32 {
        match self.foreign_target(owner) {
            None => self.local.get_asset_permissions(owner, asset_id),
            Some((uri, session)) => self.remote.get_asset_permissions(&uri, asset_id, session),
        }
    }

    /// System folders indexed by folder type. Local users get the
    /// backend's own resolution when it has one, else the map is
    /// synthesized from the root folder's immediate children; the root
    /// itself is filed under the plain `FOLDER` type.
    pub fn get_system_folders(&self, owner: Uuid) -> BTreeMap<i16, InventoryFolder> {
        if let Some((uri, session)) = self.foreign_target(owner) {
            return self.remote.get_system_folders(&uri, session);
        }
        if let Some(folders) = self.local.system_folders(owner) {
            return folders;
        }
        self.synthesize_system_folders(owner)
    }

    fn synthesize_system_folders(&self, owner: Uuid) -> BTreeMap<i16, InventoryFolder> {
        let Some(root) = self.local.get_root_folder(owner) else {
            return BTreeMap::new();
        };
        let Some(content) = self.local.get_folder_content(owner, root.id) else {
            return BTreeMap::new();
        };
        let mut folders: BTreeMap<i16, InventoryFolder> = content
            .folders
            .into_iter()
            .filter(|f| {
                f.folder_type != folder_types::FOLDER && f.folder_type != folder_types::UNKNOWN
            })
            .map(|f| (f.folder_type, f))
            .collect();
        folders.insert(folder_types::FOLDER, root);
        folders
    }

    /// Whole-inventory download is not supported across grids.
    pub fn get_user_inventory(&self, owner: Uuid) -> Option<FolderContent> {
        tracing::debug!(owner = %owner, "whole-inventory fetch is not supported");
        None
    }

    pub fn has_inventory_for_user(&self, _owner: Uuid) -> bool {
        false
    }

    pub fn get_active_gestures(&self, _owner: Uuid) -> Vec<InventoryItem> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypergate_types::AgentCircuitRecord;
    use std::net::TcpListener;
    use std::sync::Mutex;

    /// Records every call; answers reads from fixed folders.
    #[derive(Default)]
    struct FakeLocal {
        calls: Mutex<Vec<&'static str>>,
        root: Option<InventoryFolder>,
        children: Vec<InventoryFolder>,
    }

    impl FakeLocal {
        fn log(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl LocalInventoryService for FakeLocal {
        fn get_root_folder(&self, _owner: Uuid) -> Option<InventoryFolder> {
            self.log("get_root_folder");
            self.root.clone()
        }
        fn get_folder_content(&self, owner: Uuid, folder_id: Uuid) -> Option<FolderContent> {
            self.log("get_folder_content");
            Some(FolderContent {
                owner,
                folder_id,
                folders: self.children.clone(),
                items: Vec::new(),
            })
        }
        fn get_folder_items(&self, _owner: Uuid, _folder_id: Uuid) -> Vec<InventoryItem> {
            self.log("get_folder_items");
            Vec::new()
        }
        fn add_folder(&self, _folder: &InventoryFolder) -> bool {
            self.log("add_folder");
            true
        }
        fn update_folder(&self, _folder: &InventoryFolder) -> bool {
            self.log("update_folder");
            true
        }
        fn move_folder(&self, _folder: &InventoryFolder) -> bool {
            self.log("move_folder");
            true
        }
        fn purge_folder(&self, _folder: &InventoryFolder) -> bool {
            self.log("purge_folder");
            true
        }
        fn delete_folders(&self, _owner: Uuid, _folder_ids: &[Uuid]) -> bool {
            self.log("delete_folders");
            true
        }
        fn add_item(&self, _item: &InventoryItem) -> bool {
            self.log("add_item");
            true
        }
        fn update_item(&self, _item: &InventoryItem) -> bool {
            self.log("update_item");
            true
        }
        fn move_items(&self, _owner: Uuid, _items: &[InventoryItem]) -> bool {
            self.log("move_items");
            true
        }
        fn delete_items(&self, _owner: Uuid, _item_ids: &[Uuid]) -> bool {
            self.log("delete_items");
            true
        }
        fn get_item(&self, _owner: Uuid, _item_id: Uuid) -> Option<InventoryItem> {
            self.log("get_item");
            None
        }
        fn get_folder(&self, _owner: Uuid, _folder_id: Uuid) -> Option<InventoryFolder> {
            self.log("get_folder");
            None
        }
        fn get_asset_permissions(&self, _owner: Uuid, _asset_id: Uuid) -> u32 {
            self.log("get_asset_permissions");
            0
        }
    }

    struct FakeAccounts {
        known: Vec<Uuid>,
    }

    impl AccountLookup for FakeAccounts {
        fn account_exists(&self, _scope_id: Uuid, user_id: Uuid) -> bool {
            self.known.contains(&user_id)
        }
    }

    fn visiting_circuit(agent_id: Uuid, inventory_uri: &str) -> AgentCircuitRecord {
        let mut circuit = AgentCircuitRecord {
            agent_id,
            session_id: Uuid::new_v4(),
            ..Default::default()
        };
        circuit.service_urls.insert(
            service_urls::INVENTORY_SERVER_URI.into(),
            inventory_uri.into(),
        );
        circuit
    }

    fn router(
        local: Arc<FakeLocal>,
        known_accounts: Vec<Uuid>,
        sessions: Arc<SessionTable>,
    ) -> InventoryRouter {
        InventoryRouter::new(
            local,
            RemoteInventoryClient::new(),
            Arc::new(FakeAccounts {
                known: known_accounts,
            }),
            sessions,
            Uuid::nil(),
        )
    }

    #[test]
    fn visitor_with_session_is_foreign() {
        let user = Uuid::new_v4();
        let sessions = Arc::new(SessionTable::new());
        sessions.insert(
            visiting_circuit(user, "http://home.example/inv"),
            "http://home.example",
        );
        let r = router(Arc::new(FakeLocal::default()), vec![], sessions);

        assert_eq!(
            r.is_foreign_user(user),
            (true, "http://home.example/inv".to_string())
        );
    }

    #[test]
    fn no_account_and_no_session_falls_open_to_local() {
        let user = Uuid::new_v4();
        let r = router(
            Arc::new(FakeLocal::default()),
            vec![],
            Arc::new(SessionTable::new()),
        );

        assert_eq!(r.is_foreign_user(user), (false, String::new()));
    }

    #[test]
    fn local_account_wins_over_session_urls() {
        let user = Uuid::new_v4();
        let sessions = Arc::new(SessionTable::new());
        sessions.insert(
            visiting_circuit(user, "http://home.example/inv"),
            "http://home.example",
        );
        let local = Arc::new(FakeLocal::default());
        let r = router(Arc::clone(&local), vec![user], sessions);

        assert_eq!(r.is_foreign_user(user), (false, String::new()));
        assert!(r.delete_items(user, &[Uuid::new_v4()]));
        assert_eq!(local.calls(), vec!["delete_items"]);
    }

    #[test]
    fn inventory_url_is_trimmed_of_trailing_slashes() {
        let user = Uuid::new_v4();
        let sessions = Arc::new(SessionTable::new());
        sessions.insert(
            visiting_circuit(user, "http://home.example/inv/"),
            "http://home.example",
        );
        let r = router(Arc::new(FakeLocal::default()), vec![], sessions);

        assert_eq!(r.is_foreign_user(user).1, "http://home.example/inv");

        // Only the trailing end is trimmed; a leading slash survives.
        let other = Uuid::new_v4();
        r.sessions
            .insert(visiting_circuit(other, "/inventory/"), "http://home.example");
        assert_eq!(r.is_foreign_user(other).1, "/inventory");
    }

    #[test]
    fn empty_batches_short_circuit_without_dispatch() {
        let user = Uuid::new_v4();
        let local = Arc::new(FakeLocal::default());
        let r = router(Arc::clone(&local), vec![], Arc::new(SessionTable::new()));

        assert!(!r.delete_folders(user, &[]));
        assert!(r.move_items(user, &[]));
        assert!(r.delete_items(user, &[]));
        assert!(local.calls().is_empty());
    }

    #[test]
    fn foreign_transport_failure_is_negative() {
        // Grab a port and release it so the remote call is refused.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let user = Uuid::new_v4();
        let sessions = Arc::new(SessionTable::new());
        sessions.insert(
            visiting_circuit(user, &format!("http://{addr}/inv")),
            "http://home.example",
        );
        let local = Arc::new(FakeLocal::default());
        let r = router(Arc::clone(&local), vec![], sessions);

        let item = InventoryItem {
            owner: user,
            ..Default::default()
        };
        assert!(!r.add_item(&item));
        assert!(r.get_item(user, Uuid::new_v4()).is_none());
        // Nothing fell through to the local backend.
        assert!(local.calls().is_empty());
    }

    #[test]
    fn system_folders_synthesized_from_root_children() {
        let owner = Uuid::new_v4();
        let root = InventoryFolder {
            id: Uuid::new_v4(),
            owner,
            name: "My Inventory".into(),
            folder_type: folder_types::ROOT,
            ..Default::default()
        };
        let child = |name: &str, folder_type: i16| InventoryFolder {
            id: Uuid::new_v4(),
            parent_id: root.id,
            owner,
            name: name.into(),
            folder_type,
            ..Default::default()
        };
        let local = Arc::new(FakeLocal {
            root: Some(root.clone()),
            children: vec![
                child("Clothing", folder_types::CLOTHING),
                child("Trash", folder_types::TRASH),
                child("Photos", folder_types::FOLDER),
                child("Stuff", folder_types::UNKNOWN),
            ],
            ..Default::default()
        });
        let r = router(local, vec![], Arc::new(SessionTable::new()));

        let folders = r.get_system_folders(owner);
        assert_eq!(folders.len(), 3);
        assert_eq!(folders[&folder_types::CLOTHING].name, "Clothing");
        assert_eq!(folders[&folder_types::TRASH].name, "Trash");
        // The root itself is filed under the plain folder type; untyped
        // children are not system folders.
        assert_eq!(folders[&folder_types::FOLDER].id, root.id);
    }

    #[test]
    fn cross_grid_unsupported_operations() {
        let r = router(
            Arc::new(FakeLocal::default()),
            vec![],
            Arc::new(SessionTable::new()),
        );
        let user = Uuid::new_v4();
        assert!(r.get_user_inventory(user).is_none());
        assert!(!r.has_inventory_for_user(user));
        assert!(r.get_active_gestures(user).is_empty());
    }
}

//! Session-authenticated client for a visitor's home inventory service.
//!
//! Each operation is one JSON POST to `{uri}/{operation}`, where `uri` is
//! the visitor's inventory URL with their user id appended. The live
//! session id rides in the body; the remote side checks it against its own
//! session records. Any transport or decode failure is the negative
//! result, no retries.

use crate::types::{FolderContent, InventoryFolder, InventoryItem};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

const REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RemoteInventoryClient {
    http: reqwest::blocking::Client,
}

impl Default for RemoteInventoryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteInventoryClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
        }
    }

    fn call(&self, uri: &str, operation: &str, session_id: Uuid, mut body: Value) -> Option<Value> {
        if let Some(map) = body.as_object_mut() {
            map.insert("session_id".into(), json!(session_id));
        }
        let url = format!("{uri}/{operation}");
        let response = self
            .http
            .post(&url)
            .timeout(REMOTE_TIMEOUT)
            .json(&body)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|err| {
                tracing::warn!(url, error = %err, "remote inventory call failed");
            })
            .ok()?;
        response
            .json::<Value>()
            .map_err(|err| {
                tracing::warn!(url, error = %err, "remote inventory reply was not JSON");
            })
            .ok()
    }

    fn call_bool(&self, uri: &str, operation: &str, session_id: Uuid, body: Value) -> bool {
        self.call(uri, operation, session_id, body)
            .and_then(|v| v.get("result").and_then(Value::as_bool))
            .unwrap_or(false)
    }

    pub fn get_folder_content(
        &self,
        uri: &str,
        folder_id: Uuid,
        session_id: Uuid,
    ) -> Option<FolderContent> {
        let reply = self.call(
            uri,
            "get_folder_content",
            session_id,
            json!({ "folder_id": folder_id }),
        )?;
        serde_json::from_value(reply).ok()
    }

    pub fn get_folder_items(
        &self,
        uri: &str,
        folder_id: Uuid,
        session_id: Uuid,
    ) -> Vec<InventoryItem> {
        self.call(
            uri,
            "get_folder_items",
            session_id,
            json!({ "folder_id": folder_id }),
        )
        .and_then(|v| serde_json::from_value(v.get("items")?.clone()).ok())
        .unwrap_or_default()
    }

    pub fn add_folder(&self, uri: &str, folder: &InventoryFolder, session_id: Uuid) -> bool {
        self.call_bool(uri, "add_folder", session_id, json!({ "folder": folder }))
    }

    pub fn update_folder(&self, uri: &str, folder: &InventoryFolder, session_id: Uuid) -> bool {
        self.call_bool(uri, "update_folder", session_id, json!({ "folder": folder }))
    }

    pub fn move_folder(&self, uri: &str, folder: &InventoryFolder, session_id: Uuid) -> bool {
        self.call_bool(uri, "move_folder", session_id, json!({ "folder": folder }))
    }

    pub fn purge_folder(&self, uri: &str, folder: &InventoryFolder, session_id: Uuid) -> bool {
        self.call_bool(uri, "purge_folder", session_id, json!({ "folder": folder }))
    }

    pub fn delete_folders(&self, uri: &str, folder_ids: &[Uuid], session_id: Uuid) -> bool {
        self.call_bool(
            uri,
            "delete_folders",
            session_id,
            json!({ "folder_ids": folder_ids }),
        )
    }

    pub fn add_item(&self, uri: &str, item: &InventoryItem, session_id: Uuid) -> bool {
        self.call_bool(uri, "add_item", session_id, json!({ "item": item }))
    }

    pub fn update_item(&self, uri: &str, item: &InventoryItem, session_id: Uuid) -> bool {
        self.call_bool(uri, "update_item", session_id, json!({ "item": item }))
    }

    pub fn move_items(&self, uri: &str, items: &[InventoryItem], session_id: Uuid) -> bool {
        self.call_bool(uri, "move_items", session_id, json!({ "items": items }))
    }

    pub fn delete_items(&self, uri: &str, item_ids: &[Uuid], session_id: Uuid) -> bool {
        self.call_bool(
            uri,
            "delete_items",
            session_id,
            json!({ "item_ids": item_ids }),
        )
    }

    pub fn query_item(&self, uri: &str, item_id: Uuid, session_id: Uuid) -> Option<InventoryItem> {
        let reply = self.call(uri, "get_item", session_id, json!({ "item_id": item_id }))?;
        serde_json::from_value(reply.get("item")?.clone()).ok()
    }

    pub fn query_folder(
        &self,
        uri: &str,
        folder_id: Uuid,
        session_id: Uuid,
    ) -> Option<InventoryFolder> {
        let reply = self.call(
            uri,
            "get_folder",
            session_id,
            json!({ "folder_id": folder_id }),
        )?;
        serde_json::from_value(reply.get("folder")?.clone()).ok()
    }

    pub fn get_asset_permissions(&self, uri: &str, asset_id: Uuid, session_id: Uuid) -> u32 {
        self.call(
            uri,
            "get_asset_permissions",
            session_id,
            json!({ "asset_id": asset_id }),
        )
        .and_then(|v| v.get("permissions").and_then(Value::as_u64))
        .unwrap_or(0) as u32
    }

    pub fn get_system_folders(
        &self,
        uri: &str,
        session_id: Uuid,
    ) -> BTreeMap<i16, InventoryFolder> {
        let Some(reply) = self.call(uri, "get_system_folders", session_id, json!({})) else {
            return BTreeMap::new();
        };
        let Some(folders) = reply.get("folders").and_then(Value::as_object) else {
            return BTreeMap::new();
        };
        folders
            .iter()
            .filter_map(|(type_code, folder)| {
                let type_code = type_code.parse::<i16>().ok()?;
                let folder = serde_json::from_value(folder.clone()).ok()?;
                Some((type_code, folder))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Accepts one connection and replies with the given JSON body.
    fn one_shot_server(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let reply = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(reply.as_bytes());
            }
        });
        format!("http://{addr}/owner")
    }

    #[test]
    fn bool_operation_reads_result_field() {
        let uri = one_shot_server(r#"{"result": true}"#);
        let client = RemoteInventoryClient::new();
        assert!(client.delete_items(&uri, &[Uuid::new_v4()], Uuid::new_v4()));
    }

    #[test]
    fn transport_failure_is_negative() {
        // Grab a port and release it so the connection is refused.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let client = RemoteInventoryClient::new();
        let uri = format!("http://{addr}/owner");
        assert!(!client.add_item(&uri, &InventoryItem::default(), Uuid::new_v4()));
        assert!(client.query_item(&uri, Uuid::new_v4(), Uuid::new_v4()).is_none());
        assert_eq!(client.get_asset_permissions(&uri, Uuid::new_v4(), Uuid::new_v4()), 0);
    }

    #[test]
    fn system_folders_parse_typed_map() {
        let uri = one_shot_server(
            r#"{"folders": {"8": {"id": "11111111-1111-1111-1111-111111111111",
                "parent_id": "00000000-0000-0000-0000-000000000000",
                "owner": "22222222-2222-2222-2222-222222222222",
                "name": "My Inventory", "folder_type": 8, "version": 1},
                "bogus": {}}}"#,
        );
        let client = RemoteInventoryClient::new();
        let folders = client.get_system_folders(&uri, Uuid::new_v4());
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[&8].name, "My Inventory");
    }
}

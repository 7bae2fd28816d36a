//! The agent circuit record and its structured-map wire codec.
//!
//! The wire format is a flat JSON object whose key names and value shapes
//! are fixed by the federation protocol: numeric credentials travel as
//! strings, wearables as a flattened `[item, asset, ...]` pair sequence,
//! service URLs as a flattened `[name, value, ...]` sequence, and empty
//! collections are omitted entirely. Decoding is tolerant by contract —
//! a missing optional key falls back to its default and a non-parseable
//! numeric field is skipped rather than failing the decode.

use crate::appearance::{AppearanceSnapshot, Attachment, MAX_WEARABLES};
use crate::vector::Vector3;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Session, identity, and appearance data for one connecting agent.
///
/// Created at login, re-serialized at every region crossing and every
/// hypergrid hop, destroyed when the session ends. The region hosting the
/// live connection owns the record exclusively; a destination region
/// receives a copy, never a reference.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgentCircuitRecord {
    pub agent_id: Uuid,
    pub session_id: Uuid,
    /// Disclosed only over secure channels; pairs with `session_id`.
    pub secure_session_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Root inventory folder on the home grid.
    pub base_folder: Uuid,
    pub inventory_folder: Uuid,
    pub caps_path: String,
    /// Numeric credential the client presents to the region's UDP endpoint.
    pub circuit_code: u32,
    /// Capability seeds for neighbor regions, keyed by region handle.
    pub children_seeds: BTreeMap<u64, String>,
    /// Child agent (camera-only neighbor presence) vs. root agent.
    pub child: bool,
    /// Hypergrid service token; one unique token per visited grid.
    pub service_session_id: String,
    pub viewer: String,
    pub start_pos: Vector3,
    /// Named home-grid endpoints (`InventoryServerURI`, `AssetServerURI`,
    /// `HomeURI`, `GatekeeperURI`). Absence of an inventory entry marks the
    /// account as native to the current grid.
    pub service_urls: BTreeMap<String, String>,
    pub appearance: AppearanceSnapshot,
}

impl AgentCircuitRecord {
    /// Serializes this record into the wire map.
    pub fn encode(&self) -> Map<String, Value> {
        let mut args = Map::new();
        args.insert("agent_id".into(), json!(self.agent_id.to_string()));
        args.insert("base_folder".into(), json!(self.base_folder.to_string()));
        args.insert("caps_path".into(), json!(self.caps_path));

        if !self.children_seeds.is_empty() {
            let seeds: Vec<Value> = self
                .children_seeds
                .iter()
                .map(|(handle, seed)| json!({ "handle": handle.to_string(), "seed": seed }))
                .collect();
            args.insert("children_seeds".into(), Value::Array(seeds));
        }

        args.insert("child".into(), json!(self.child));
        args.insert("circuit_code".into(), json!(self.circuit_code.to_string()));
        args.insert("first_name".into(), json!(self.first_name));
        args.insert("last_name".into(), json!(self.last_name));
        args.insert(
            "inventory_folder".into(),
            json!(self.inventory_folder.to_string()),
        );
        args.insert(
            "secure_session_id".into(),
            json!(self.secure_session_id.to_string()),
        );
        args.insert("session_id".into(), json!(self.session_id.to_string()));
        args.insert("service_session_id".into(), json!(self.service_session_id));
        args.insert("start_pos".into(), json!(self.start_pos.to_string()));
        args.insert("appearance_serial".into(), json!(self.appearance.serial));
        args.insert("viewer".into(), json!(self.viewer));

        if !self.appearance.wearables.is_empty() {
            let mut wears = Vec::with_capacity(self.appearance.wearables.len() * 2);
            for slot in &self.appearance.wearables {
                wears.push(json!(slot.item_id.to_string()));
                wears.push(json!(slot.asset_id.to_string()));
            }
            args.insert("wearables".into(), Value::Array(wears));
        }

        if !self.appearance.attachments.is_empty() {
            let attachs: Vec<Value> = self
                .appearance
                .attachments
                .iter()
                .map(|a| {
                    json!({
                        "point": a.point,
                        "item": a.item_id.to_string(),
                        "asset": a.asset_id.to_string(),
                    })
                })
                .collect();
            args.insert("attachments".into(), Value::Array(attachs));
        }

        if !self.service_urls.is_empty() {
            let mut urls = Vec::with_capacity(self.service_urls.len() * 2);
            for (name, value) in &self.service_urls {
                urls.push(json!(name));
                urls.push(json!(value));
            }
            args.insert("service_urls".into(), Value::Array(urls));
        }

        args
    }

    /// Reconstructs a record from the wire map.
    ///
    /// Missing optional keys fall back to defaults (empty string, empty
    /// map, zero vector); non-parseable numeric fields are left at their
    /// defaults. The appearance is rebuilt as a fresh default object and
    /// overwritten field-by-field from the map.
    pub fn decode(args: &Map<String, Value>) -> Self {
        let mut record = AgentCircuitRecord::default();

        if let Some(id) = get_uuid(args, "agent_id") {
            record.agent_id = id;
        }
        if let Some(id) = get_uuid(args, "base_folder") {
            record.base_folder = id;
        }
        if let Some(s) = get_string(args, "caps_path") {
            record.caps_path = s;
        }

        if let Some(Value::Array(seeds)) = args.get("children_seeds") {
            for entry in seeds {
                let Value::Object(pair) = entry else { continue };
                let Some(handle) = pair.get("handle").and_then(value_to_string) else {
                    continue;
                };
                let Ok(handle) = handle.parse::<u64>() else {
                    continue;
                };
                let seed = pair
                    .get("seed")
                    .and_then(value_to_string)
                    .unwrap_or_default();
                record.children_seeds.entry(handle).or_insert(seed);
            }
        }

        if let Some(v) = args.get("child") {
            record.child = value_to_bool(v);
        }
        if let Some(code) = get_string(args, "circuit_code") {
            if let Ok(code) = code.parse::<u32>() {
                record.circuit_code = code;
            }
        }
        if let Some(s) = get_string(args, "first_name") {
            record.first_name = s;
        }
        if let Some(s) = get_string(args, "last_name") {
            record.last_name = s;
        }
        if let Some(id) = get_uuid(args, "inventory_folder") {
            record.inventory_folder = id;
        }
        if let Some(id) = get_uuid(args, "secure_session_id") {
            record.secure_session_id = id;
        }
        if let Some(id) = get_uuid(args, "session_id") {
            record.session_id = id;
        }
        if let Some(s) = get_string(args, "service_session_id") {
            record.service_session_id = s;
        }
        if let Some(s) = get_string(args, "viewer") {
            record.viewer = s;
        }
        if let Some(s) = get_string(args, "start_pos") {
            if let Ok(pos) = s.parse::<Vector3>() {
                record.start_pos = pos;
            }
        }

        record.appearance = AppearanceSnapshot::default();
        if let Some(serial) = get_string(args, "appearance_serial") {
            if let Ok(serial) = serial.parse::<i32>() {
                record.appearance.serial = serial;
            }
        }
        if let Some(Value::Array(wears)) = args.get("wearables") {
            // Interpreted in (item, asset) pairs; a dangling trailing entry
            // is truncated, slots past the fixed capacity are ignored.
            for i in 0..(wears.len() / 2).min(MAX_WEARABLES) {
                record.appearance.wearables[i].item_id = value_to_uuid(&wears[i * 2]);
                record.appearance.wearables[i].asset_id = value_to_uuid(&wears[i * 2 + 1]);
            }
        }
        if let Some(Value::Array(attachs)) = args.get("attachments") {
            for entry in attachs {
                let Value::Object(a) = entry else { continue };
                let point = a
                    .get("point")
                    .and_then(value_to_string)
                    .and_then(|p| p.parse::<i32>().ok())
                    .unwrap_or_default();
                record.appearance.attachments.push(Attachment {
                    point,
                    item_id: a.get("item").map(value_to_uuid).unwrap_or_default(),
                    asset_id: a.get("asset").map(value_to_uuid).unwrap_or_default(),
                });
            }
        }

        if let Some(Value::Array(urls)) = args.get("service_urls") {
            for i in 0..urls.len() / 2 {
                let Some(name) = value_to_string(&urls[i * 2]) else {
                    continue;
                };
                let value = value_to_string(&urls[i * 2 + 1]).unwrap_or_default();
                record.service_urls.insert(name, value);
            }
        }

        record
    }
}

fn get_string(args: &Map<String, Value>, key: &str) -> Option<String> {
    args.get(key).and_then(value_to_string)
}

fn get_uuid(args: &Map<String, Value>, key: &str) -> Option<Uuid> {
    args.get(key)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// String form of a scalar value; the legacy format freely mixes strings
/// and numbers for the same key.
fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_to_uuid(v: &Value) -> Uuid {
    v.as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_default()
}

fn value_to_bool(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true") || s == "1",
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appearance::WearableSlot;
    use crate::service_urls;

    fn sample_record() -> AgentCircuitRecord {
        let mut record = AgentCircuitRecord {
            agent_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            secure_session_id: Uuid::new_v4(),
            first_name: "Test".into(),
            last_name: "Visitor".into(),
            base_folder: Uuid::new_v4(),
            inventory_folder: Uuid::new_v4(),
            caps_path: "0000-cap".into(),
            circuit_code: 744_891,
            child: true,
            service_session_id: "http://home.example;token-1".into(),
            viewer: "TestViewer 1.23".into(),
            start_pos: Vector3::new(128.0, 64.0, 21.5),
            ..Default::default()
        };
        record.children_seeds.insert(
            crate::region::pack_handle(256_000, 256_000),
            "http://neighbor.example/seed".into(),
        );
        record.service_urls.insert(
            service_urls::INVENTORY_SERVER_URI.into(),
            "http://home.example/inv".into(),
        );
        record
            .service_urls
            .insert(service_urls::HOME_URI.into(), "http://home.example".into());
        record.appearance.serial = 7;
        record.appearance.wearables[0] = WearableSlot {
            item_id: Uuid::new_v4(),
            asset_id: Uuid::new_v4(),
        };
        record.appearance.wearables[4] = WearableSlot {
            item_id: Uuid::new_v4(),
            asset_id: Uuid::new_v4(),
        };
        record.appearance.attachments.push(Attachment {
            point: 6,
            item_id: Uuid::new_v4(),
            asset_id: Uuid::new_v4(),
        });
        record
    }

    #[test]
    fn round_trip_reproduces_every_field() {
        let record = sample_record();
        let decoded = AgentCircuitRecord::decode(&record.encode());
        assert_eq!(decoded, record);
    }

    #[test]
    fn circuit_code_travels_as_string() {
        let record = sample_record();
        let args = record.encode();
        assert_eq!(
            args.get("circuit_code"),
            Some(&Value::String("744891".into()))
        );
    }

    #[test]
    fn empty_collections_are_omitted() {
        let record = AgentCircuitRecord::default();
        let args = record.encode();
        assert!(!args.contains_key("children_seeds"));
        assert!(!args.contains_key("attachments"));
        assert!(!args.contains_key("service_urls"));
        // Wearable slots always exist, so the key is always present.
        assert!(args.contains_key("wearables"));
        assert!(args.contains_key("appearance_serial"));
    }

    #[test]
    fn decode_of_empty_map_yields_defaults() {
        let decoded = AgentCircuitRecord::decode(&Map::new());
        assert_eq!(decoded.agent_id, Uuid::nil());
        assert_eq!(decoded.circuit_code, 0);
        assert!(decoded.children_seeds.is_empty());
        assert!(decoded.service_urls.is_empty());
        assert_eq!(decoded.start_pos, Vector3::ZERO);
        assert_eq!(decoded.appearance, AppearanceSnapshot::default());
    }

    #[test]
    fn odd_length_wearables_truncates_dangling_entry() {
        let item = Uuid::new_v4();
        let asset = Uuid::new_v4();
        let dangling = Uuid::new_v4();
        let mut args = Map::new();
        args.insert(
            "wearables".into(),
            json!([
                item.to_string(),
                asset.to_string(),
                dangling.to_string()
            ]),
        );

        let decoded = AgentCircuitRecord::decode(&args);
        assert_eq!(decoded.appearance.wearables[0].item_id, item);
        assert_eq!(decoded.appearance.wearables[0].asset_id, asset);
        assert!(decoded.appearance.wearables[1].item_id.is_nil());
    }

    #[test]
    fn unparseable_circuit_code_is_left_at_default() {
        let mut args = Map::new();
        args.insert("circuit_code".into(), json!("not-a-number"));
        let decoded = AgentCircuitRecord::decode(&args);
        assert_eq!(decoded.circuit_code, 0);
    }

    #[test]
    fn string_typed_appearance_serial_decodes() {
        let mut args = Map::new();
        args.insert("appearance_serial".into(), json!("7"));
        let decoded = AgentCircuitRecord::decode(&args);
        assert_eq!(decoded.appearance.serial, 7);

        let mut args = Map::new();
        args.insert("appearance_serial".into(), json!(9));
        let decoded = AgentCircuitRecord::decode(&args);
        assert_eq!(decoded.appearance.serial, 9);
    }

    #[test]
    fn seed_with_bad_handle_is_skipped() {
        let mut args = Map::new();
        args.insert(
            "children_seeds".into(),
            json!([
                { "handle": "garbage", "seed": "http://a.example/seed" },
                { "handle": "42", "seed": "http://b.example/seed" },
                "not-an-object"
            ]),
        );
        let decoded = AgentCircuitRecord::decode(&args);
        assert_eq!(decoded.children_seeds.len(), 1);
        assert_eq!(
            decoded.children_seeds.get(&42).map(String::as_str),
            Some("http://b.example/seed")
        );
    }

    #[test]
    fn service_urls_decode_from_flat_pairs() {
        let mut args = Map::new();
        args.insert(
            "service_urls".into(),
            json!(["InventoryServerURI", "http://home.example/inv", "HomeURI"]),
        );
        let decoded = AgentCircuitRecord::decode(&args);
        // The dangling name with no value is truncated.
        assert_eq!(decoded.service_urls.len(), 1);
        assert_eq!(
            decoded.service_urls.get("InventoryServerURI").unwrap(),
            "http://home.example/inv"
        );
    }
}

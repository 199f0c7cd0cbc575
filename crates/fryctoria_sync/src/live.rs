//! The host's live in-memory record store.

use crate::record::Record;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// The identity map the host application reads from.
///
/// The sync layer re-keys records here once the remote assigns ids, and
/// reads from here when refreshing the shadow store.
pub trait LiveStore: Send + Sync {
    /// Returns every record of `type_name`.
    fn all(&self, type_name: &str) -> Vec<Record>;

    /// Returns the record of `type_name` with `id`.
    fn get(&self, type_name: &str, id: &str) -> Option<Record>;

    /// Inserts a record or replaces the one with the same id.
    fn upsert(&self, record: Record);

    /// Removes a record. Returns true if one was removed.
    fn remove(&self, type_name: &str, id: &str) -> bool;

    /// Replaces every record of `type_name`.
    fn replace_all(&self, type_name: &str, records: Vec<Record>);

    /// Moves the record at `old_id` to `new_id`, overlaying `server_fields`.
    ///
    /// Returns false (and changes nothing) if no record has `old_id`.
    fn rekey(
        &self,
        type_name: &str,
        old_id: &str,
        new_id: &str,
        server_fields: &Map<String, Value>,
    ) -> bool;
}

/// A [`LiveStore`] kept in process memory.
///
/// Records keep their insertion order per type.
#[derive(Debug, Default)]
pub struct MemoryLiveStore {
    records: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryLiveStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records of `type_name`.
    pub fn count(&self, type_name: &str) -> usize {
        self.records.read().get(type_name).map_or(0, Vec::len)
    }
}

impl LiveStore for MemoryLiveStore {
    fn all(&self, type_name: &str) -> Vec<Record> {
        self.records
            .read()
            .get(type_name)
            .cloned()
            .unwrap_or_default()
    }

    fn get(&self, type_name: &str, id: &str) -> Option<Record> {
        self.records
            .read()
            .get(type_name)?
            .iter()
            .find(|r| r.id().as_deref() == Some(id))
            .cloned()
    }

    fn upsert(&self, record: Record) {
        let mut records = self.records.write();
        let list = records.entry(record.type_name.clone()).or_default();
        let id = record.id();
        match id
            .as_deref()
            .and_then(|id| list.iter().position(|r| r.id().as_deref() == Some(id)))
        {
            Some(index) => list[index] = record,
            None => list.push(record),
        }
    }

    fn remove(&self, type_name: &str, id: &str) -> bool {
        let mut records = self.records.write();
        let Some(list) = records.get_mut(type_name) else {
            return false;
        };
        let before = list.len();
        list.retain(|r| r.id().as_deref() != Some(id));
        list.len() != before
    }

    fn replace_all(&self, type_name: &str, records: Vec<Record>) {
        self.records.write().insert(type_name.to_string(), records);
    }

    fn rekey(
        &self,
        type_name: &str,
        old_id: &str,
        new_id: &str,
        server_fields: &Map<String, Value>,
    ) -> bool {
        let mut records = self.records.write();
        let Some(record) = records
            .get_mut(type_name)
            .and_then(|list| list.iter_mut().find(|r| r.id().as_deref() == Some(old_id)))
        else {
            return false;
        };

        record.set_id(None);
        record.merge_fields(server_fields);
        record.set_id(Some(new_id.to_string()));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(value: Value) -> Record {
        Record::from_value("user", value)
    }

    #[test]
    fn upsert_replaces_by_id() {
        let store = MemoryLiveStore::new();
        store.upsert(user(json!({"id": "1", "name": "A"})));
        store.upsert(user(json!({"id": "1", "name": "B"})));
        store.upsert(user(json!({"id": "2"})));

        assert_eq!(store.count("user"), 2);
        assert_eq!(store.get("user", "1").unwrap().get("name"), Some(&json!("B")));
    }

    #[test]
    fn rekey_moves_record() {
        let store = MemoryLiveStore::new();
        store.upsert(user(json!({"id": "fryctoria-1", "name": "Alice"})));

        let server = json!({"id": "42", "createdAt": "now"});
        assert!(store.rekey("user", "fryctoria-1", "42", server.as_object().unwrap()));

        assert!(store.get("user", "fryctoria-1").is_none());
        let record = store.get("user", "42").unwrap();
        assert_eq!(record.get("name"), Some(&json!("Alice")));
        assert_eq!(record.get("createdAt"), Some(&json!("now")));
    }

    #[test]
    fn rekey_missing_is_noop() {
        let store = MemoryLiveStore::new();
        assert!(!store.rekey("user", "fryctoria-9", "9", &Map::new()));
        assert_eq!(store.count("user"), 0);
    }

    #[test]
    fn remove_and_replace() {
        let store = MemoryLiveStore::new();
        store.upsert(user(json!({"id": "1"})));
        assert!(store.remove("user", "1"));
        assert!(!store.remove("user", "1"));

        store.replace_all("user", vec![user(json!({"id": "5"})), user(json!({}))]);
        assert_eq!(store.all("user").len(), 2);
    }
}

//! Records exchanged between the host, the shadow store and the remote.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field holding a record's identifier.
pub const ID_FIELD: &str = "id";

/// A typed record: a flat JSON object plus its type and deletion flag.
///
/// Relationship fields hold ids: a single id for to-one relationships,
/// an array of ids for to-many relationships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Type of the record (e.g. `"user"`).
    pub type_name: String,
    /// Field values, including `id` when one is assigned.
    #[serde(default)]
    pub fields: Map<String, Value>,
    /// Whether the record has been deleted locally.
    #[serde(default)]
    pub deleted: bool,
}

impl Record {
    /// Creates a record from its fields.
    pub fn new(type_name: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
            deleted: false,
        }
    }

    /// Creates a record from a JSON object.
    ///
    /// Non-object values produce a record without fields.
    pub fn from_value(type_name: impl Into<String>, value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(type_name, fields)
    }

    /// Returns the record id, coercing numeric ids to strings.
    ///
    /// Empty ids count as missing.
    pub fn id(&self) -> Option<String> {
        id_of(&self.fields)
    }

    /// Sets or clears the record id.
    pub fn set_id(&mut self, id: Option<String>) {
        match id {
            Some(id) => {
                self.fields.insert(ID_FIELD.into(), Value::String(id));
            }
            None => {
                self.fields.insert(ID_FIELD.into(), Value::Null);
            }
        }
    }

    /// Returns this record with `id` assigned.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.set_id(Some(id.into()));
        self
    }

    /// Marks the record as deleted.
    pub fn mark_deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    /// Returns a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Overlays `other` onto this record's fields.
    pub fn merge_fields(&mut self, other: &Map<String, Value>) {
        for (k, v) in other {
            self.fields.insert(k.clone(), v.clone());
        }
    }
}

/// Reads the id of a wire-shape object.
pub fn id_of(fields: &Map<String, Value>) -> Option<String> {
    match fields.get(ID_FIELD)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

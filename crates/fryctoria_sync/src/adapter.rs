//! Remote adapters and serializers.
//!
//! The sync layer never talks to the network itself. Every remote call goes
//! through a [`RemoteAdapter`] chosen per type by the [`DataLayer`], and every
//! payload is converted by that type's [`Serializer`].

use crate::error::{SyncError, SyncResult};
use crate::record::{Record, ID_FIELD};
use crate::schema::{Schema, TypeDescriptor};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Performs remote calls for records of one or more types.
///
/// Implementations report an unreachable remote as [`SyncError::Offline`]
/// (or `SyncError::from_status(0, ..)`); every other failure is treated as
/// an application rejection.
#[async_trait]
pub trait RemoteAdapter: Send + Sync {
    /// Creates a record remotely and returns the response payload.
    async fn create_record(&self, type_name: &str, snapshot: &Map<String, Value>)
        -> SyncResult<Value>;

    /// Updates a record remotely and returns the response payload.
    async fn update_record(&self, type_name: &str, snapshot: &Map<String, Value>)
        -> SyncResult<Value>;

    /// Deletes a record remotely and returns the response payload.
    async fn delete_record(&self, type_name: &str, snapshot: &Map<String, Value>)
        -> SyncResult<Value>;

    /// Fetches every record of a type.
    async fn find_all(&self, type_name: &str) -> SyncResult<Value>;

    /// Fetches one record by id.
    async fn find_record(&self, type_name: &str, id: &str) -> SyncResult<Value>;
}

/// Converts between records and wire payloads.
pub trait Serializer: Send + Sync {
    /// Produces the wire shape sent to the remote.
    fn serialize(&self, record: &Record) -> Map<String, Value>;

    /// Extracts a single normalized record from a response payload.
    ///
    /// `id_hint` fills in the id when the payload omits it.
    fn extract(
        &self,
        type_name: &str,
        payload: Value,
        id_hint: Option<&str>,
    ) -> SyncResult<Map<String, Value>>;

    /// Extracts every record from a collection payload.
    fn extract_many(&self, type_name: &str, payload: Value) -> SyncResult<Vec<Map<String, Value>>>;
}

/// Serializer for plain JSON APIs.
///
/// Records are sent as their field map. Responses may be the bare object or
/// wrapped under a sole root key named after the type (`{"user": {..}}`) or
/// its plural (`{"users": [..]}`).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    /// Unwraps `{"<type>": ...}` and `{"<type>s": ...}` envelopes.
    ///
    /// Only a single-key object whose value is an object or array counts as
    /// an envelope, so a record with a field named after its own type is
    /// returned intact.
    fn unwrap_root(type_name: &str, payload: Value) -> Value {
        match payload {
            Value::Object(map) if map.len() == 1 => {
                let mut entries = map.into_iter();
                match entries.next() {
                    Some((key, inner))
                        if Self::is_root_key(type_name, &key)
                            && matches!(inner, Value::Object(_) | Value::Array(_)) =>
                    {
                        inner
                    }
                    Some((key, inner)) => Value::Object(Map::from_iter([(key, inner)])),
                    None => Value::Object(Map::new()),
                }
            }
            other => other,
        }
    }

    fn is_root_key(type_name: &str, key: &str) -> bool {
        key != ID_FIELD
            && (key == type_name
                || key
                    .strip_suffix('s')
                    .is_some_and(|singular| singular == type_name))
    }
}

impl Serializer for JsonSerializer {
    fn serialize(&self, record: &Record) -> Map<String, Value> {
        record.fields.clone()
    }

    fn extract(
        &self,
        type_name: &str,
        payload: Value,
        id_hint: Option<&str>,
    ) -> SyncResult<Map<String, Value>> {
        let mut fields = match Self::unwrap_root(type_name, payload) {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(SyncError::InvalidResponse(format!(
                    "expected object for {type_name}, got {other}"
                )))
            }
        };

        let has_id = !matches!(fields.get(ID_FIELD), None | Some(Value::Null));
        if let (false, Some(hint)) = (has_id, id_hint) {
            fields.insert(ID_FIELD.into(), Value::String(hint.to_string()));
        }

        Ok(fields)
    }

    fn extract_many(&self, type_name: &str, payload: Value) -> SyncResult<Vec<Map<String, Value>>> {
        match Self::unwrap_root(type_name, payload) {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map),
                    other => Err(SyncError::InvalidResponse(format!(
                        "expected object in {type_name} collection, got {other}"
                    ))),
                })
                .collect(),
            other => Err(SyncError::InvalidResponse(format!(
                "expected array for {type_name} collection, got {other}"
            ))),
        }
    }
}

/// The host data-access layer: adapters, serializers and schema per type.
pub struct DataLayer {
    schema: Schema,
    default_adapter: Arc<dyn RemoteAdapter>,
    adapters: HashMap<String, Arc<dyn RemoteAdapter>>,
    default_serializer: Arc<dyn Serializer>,
    serializers: HashMap<String, Arc<dyn Serializer>>,
}

impl DataLayer {
    /// Creates a data layer that routes every type to `adapter`.
    pub fn new(schema: Schema, adapter: Arc<dyn RemoteAdapter>) -> Self {
        Self {
            schema,
            default_adapter: adapter,
            adapters: HashMap::new(),
            default_serializer: Arc::new(JsonSerializer),
            serializers: HashMap::new(),
        }
    }

    /// Routes `type_name` to a dedicated adapter.
    pub fn with_adapter(mut self, type_name: impl Into<String>, adapter: Arc<dyn RemoteAdapter>) -> Self {
        self.adapters.insert(type_name.into(), adapter);
        self
    }

    /// Uses a dedicated serializer for `type_name`.
    pub fn with_serializer(
        mut self,
        type_name: impl Into<String>,
        serializer: Arc<dyn Serializer>,
    ) -> Self {
        self.serializers.insert(type_name.into(), serializer);
        self
    }

    /// Returns the adapter for `type_name`.
    pub fn adapter_for(&self, type_name: &str) -> Arc<dyn RemoteAdapter> {
        self.adapters
            .get(type_name)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.default_adapter))
    }

    /// Returns the serializer for `type_name`.
    pub fn serializer_for(&self, type_name: &str) -> Arc<dyn Serializer> {
        self.serializers
            .get(type_name)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.default_serializer))
    }

    /// Returns the descriptor of `type_name`.
    pub fn model_for(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.schema.model_for(type_name)
    }

    /// Returns the schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

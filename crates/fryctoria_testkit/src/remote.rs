//! Scripted in-memory remote server.

use async_trait::async_trait;
use fryctoria_sync::{id_of, RemoteAdapter, SyncError, SyncResult, ID_FIELD};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Kind of call the remote received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    /// `create_record`
    Create,
    /// `update_record`
    Update,
    /// `delete_record`
    Delete,
    /// `find_all`
    FindAll,
    /// `find_record`
    FindRecord,
}

/// One call delivered to the remote.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
    /// Kind of call.
    pub operation: RemoteOperation,
    /// Record type.
    pub type_name: String,
    /// Snapshot sent (or `{"id": ..}` for lookups).
    pub snapshot: Map<String, Value>,
}

/// Network simulation state.
///
/// Kept outside the engine so tests can flip connectivity and script
/// failures without the engine knowing it is under test.
#[derive(Debug)]
struct ServerState {
    online: bool,
    next_id: u64,
    failures: VecDeque<Option<u16>>,
    records: HashMap<String, BTreeMap<String, Map<String, Value>>>,
    calls: Vec<RemoteCall>,
}

/// An in-memory remote that assigns sequential numeric ids.
///
/// While offline every call fails with [`SyncError::Offline`] and is not
/// recorded. Scripted failures are consumed one per delivered call.
#[derive(Debug)]
pub struct MockRemote {
    state: Mutex<ServerState>,
}

impl MockRemote {
    /// Creates an online remote whose first assigned id is `"1"`.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ServerState {
                online: true,
                next_id: 1,
                failures: VecDeque::new(),
                records: HashMap::new(),
                calls: Vec::new(),
            }),
        }
    }

    /// Switches the simulated network on or off.
    pub fn set_online(&self, online: bool) {
        self.state.lock().online = online;
    }

    /// Returns true if the simulated network is up.
    pub fn is_online(&self) -> bool {
        self.state.lock().online
    }

    /// Sets the id the next create will be assigned.
    pub fn set_next_id(&self, next_id: u64) {
        self.state.lock().next_id = next_id;
    }

    /// Makes the next delivered call fail with `status`.
    ///
    /// Status `0` is reported as an offline failure.
    pub fn fail_next(&self, status: u16) {
        self.state.lock().failures.push_back(Some(status));
    }

    /// Lets the next delivered call through, so that a following
    /// [`MockRemote::fail_next`] hits a later call.
    pub fn pass_next(&self) {
        self.state.lock().failures.push_back(None);
    }

    /// Stores records as if another client had created them.
    pub fn seed(&self, type_name: &str, records: impl IntoIterator<Item = Value>) {
        let mut state = self.state.lock();
        for value in records {
            if let Value::Object(fields) = value {
                if let Some(id) = id_of(&fields) {
                    state
                        .records
                        .entry(type_name.to_string())
                        .or_default()
                        .insert(id, fields);
                }
            }
        }
    }

    /// Returns every call delivered so far.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().calls.clone()
    }

    /// Returns the delivered calls of one kind.
    pub fn calls_of(&self, operation: RemoteOperation) -> Vec<RemoteCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    /// Returns the stored records of `type_name`, ordered by id.
    pub fn records(&self, type_name: &str) -> Vec<Map<String, Value>> {
        self.state
            .lock()
            .records
            .get(type_name)
            .map(|r| r.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the stored record of `type_name` with `id`.
    pub fn record(&self, type_name: &str, id: &str) -> Option<Map<String, Value>> {
        self.state
            .lock()
            .records
            .get(type_name)
            .and_then(|r| r.get(id).cloned())
    }

    fn deliver(
        &self,
        operation: RemoteOperation,
        type_name: &str,
        snapshot: &Map<String, Value>,
    ) -> SyncResult<parking_lot::MutexGuard<'_, ServerState>> {
        let mut state = self.state.lock();
        if !state.online {
            return Err(SyncError::Offline);
        }
        if let Some(Some(status)) = state.failures.pop_front() {
            return Err(SyncError::from_status(status, "scripted failure"));
        }
        state.calls.push(RemoteCall {
            operation,
            type_name: type_name.to_string(),
            snapshot: snapshot.clone(),
        });
        Ok(state)
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup(id: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(ID_FIELD.into(), Value::String(id.to_string()));
    map
}

fn not_found(type_name: &str, id: &str) -> SyncError {
    SyncError::rejected(404, format!("{type_name} {id} not found"))
}

#[async_trait]
impl RemoteAdapter for MockRemote {
    async fn create_record(
        &self,
        type_name: &str,
        snapshot: &Map<String, Value>,
    ) -> SyncResult<Value> {
        let mut state = self.deliver(RemoteOperation::Create, type_name, snapshot)?;
        let id = state.next_id.to_string();
        state.next_id += 1;

        let mut stored = snapshot.clone();
        stored.insert(ID_FIELD.into(), Value::String(id.clone()));
        state
            .records
            .entry(type_name.to_string())
            .or_default()
            .insert(id, stored.clone());
        Ok(Value::Object(stored))
    }

    async fn update_record(
        &self,
        type_name: &str,
        snapshot: &Map<String, Value>,
    ) -> SyncResult<Value> {
        let mut state = self.deliver(RemoteOperation::Update, type_name, snapshot)?;
        let id = id_of(snapshot)
            .ok_or_else(|| SyncError::rejected(422, format!("{type_name} update without id")))?;
        state
            .records
            .entry(type_name.to_string())
            .or_default()
            .insert(id, snapshot.clone());
        Ok(Value::Object(snapshot.clone()))
    }

    async fn delete_record(
        &self,
        type_name: &str,
        snapshot: &Map<String, Value>,
    ) -> SyncResult<Value> {
        let mut state = self.deliver(RemoteOperation::Delete, type_name, snapshot)?;
        if let Some(id) = id_of(snapshot) {
            if let Some(records) = state.records.get_mut(type_name) {
                records.remove(&id);
            }
        }
        Ok(Value::Null)
    }

    async fn find_all(&self, type_name: &str) -> SyncResult<Value> {
        let state = self.deliver(RemoteOperation::FindAll, type_name, &Map::new())?;
        let records = state
            .records
            .get(type_name)
            .map(|r| r.values().cloned().map(Value::Object).collect())
            .unwrap_or_default();
        Ok(Value::Array(records))
    }

    async fn find_record(&self, type_name: &str, id: &str) -> SyncResult<Value> {
        let state = self.deliver(RemoteOperation::FindRecord, type_name, &lookup(id))?;
        state
            .records
            .get(type_name)
            .and_then(|r| r.get(id).cloned())
            .map(Value::Object)
            .ok_or_else(|| not_found(type_name, id))
    }
}

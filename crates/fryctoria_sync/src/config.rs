//! Configuration for the sync layer.

use tracing::warn;

/// Default namespace for persisted collections.
pub const DEFAULT_NAMESPACE: &str = "fryctoria";

/// Default prefix of locally minted record ids.
pub const DEFAULT_LOCAL_ID_PREFIX: &str = "fryctoria-";

/// Configuration for sync operations.
///
/// Every persisted collection lives under a key derived from `namespace`,
/// so two sync layers can share one key-value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Namespace for persisted collection keys.
    pub namespace: String,
    /// Prefix marking an id as locally minted.
    pub local_id_prefix: String,
}

impl SyncConfig {
    /// Creates a configuration with the given namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_id_prefix: DEFAULT_LOCAL_ID_PREFIX.to_string(),
        }
    }

    /// Sets the local id prefix.
    ///
    /// An empty prefix would mark every id as local, so it is ignored and
    /// the current prefix kept.
    pub fn with_local_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if prefix.is_empty() {
            warn!(kept = %self.local_id_prefix, "ignoring empty local id prefix");
        } else {
            self.local_id_prefix = prefix;
        }
        self
    }

    /// Key of the persisted job list.
    pub fn jobs_key(&self) -> String {
        format!("{}-jobs", self.namespace)
    }

    /// Key of the persisted remote id records.
    pub fn remote_ids_key(&self) -> String {
        format!("{}-remote-ids", self.namespace)
    }

    /// Key of the shadow collection for `type_name`.
    pub fn shadow_key(&self, type_name: &str) -> String {
        format!("{}-shadow:{}", self.namespace, type_name)
    }

    /// Key of the index listing every shadowed type.
    pub fn shadow_types_key(&self) -> String {
        format!("{}-shadow-types", self.namespace)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

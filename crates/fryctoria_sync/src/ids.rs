//! Local and remote record identifiers.

use crate::config::DEFAULT_LOCAL_ID_PREFIX;
use tracing::warn;
use uuid::Uuid;

/// Mints local ids and tells them apart from server-assigned ones.
///
/// Local ids carry a fixed prefix; any id without it is treated as
/// authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIds {
    prefix: String,
}

impl LocalIds {
    /// Creates a generator for ids starting with `prefix`.
    ///
    /// An empty prefix falls back to [`DEFAULT_LOCAL_ID_PREFIX`].
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if prefix.is_empty() {
            warn!("empty local id prefix, using {DEFAULT_LOCAL_ID_PREFIX}");
            prefix = DEFAULT_LOCAL_ID_PREFIX.to_string();
        }
        Self { prefix }
    }

    /// Returns the local id prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Mints a fresh local id.
    pub fn generate(&self) -> String {
        format!("{}{}", self.prefix, Uuid::new_v4().simple())
    }

    /// Returns true if `id` was not minted locally.
    pub fn is_remote_id(&self, id: &str) -> bool {
        !id.starts_with(&self.prefix)
    }
}

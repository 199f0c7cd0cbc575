//! Error types for the sync layer.

use fryctoria_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Transport status meaning "the request never got a response".
pub const OFFLINE_STATUS: u16 = 0;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote could not be reached (no response at all).
    #[error("remote unreachable: no response")]
    Offline,

    /// The remote answered and rejected the operation.
    #[error("remote rejected request (status {status}): {message}")]
    Remote {
        /// Status code reported by the remote.
        status: u16,
        /// Error message.
        message: String,
    },

    /// The remote answered with a payload that cannot be used.
    #[error("invalid remote response: {0}")]
    InvalidResponse(String),

    /// The caller passed an argument of an unsupported shape.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A record was looked up and does not exist.
    #[error("record {type_name}:{id} not found")]
    RecordNotFound {
        /// Type of the record.
        type_name: String,
        /// Id that was looked up.
        id: String,
    },

    /// Persistence failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A persisted or remote document had an unexpected shape.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Builds an error from a transport status code.
    ///
    /// Status [`OFFLINE_STATUS`] is classified as [`SyncError::Offline`].
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        if status == OFFLINE_STATUS {
            Self::Offline
        } else {
            Self::Remote {
                status,
                message: message.into(),
            }
        }
    }

    /// Creates an application-level rejection.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Returns true if this error means the remote was unreachable.
    pub fn is_offline(&self) -> bool {
        matches!(self, SyncError::Offline)
    }

    /// Returns the transport status, if the error came from the remote.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Offline => Some(OFFLINE_STATUS),
            SyncError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

//! # Fryctoria Storage
//!
//! Key-value persistence adapters for the Fryctoria offline sync layer.
//!
//! This crate provides the lowest-level persistence abstraction used by the
//! sync engine. Stores are **opaque document stores** - they map string keys
//! to JSON documents and do not interpret what they hold.
//!
//! ## Design Principles
//!
//! - Stores are simple async get/set/remove maps
//! - No knowledge of jobs, id mappings or shadow records
//! - No transactional multi-key guarantee
//! - Must be `Send + Sync` for sharing across tasks
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral state
//! - [`FileStore`] - One JSON document per key inside a directory
//!
//! ## Example
//!
//! ```rust
//! use fryctoria_storage::{InMemoryStore, KeyValueStore};
//! use serde_json::json;
//!
//! # async fn demo() -> fryctoria_storage::StorageResult<()> {
//! let store = InMemoryStore::new();
//! store.set("greeting", &json!("hello")).await?;
//! assert_eq!(store.get("greeting").await?, Some(json!("hello")));
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::KeyValueStore;
pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::InMemoryStore;

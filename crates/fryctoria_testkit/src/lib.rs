//! # Fryctoria Testkit
//!
//! Test utilities for the Fryctoria offline sync layer.
//!
//! This crate provides:
//! - [`MockRemote`], a scripted in-memory server with an explicit network
//!   switch, id counter and failure queue
//! - [`FlakyStore`], a key-value store that fails on demand
//! - [`TestHarness`], a fully wired engine and store overlay
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fryctoria_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn replays_offline_writes() {
//!     let harness = TestHarness::memory().await;
//!     harness.remote.set_online(false);
//!     // ... write through harness.store, then go back online
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod flaky;
pub mod generators;
pub mod remote;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::flaky::*;
    pub use crate::generators::*;
    pub use crate::remote::*;
}

pub use fixtures::*;
pub use flaky::*;
pub use generators::*;
pub use remote::*;

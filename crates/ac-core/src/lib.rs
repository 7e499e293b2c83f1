//! ashchan/crates/ac-core/src/lib.rs
//!
//! The central domain logic and interface definitions for ashchan: the post
//! data model, the port traits implemented by plugins, the error taxonomy,
//! pagination and rate-limit math, and the `ThreadService` orchestrator.

pub mod error;
pub mod limit;
pub mod models;
pub mod pagination;
pub mod service;
pub mod traits;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;

//! In-memory storage backend
//!
//! Implements every storage trait over a single locked ledger. Used by the
//! CLI replay command and by tests.

pub mod dataset;
pub mod store;

pub use dataset::Dataset;
pub use store::{InMemoryStore, InMemoryTransaction};

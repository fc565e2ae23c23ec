//! Storage integrations.
//!
//! - [`storage`] - Storage abstraction layer (trait-based) and factory
//! - [`memory`] - In-memory implementation
//!
//! # Design Pattern
//!
//! Adapters isolate persistence behind traits so the engine can be tested
//! against the in-memory backend and deployed against any store that can
//! provide an all-or-nothing transaction.
//!
//! ```rust
//! use offstudy::adapters::memory::InMemoryStore;
//! use offstudy::adapters::storage::Stores;
//! use std::sync::Arc;
//!
//! let stores = Stores::from_backend(Arc::new(InMemoryStore::new()));
//! # let _ = stores;
//! ```

pub mod memory;
pub mod storage;

//! Storage abstraction layer
//!
//! Trait-based seams between the engine and the stores holding subjects,
//! consents, visits, appointments and off-study records. Backends are
//! selected from configuration by [`create_stores`].

pub mod factory;
pub mod traits;

pub use factory::create_stores;
pub use traits::{
    AppointmentStore, ConsentStore, OffstudyStore, ScheduleStore, ScheduleTransaction, Stores,
    SubjectRegistry, VisitStore,
};

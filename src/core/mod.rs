//! Core business logic.
//!
//! # Modules
//!
//! - [`eligibility`] - Rejects scheduled data reported after a subject went off study
//! - [`registration`] - Validates and commits off-study records
//! - [`retraction`] - Deletes appointments made moot by an off-study record
//! - [`calendar`] - Local dates and message formatting
//! - [`service`] - Facade wiring the above to one set of stores
//!
//! # Registration Workflow
//!
//! 1. **Validate**: conflict, registry, consent, date of birth, last visit, fields
//! 2. **Begin**: open a store transaction
//! 3. **Insert**: write the off-study record
//! 4. **Retract**: delete appointments scheduled after the off-study datetime
//! 5. **Commit**: or roll back everything on the first failure
//!
//! # Example
//!
//! ```rust,no_run
//! use offstudy::adapters::storage::create_stores;
//! use offstudy::config::load_config;
//! use offstudy::core::{OffstudyRequest, OffstudyService};
//! use offstudy::domain::SubjectIdentifier;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("offstudy.toml")?;
//! let stores = create_stores(&config).await?;
//! let service = OffstudyService::new(&config, stores)?;
//!
//! let subject = SubjectIdentifier::new("S-001")?;
//! let record = service
//!     .register(OffstudyRequest::new(subject, chrono::Utc::now(), "death"))
//!     .await?;
//! println!("Off study: {record}");
//! # Ok(())
//! # }
//! ```

pub mod calendar;
pub mod eligibility;
pub mod registration;
pub mod retraction;
pub mod service;

pub use calendar::LocalCalendar;
pub use eligibility::EligibilityChecker;
pub use registration::{OffstudyRegistrar, OffstudyRequest};
pub use retraction::AppointmentRetractor;
pub use service::OffstudyService;

//! Domain models and types.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`SubjectIdentifier`], [`AppointmentId`], [`VisitId`])
//! - **Records** exchanged with the stores ([`ConsentRecord`], [`VisitRecord`],
//!   [`AppointmentRecord`], [`OffstudyRecord`])
//! - **The guard capability** ([`HasOffstudyGuard`]) implemented by scheduled data
//! - **Error types** ([`OffstudyError`], [`RegistrationError`], [`OffstudyViolation`],
//!   [`RetractionError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, OffstudyError>`]. Domain outcomes
//! carry a stable code:
//!
//! ```rust
//! use offstudy::domain::{OffstudyError, RegistrationError};
//!
//! let err: OffstudyError = RegistrationError::MissingReason.into();
//! assert_eq!(err.code(), Some("missing_reason"));
//! ```

pub mod errors;
pub mod guard;
pub mod ids;
pub mod records;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{OffstudyError, OffstudyViolation, RegistrationError, RetractionError};
pub use guard::HasOffstudyGuard;
pub use ids::{AppointmentId, SubjectIdentifier, VisitId};
pub use records::{
    AppointmentRecord, AppointmentSummary, ConsentRecord, OffstudyRecord, RegisteredSubject,
    VisitOutcome, VisitRecord,
};
pub use result::Result;

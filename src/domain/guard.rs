//! Off-study guard capability
//!
//! Any record type that carries scheduled data implements
//! [`HasOffstudyGuard`] and is checked through
//! [`EligibilityChecker::check_record`](crate::core::eligibility::EligibilityChecker::check_record)
//! before it is persisted.

use crate::domain::ids::{SubjectIdentifier, VisitId};
use crate::domain::records::VisitRecord;
use chrono::{DateTime, Utc};

/// Capability of a record that must not be captured after a subject goes off study
///
/// # Examples
///
/// ```
/// use chrono::{DateTime, Utc};
/// use offstudy::domain::{HasOffstudyGuard, SubjectIdentifier};
///
/// struct VitalSignsCrf {
///     subject: SubjectIdentifier,
///     report_datetime: DateTime<Utc>,
/// }
///
/// impl HasOffstudyGuard for VitalSignsCrf {
///     fn subject_identifier(&self) -> &SubjectIdentifier {
///         &self.subject
///     }
///
///     fn report_datetime(&self) -> DateTime<Utc> {
///         self.report_datetime
///     }
///
///     // Vitals are compared to the minute, not by calendar date
///     fn compare_as_datetime(&self) -> Option<bool> {
///         Some(true)
///     }
/// }
/// ```
pub trait HasOffstudyGuard {
    /// Subject the record belongs to
    fn subject_identifier(&self) -> &SubjectIdentifier;

    /// Instant the record reports on
    fn report_datetime(&self) -> DateTime<Utc>;

    /// Per-record comparison mode; `None` uses the configured default
    fn compare_as_datetime(&self) -> Option<bool> {
        None
    }

    /// The visit this record is, if it is one; excluded from the prior-visit history
    fn visit_id(&self) -> Option<&VisitId> {
        None
    }
}

impl HasOffstudyGuard for VisitRecord {
    fn subject_identifier(&self) -> &SubjectIdentifier {
        &self.subject_identifier
    }

    fn report_datetime(&self) -> DateTime<Utc> {
        self.report_datetime
    }

    fn visit_id(&self) -> Option<&VisitId> {
        Some(&self.id)
    }
}

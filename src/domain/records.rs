//! Record types shared between the engine and its stores
//!
//! Subjects, consents, visits and appointments are owned by external
//! workflows and are read (or, for appointments, deleted) by the engine.
//! The off-study record is the only record the engine creates.

use crate::domain::ids::{AppointmentId, SubjectIdentifier, VisitId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Datetime display format used in messages
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Date display format used in messages
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Subject as known to the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredSubject {
    pub subject_identifier: SubjectIdentifier,

    /// Date of birth, if recorded
    #[serde(default)]
    pub dob: Option<NaiveDate>,

    /// False for screened subjects that were never registered
    #[serde(default = "default_registered")]
    pub registered: bool,

    #[serde(default)]
    pub registration_datetime: Option<DateTime<Utc>>,
}

impl RegisteredSubject {
    /// Creates a registered subject without a date of birth
    pub fn new(subject_identifier: SubjectIdentifier) -> Self {
        Self {
            subject_identifier,
            dob: None,
            registered: true,
            registration_datetime: None,
        }
    }

    /// Sets the date of birth
    pub fn with_dob(mut self, dob: NaiveDate) -> Self {
        self.dob = Some(dob);
        self
    }

    /// Sets the registration datetime
    pub fn with_registration_datetime(mut self, registered_at: DateTime<Utc>) -> Self {
        self.registration_datetime = Some(registered_at);
        self
    }

    /// Marks the subject as known but not registered
    pub fn unregistered(mut self) -> Self {
        self.registered = false;
        self
    }
}

fn default_registered() -> bool {
    true
}

/// Consent given by a subject. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub subject_identifier: SubjectIdentifier,
    pub consent_datetime: DateTime<Utc>,
}

impl ConsentRecord {
    pub fn new(subject_identifier: SubjectIdentifier, consent_datetime: DateTime<Utc>) -> Self {
        Self {
            subject_identifier,
            consent_datetime,
        }
    }
}

/// Outcome recorded on a visit report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitOutcome {
    Scheduled,
    Unscheduled,
    Missed,
    Lost,
    Death,
    CompletedProtocol,
    OffStudy,
}

impl VisitOutcome {
    /// Returns the snake_case name used in configuration and messages
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitOutcome::Scheduled => "scheduled",
            VisitOutcome::Unscheduled => "unscheduled",
            VisitOutcome::Missed => "missed",
            VisitOutcome::Lost => "lost",
            VisitOutcome::Death => "death",
            VisitOutcome::CompletedProtocol => "completed_protocol",
            VisitOutcome::OffStudy => "off_study",
        }
    }
}

impl fmt::Display for VisitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scheduled" => Ok(VisitOutcome::Scheduled),
            "unscheduled" => Ok(VisitOutcome::Unscheduled),
            "missed" => Ok(VisitOutcome::Missed),
            "lost" => Ok(VisitOutcome::Lost),
            "death" => Ok(VisitOutcome::Death),
            "completed_protocol" => Ok(VisitOutcome::CompletedProtocol),
            "off_study" => Ok(VisitOutcome::OffStudy),
            other => Err(format!("Unknown visit outcome '{other}'")),
        }
    }
}

/// Visit report captured by data-entry workflows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    #[serde(default = "VisitId::generate")]
    pub id: VisitId,
    pub subject_identifier: SubjectIdentifier,
    pub report_datetime: DateTime<Utc>,
    #[serde(default = "default_outcome")]
    pub outcome: VisitOutcome,

    /// Appointment this visit was reported against
    #[serde(default)]
    pub appointment_id: Option<AppointmentId>,
}

impl VisitRecord {
    /// Creates a visit with a generated id and no appointment
    pub fn new(
        subject_identifier: SubjectIdentifier,
        report_datetime: DateTime<Utc>,
        outcome: VisitOutcome,
    ) -> Self {
        Self {
            id: VisitId::generate(),
            subject_identifier,
            report_datetime,
            outcome,
            appointment_id: None,
        }
    }

    /// Links the visit to an appointment
    pub fn with_appointment(mut self, appointment_id: AppointmentId) -> Self {
        self.appointment_id = Some(appointment_id);
        self
    }
}

fn default_outcome() -> VisitOutcome {
    VisitOutcome::Scheduled
}

/// Off-study record. At most one per subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffstudyRecord {
    pub subject_identifier: SubjectIdentifier,
    pub offstudy_datetime: DateTime<Utc>,
    pub reason: String,
    #[serde(default)]
    pub reason_other: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for OffstudyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.subject_identifier,
            self.offstudy_datetime.format(DATETIME_FORMAT)
        )
    }
}

/// Appointment created by scheduling workflows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    #[serde(default = "AppointmentId::generate")]
    pub id: AppointmentId,
    pub subject_identifier: SubjectIdentifier,
    pub scheduled_datetime: DateTime<Utc>,
    #[serde(default)]
    pub linked_visit: Option<VisitId>,

    /// Downstream records that forbid deleting this appointment
    #[serde(default)]
    pub protected_by: Vec<String>,
}

impl AppointmentRecord {
    /// Creates an appointment with a generated id
    pub fn new(subject_identifier: SubjectIdentifier, scheduled_datetime: DateTime<Utc>) -> Self {
        Self {
            id: AppointmentId::generate(),
            subject_identifier,
            scheduled_datetime,
            linked_visit: None,
            protected_by: Vec::new(),
        }
    }

    /// Replaces the generated id
    pub fn with_id(mut self, id: AppointmentId) -> Self {
        self.id = id;
        self
    }

    /// Records a downstream reference that protects the appointment
    pub fn protected_by(mut self, reference: impl Into<String>) -> Self {
        self.protected_by.push(reference.into());
        self
    }

    /// Whether a visit has been captured against this appointment
    pub fn has_visit(&self) -> bool {
        self.linked_visit.is_some()
    }
}

/// Projection of an appointment handed to the retractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentSummary {
    pub id: AppointmentId,
    pub scheduled_datetime: DateTime<Utc>,
    pub has_visit: bool,
}

impl From<&AppointmentRecord> for AppointmentSummary {
    fn from(record: &AppointmentRecord) -> Self {
        Self {
            id: record.id.clone(),
            scheduled_datetime: record.scheduled_datetime,
            has_visit: record.has_visit(),
        }
    }
}

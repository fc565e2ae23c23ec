//! Domain error types
//!
//! This module defines the error hierarchy for the off-study engine.
//! Every variant is an expected domain outcome returned to the caller;
//! none of them are retried or swallowed internally.

use thiserror::Error;

/// Main error type
///
/// This is the primary error type used throughout the crate. It wraps the
/// registration, eligibility and retraction outcomes and the ambient
/// configuration/storage failures.
#[derive(Debug, Error)]
pub enum OffstudyError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Registration rejected by a validation rule
    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// Scheduled data rejected because the subject is off study
    #[error("Off-study violation: {0}")]
    Violation(#[from] OffstudyViolation),

    /// Appointment retraction blocked
    #[error("Retraction error: {0}")]
    Retraction(#[from] RetractionError),

    /// Subject identifier did not resolve in the subject registry
    #[error("Subject not found: {0}")]
    SubjectNotFound(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage backend errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl OffstudyError {
    /// Returns the stable error code for domain outcomes
    ///
    /// Ambient errors (configuration, storage, I/O) have no code.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            OffstudyError::Registration(e) => Some(e.code()),
            OffstudyError::Violation(e) => Some(e.code()),
            OffstudyError::Retraction(e) => Some(e.code()),
            OffstudyError::SubjectNotFound(_) => Some("not_registered"),
            _ => None,
        }
    }
}

/// Registration validation errors
///
/// Raised by the registrar while validating a new off-study record. No state
/// is mutated when any of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Subject is unknown to the registry or not registered
    #[error("Unknown subject. Got {subject_identifier}.")]
    SubjectNotRegistered { subject_identifier: String },

    /// Registry holds no usable date of birth
    #[error("Invalid date of birth for subject {subject_identifier}. Got None")]
    InvalidDob { subject_identifier: String },

    /// Off-study date precedes the date of birth
    #[error(
        "Invalid off-study date. Off-study date may not precede date of birth. Got '{offstudy_datetime}'."
    )]
    OffstudyDatetimeBeforeDob { offstudy_datetime: String },

    /// Subject has no consent at all
    #[error("Unable to take subject off study. Subject has not consented. Got {subject_identifier}.")]
    NotConsented { subject_identifier: String },

    /// No consent on or before the off-study datetime
    #[error(
        "Invalid off-study date. Off-study date may not be before the date of consent. Got '{offstudy_datetime}'."
    )]
    InvalidOffstudyDatetimeConsent { offstudy_datetime: String },

    /// Off-study datetime precedes the latest visit
    #[error(
        "Off-study datetime cannot precede the last visit date. Last visit date was on {last_visit_datetime}. Got {offstudy_datetime}"
    )]
    OffstudyPrecedesLastVisit {
        last_visit_datetime: String,
        offstudy_datetime: String,
    },

    /// Subject already has an off-study record
    #[error("Subject {subject_identifier} is already off study as of {offstudy_datetime}.")]
    AlreadyOffstudy {
        subject_identifier: String,
        offstudy_datetime: String,
    },

    /// Reason left blank
    #[error("Off-study reason is required.")]
    MissingReason,

    /// Reason "other" given without a description
    #[error("Off-study reason is 'other'. Please specify.")]
    ReasonOtherRequired,

    /// Off-study datetime lies in the future
    #[error("Invalid off-study date. Off-study date may not be a future date. Got '{offstudy_datetime}'.")]
    OffstudyDatetimeInFuture { offstudy_datetime: String },

    /// Off-study datetime precedes the opening of the study
    #[error(
        "Invalid off-study date. Off-study date may not be before the study opened on {study_open_datetime}. Got '{offstudy_datetime}'."
    )]
    OffstudyDatetimeBeforeStudyOpen {
        study_open_datetime: String,
        offstudy_datetime: String,
    },
}

impl RegistrationError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            RegistrationError::SubjectNotRegistered { .. } => "not_registered",
            RegistrationError::InvalidDob { .. } => "invalid_dob",
            RegistrationError::OffstudyDatetimeBeforeDob { .. } => "offstudy_datetime_before_dob",
            RegistrationError::NotConsented { .. } => "not_consented",
            RegistrationError::InvalidOffstudyDatetimeConsent { .. } => {
                "invalid_offstudy_datetime_consent"
            }
            RegistrationError::OffstudyPrecedesLastVisit { .. } => "offstudy_precedes_last_visit",
            RegistrationError::AlreadyOffstudy { .. } => "already_offstudy",
            RegistrationError::MissingReason => "missing_reason",
            RegistrationError::ReasonOtherRequired => "reason_other_required",
            RegistrationError::OffstudyDatetimeInFuture { .. } => "offstudy_datetime_in_future",
            RegistrationError::OffstudyDatetimeBeforeStudyOpen { .. } => {
                "offstudy_datetime_before_study_open"
            }
        }
    }
}

/// Scheduled data rejected by the eligibility checker
///
/// This is the steady-state enforcement outcome, not a defect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OffstudyViolation {
    /// An off-study record exists on or before the report
    #[error(
        "Participant is off study. Participant was reported off study on {offstudy_date}. Scheduled data reported after this date may not be captured."
    )]
    ReportedOffstudy {
        subject_identifier: String,
        offstudy_date: String,
    },

    /// A previous visit ended with a terminal outcome
    #[error(
        "On a previous visit participant was meant to go off study (reason={outcome}). See visit on '{visit_date}'."
    )]
    TerminalVisit {
        subject_identifier: String,
        outcome: String,
        visit_date: String,
    },

    /// Report precedes the subject's registration
    #[error("Subject {subject_identifier} was not registered until {registration_date}. Scheduled data reported on {report_date} may not be captured.")]
    BeforeRegistration {
        subject_identifier: String,
        registration_date: String,
        report_date: String,
    },

    /// Report precedes the subject's consent
    #[error("Subject {subject_identifier} had not consented as of {report_date}. Scheduled data may not be captured.")]
    BeforeConsent {
        subject_identifier: String,
        report_date: String,
    },
}

impl OffstudyViolation {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            OffstudyViolation::ReportedOffstudy { .. } => "offstudy",
            OffstudyViolation::TerminalVisit { .. } => "offstudy_terminal_visit",
            OffstudyViolation::BeforeConsent { .. } => "offstudy_before_consent",
            OffstudyViolation::BeforeRegistration { .. } => "offstudy_before_registration",
        }
    }
}

/// Appointment retraction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetractionError {
    /// Appointment cannot be deleted because captured data references it
    #[error(
        "Appointment {appointment_id} on {scheduled_datetime} is protected from deletion ({references}). Off-study registration rolled back."
    )]
    Protected {
        appointment_id: String,
        scheduled_datetime: String,
        references: String,
    },
}

impl RetractionError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            RetractionError::Protected { .. } => "protected",
        }
    }
}

impl From<std::io::Error> for OffstudyError {
    fn from(err: std::io::Error) -> Self {
        OffstudyError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for OffstudyError {
    fn from(err: serde_json::Error) -> Self {
        OffstudyError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for OffstudyError {
    fn from(err: toml::de::Error) -> Self {
        OffstudyError::Configuration(format!("TOML parse error: {err}"))
    }
}
